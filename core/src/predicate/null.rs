//! NULL and boolean tests.

use crate::clause::Clause;
use crate::exp::Exp;

fn postfix(value: impl Into<Exp>, test: &str) -> Clause {
    Clause::raw(format!("{} {test}", value.into()))
}

pub fn is_null(value: impl Into<Exp>) -> Clause {
    postfix(value, "IS NULL")
}

pub fn is_not_null(value: impl Into<Exp>) -> Clause {
    postfix(value, "IS NOT NULL")
}

pub fn is_true(value: impl Into<Exp>) -> Clause {
    postfix(value, "IS TRUE")
}

pub fn is_false(value: impl Into<Exp>) -> Clause {
    postfix(value, "IS FALSE")
}
