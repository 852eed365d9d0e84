//! Comparison predicates.

use crate::clause::Clause;
use crate::exp::Exp;

use super::binary;

/// `left = right`
pub fn eq(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, "=", right)
}

/// `left <> right`
pub fn neq(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, "<>", right)
}

pub fn lt(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, "<", right)
}

pub fn lte(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, "<=", right)
}

pub fn gt(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, ">", right)
}

pub fn gte(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, ">=", right)
}

/// `value BETWEEN low AND high`
pub fn between(value: impl Into<Exp>, low: impl Into<Exp>, high: impl Into<Exp>) -> Clause {
    Clause::raw(format!(
        "{} BETWEEN {} AND {}",
        value.into(),
        low.into(),
        high.into()
    ))
}

/// `value NOT BETWEEN low AND high`
pub fn not_between(value: impl Into<Exp>, low: impl Into<Exp>, high: impl Into<Exp>) -> Clause {
    Clause::raw(format!(
        "{} NOT BETWEEN {} AND {}",
        value.into(),
        low.into(),
        high.into()
    ))
}

/// NULL-safe inequality.
pub fn is_distinct_from(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, "IS DISTINCT FROM", right)
}

/// NULL-safe equality.
pub fn is_not_distinct_from(left: impl Into<Exp>, right: impl Into<Exp>) -> Clause {
    binary(left, "IS NOT DISTINCT FROM", right)
}
