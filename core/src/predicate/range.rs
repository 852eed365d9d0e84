//! Range operators.

use crate::clause::Clause;
use crate::exp::Exp;

use super::binary;

/// `range @> other`, `other` a range.
pub fn range_contains(range: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(range, "@>", other)
}

/// `range @> elem`, `elem` a single value.
pub fn range_contains_elem(range: impl Into<Exp>, elem: impl Into<Exp>) -> Clause {
    binary(range, "@>", elem)
}

/// `range <@ other`
pub fn range_contained_by(range: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(range, "<@", other)
}

/// `range && other`
pub fn range_overlaps(range: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(range, "&&", other)
}
