//! Membership, array and subquery predicates.

use crate::clause::Clause;
use crate::exp::Exp;

use super::{binary, comma_list};

/// `value IN (a, b, ...)`. An empty list can never match: `FALSE`.
pub fn in_list(value: impl Into<Exp>, items: impl IntoIterator<Item = impl Into<Exp>>) -> Clause {
    let items = comma_list(items);
    if items.is_empty() {
        return Clause::never();
    }
    Clause::raw(format!("{} IN ({})", value.into(), items.join(", ")))
}

/// `value NOT IN (a, b, ...)`. An empty list excludes nothing: `TRUE`.
pub fn not_in_list(
    value: impl Into<Exp>,
    items: impl IntoIterator<Item = impl Into<Exp>>,
) -> Clause {
    let items = comma_list(items);
    if items.is_empty() {
        return Clause::always();
    }
    Clause::raw(format!("{} NOT IN ({})", value.into(), items.join(", ")))
}

/// `value = ANY(array)`
pub fn eq_any(value: impl Into<Exp>, array: impl Into<Exp>) -> Clause {
    Clause::raw(format!("{} = ANY({})", value.into(), array.into()))
}

/// `value = ALL(array)`
pub fn eq_all(value: impl Into<Exp>, array: impl Into<Exp>) -> Clause {
    Clause::raw(format!("{} = ALL({})", value.into(), array.into()))
}

/// `array @> other`
pub fn array_contains(array: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(array, "@>", other)
}

/// `array <@ other`
pub fn array_contained_by(array: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(array, "<@", other)
}

/// `array && other`
pub fn array_overlaps(array: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(array, "&&", other)
}

/// `EXISTS (select)`. The subquery is raw SQL.
pub fn exists(select: &str) -> Clause {
    Clause::raw(format!("EXISTS ({})", select.trim()))
}

pub fn not_exists(select: &str) -> Clause {
    Clause::raw(format!("NOT EXISTS ({})", select.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::not;
    use crate::exp::{ident, raw, string};

    #[test]
    fn empty_lists_collapse() {
        let none: [Exp; 0] = [];
        assert_eq!(in_list(ident("role"), none.clone()), Clause::never());
        assert_eq!(not_in_list(ident("role"), none.clone()), Clause::always());
        assert_eq!(not(in_list(ident("role"), none)).sql(), "NOT (FALSE)");
    }

    #[test]
    fn lists() {
        assert_eq!(
            in_list(ident("role"), [string("admin"), string("editor")]).sql(),
            r#""role" IN ('admin', 'editor')"#
        );
        assert_eq!(not_in_list(ident("n"), [1, 2]).sql(), r#""n" NOT IN (1, 2)"#);
        assert_eq!(
            eq_any(ident("id"), raw("array[1, 2]")).sql(),
            r#""id" = ANY(array[1, 2])"#
        );
        assert_eq!(
            array_overlaps(ident("tags"), raw("'{a}'")).sql(),
            r#""tags" && '{a}'"#
        );
    }

    #[test]
    fn subqueries() {
        assert_eq!(
            exists("SELECT 1 FROM members WHERE user_id = auth.uid()").sql(),
            "EXISTS (SELECT 1 FROM members WHERE user_id = auth.uid())"
        );
    }
}
