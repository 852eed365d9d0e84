//! Boolean clauses and logical operators (AND, OR, NOT).
//!
//! ```ignore
//! // Function style
//! and([eq(ident("owner_id"), auth_uid()), is_true(ident("published"))])
//! or([a, b])
//! not(c)
//!
//! // Operator style (via std::ops traits)
//! a & b   // BitAnd
//! a | b   // BitOr
//! !a      // Not
//! ```
//!
//! The empty clause is the identity of every combinator: it is skipped by
//! `and`/`or` and returned unchanged by `not`.

use core::fmt;
use core::ops::{BitAnd, BitOr, Not};

use crate::scan;

/// Rendered SQL boolean fragment, as used in `USING (...)` and
/// `WITH CHECK (...)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Clause(String);

impl Clause {
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// `TRUE`
    pub fn always() -> Self {
        Self("TRUE".to_string())
    }

    /// `FALSE`
    pub fn never() -> Self {
        Self("FALSE".to_string())
    }

    /// Wraps SQL text without escaping. Surrounding whitespace is trimmed.
    pub fn raw(sql: impl AsRef<str>) -> Self {
        Self(sql.as_ref().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sql(&self) -> &str {
        &self.0
    }

    pub fn into_sql(self) -> String {
        self.0
    }

    /// The clause, or `TRUE` when empty.
    pub fn or_true(self) -> Self {
        if self.is_empty() { Self::always() } else { self }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Clause {
    fn from(sql: &str) -> Self {
        Self::raw(sql)
    }
}

impl From<String> for Clause {
    fn from(sql: String) -> Self {
        Self::raw(sql)
    }
}

fn parenthesize(sql: &str) -> String {
    if scan::is_wrapped(sql) {
        sql.to_string()
    } else {
        format!("({sql})")
    }
}

fn join(clauses: impl IntoIterator<Item = Clause>, connective: &str) -> Clause {
    let mut parts: Vec<Clause> = clauses.into_iter().filter(|c| !c.is_empty()).collect();
    match parts.len() {
        0 => Clause::empty(),
        1 => parts.remove(0),
        _ => Clause(
            parts
                .iter()
                .map(|c| parenthesize(c.sql()))
                .collect::<Vec<_>>()
                .join(connective),
        ),
    }
}

// =============================================================================
// AND / OR / NOT
// =============================================================================

/// Logical AND of multiple clauses.
///
/// Empty operands are skipped; a single remaining operand is returned as-is.
/// Otherwise every operand is parenthesized once: `(a) AND (b)`.
pub fn and(clauses: impl IntoIterator<Item = Clause>) -> Clause {
    join(clauses, " AND ")
}

/// Logical OR of multiple clauses. Same shape rules as [`and`].
pub fn or(clauses: impl IntoIterator<Item = Clause>) -> Clause {
    join(clauses, " OR ")
}

/// Logical NOT: `NOT (c)`. The empty clause stays empty.
pub fn not(clause: Clause) -> Clause {
    if clause.is_empty() {
        return clause;
    }
    Clause(format!("NOT {}", parenthesize(clause.sql())))
}

// =============================================================================
// Operator Trait Implementations
// =============================================================================

impl BitAnd for Clause {
    type Output = Clause;

    fn bitand(self, rhs: Self) -> Self::Output {
        and([self, rhs])
    }
}

impl BitOr for Clause {
    type Output = Clause;

    fn bitor(self, rhs: Self) -> Self::Output {
        or([self, rhs])
    }
}

impl Not for Clause {
    type Output = Clause;

    fn not(self) -> Self::Output {
        not(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(sql: &str) -> Clause {
        Clause::raw(sql)
    }

    #[test]
    fn empty_is_absorbed() {
        assert_eq!(and([]), Clause::empty());
        assert_eq!(and([Clause::empty(), c("a = 1")]), c("a = 1"));
        assert_eq!(or([Clause::empty(), Clause::empty()]), Clause::empty());
        assert_eq!(not(Clause::empty()), Clause::empty());
    }

    #[test]
    fn operands_parenthesized_once() {
        assert_eq!(and([c("a = 1"), c("b = 2")]).sql(), "(a = 1) AND (b = 2)");
        assert_eq!(or([c("(a = 1)"), c("b = 2")]).sql(), "(a = 1) OR (b = 2)");
        // `(a) OR (b)` is not one group
        assert_eq!(and([c("(a) OR (b)"), c("c")]).sql(), "((a) OR (b)) AND (c)");
    }

    #[test]
    fn negation() {
        assert_eq!(not(Clause::never()).sql(), "NOT (FALSE)");
        assert_eq!((!c("(x)")).sql(), "NOT (x)");
    }

    #[test]
    fn operators_match_functions() {
        let (a, b) = (c("a = 1"), c("b = 2"));
        assert_eq!(a.clone() & b.clone(), and([a.clone(), b.clone()]));
        assert_eq!(a.clone() | b.clone(), or([a, b]));
    }
}
