//! Pattern matching predicates and pattern builders.
//!
//! The [`contains`], [`starts_with`] and [`ends_with`] helpers escape `\`,
//! `%` and `_` in their input, and every `LIKE` form carries
//! `ESCAPE '\'`, so user text matches literally:
//!
//! ```ignore
//! like(ident("title"), contains("100%"))
//! // "title" LIKE '%100\%%' ESCAPE '\'
//! ```

use crate::clause::Clause;
use crate::exp::{self, Exp};

use super::binary;

fn like_form(value: impl Into<Exp>, op: &str, pattern: impl Into<Exp>) -> Clause {
    Clause::raw(format!("{} {op} {} ESCAPE '\\'", value.into(), pattern.into()))
}

pub fn like(value: impl Into<Exp>, pattern: impl Into<Exp>) -> Clause {
    like_form(value, "LIKE", pattern)
}

pub fn ilike(value: impl Into<Exp>, pattern: impl Into<Exp>) -> Clause {
    like_form(value, "ILIKE", pattern)
}

pub fn not_like(value: impl Into<Exp>, pattern: impl Into<Exp>) -> Clause {
    like_form(value, "NOT LIKE", pattern)
}

pub fn not_ilike(value: impl Into<Exp>, pattern: impl Into<Exp>) -> Clause {
    like_form(value, "NOT ILIKE", pattern)
}

/// Escape `LIKE` wildcards so `text` matches itself.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Pattern matching any text containing `needle`.
pub fn contains(needle: &str) -> Exp {
    exp::string(&format!("%{}%", escape_like(needle)))
}

pub fn starts_with(prefix: &str) -> Exp {
    exp::string(&format!("{}%", escape_like(prefix)))
}

pub fn ends_with(suffix: &str) -> Exp {
    exp::string(&format!("%{}", escape_like(suffix)))
}

/// `value ~ pattern`
pub fn regex_match(value: impl Into<Exp>, pattern: impl Into<Exp>) -> Clause {
    binary(value, "~", pattern)
}

/// `value ~* pattern`, case-insensitive.
pub fn regex_imatch(value: impl Into<Exp>, pattern: impl Into<Exp>) -> Clause {
    binary(value, "~*", pattern)
}

/// Full-text match of `query` (web search syntax) against `document`.
pub fn text_search(document: impl Into<Exp>, query: &str, config: Option<&str>) -> Clause {
    let query = exp::quote_literal(query);
    match config {
        None => Clause::raw(format!(
            "to_tsvector({}) @@ websearch_to_tsquery({query})",
            document.into()
        )),
        Some(config) => {
            let config = exp::quote_literal(config);
            Clause::raw(format!(
                "to_tsvector({config}, {}) @@ websearch_to_tsquery({config}, {query})",
                document.into()
            ))
        }
    }
}
