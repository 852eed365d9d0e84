//! JSONB operators.
//!
//! Accessors (`->`, `->>`, `#>`, `#>>`) build values; the key tests and
//! containment build clauses.

use crate::clause::Clause;
use crate::exp::{self, Exp};

use super::binary;

/// `doc -> key`
pub fn json_get(doc: impl Into<Exp>, key: impl Into<Exp>) -> Exp {
    Exp::raw(format!("{} -> {}", doc.into(), key.into()))
}

/// `doc ->> key`, as text.
pub fn json_get_text(doc: impl Into<Exp>, key: impl Into<Exp>) -> Exp {
    Exp::raw(format!("{} ->> {}", doc.into(), key.into()))
}

fn path_literal(path: &[&str]) -> String {
    let segments = path
        .iter()
        .map(|segment| {
            if segment.is_empty()
                || segment
                    .chars()
                    .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace())
            {
                format!("\"{}\"", segment.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>();
    exp::quote_literal(&format!("{{{}}}", segments.join(",")))
}

/// `doc #> '{a,b}'`
pub fn json_path(doc: impl Into<Exp>, path: &[&str]) -> Exp {
    Exp::raw(format!("{} #> {}", doc.into(), path_literal(path)))
}

/// `doc #>> '{a,b}'`, as text.
pub fn json_path_text(doc: impl Into<Exp>, path: &[&str]) -> Exp {
    Exp::raw(format!("{} #>> {}", doc.into(), path_literal(path)))
}

/// `doc ? 'key'`
pub fn json_has_key(doc: impl Into<Exp>, key: &str) -> Clause {
    binary(doc, "?", exp::string(key))
}

fn key_array(keys: &[&str]) -> String {
    let keys = keys.iter().map(|k| exp::quote_literal(k)).collect::<Vec<_>>();
    format!("array[{}]", keys.join(", "))
}

/// `doc ?| array[...]`. No keys can never match: `FALSE`.
pub fn json_has_any_keys(doc: impl Into<Exp>, keys: &[&str]) -> Clause {
    if keys.is_empty() {
        return Clause::never();
    }
    binary(doc, "?|", Exp::raw(key_array(keys)))
}

/// `doc ?& array[...]`. No keys are trivially all present: `TRUE`.
pub fn json_has_all_keys(doc: impl Into<Exp>, keys: &[&str]) -> Clause {
    if keys.is_empty() {
        return Clause::always();
    }
    binary(doc, "?&", Exp::raw(key_array(keys)))
}

/// `doc @> other`
pub fn json_contains(doc: impl Into<Exp>, other: impl Into<Exp>) -> Clause {
    binary(doc, "@>", other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exp::{auth_jwt, ident, string};
    use crate::predicate::eq;

    #[test]
    fn accessors() {
        let role = json_get_text(auth_jwt(), string("role"));
        assert_eq!(eq(role, string("admin")).sql(), "auth.jwt() ->> 'role' = 'admin'");
        assert_eq!(
            json_path_text(ident("meta"), &["app", "team id"]).sql(),
            r#""meta" #>> '{app,"team id"}'"#
        );
    }

    #[test]
    fn key_sets() {
        assert_eq!(json_has_any_keys(ident("d"), &[]), Clause::never());
        assert_eq!(json_has_all_keys(ident("d"), &[]), Clause::always());
        assert_eq!(
            json_has_any_keys(ident("d"), &["a", "b"]).sql(),
            r#""d" ?| array['a', 'b']"#
        );
        assert_eq!(json_has_key(ident("d"), "a").sql(), r#""d" ? 'a'"#);
    }
}
