//! Value expressions.
//!
//! An [`Exp`] is a rendered SQL value fragment. Literals are escaped at
//! construction, so an `Exp` is always safe to splice into a clause.
//!
//! ```ignore
//! ident("profiles.owner_id")   // "profiles"."owner_id"
//! string("it's")               // 'it''s'
//! cast(string("1"), "int8")    // '1'::int8
//! func("lower", [ident("email")])
//! ```

use core::fmt;

/// Rendered SQL value fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exp(String);

impl Exp {
    /// Wraps SQL text without escaping.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn sql(&self) -> &str {
        &self.0
    }

    pub fn into_sql(self) -> String {
        self.0
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for Exp {
    fn from(value: i64) -> Self {
        int(value)
    }
}

impl From<i32> for Exp {
    fn from(value: i32) -> Self {
        int(value.into())
    }
}

impl From<u64> for Exp {
    fn from(value: u64) -> Self {
        uint(value)
    }
}

impl From<f64> for Exp {
    fn from(value: f64) -> Self {
        double(value)
    }
}

impl From<bool> for Exp {
    fn from(value: bool) -> Self {
        boolean(value)
    }
}

// =============================================================================
// Literals
// =============================================================================

/// Single-quoted string literal, `'` doubled.
pub fn string(value: &str) -> Exp {
    Exp(quote_literal(value))
}

pub fn int(value: i64) -> Exp {
    Exp(value.to_string())
}

pub fn uint(value: u64) -> Exp {
    Exp(value.to_string())
}

/// Float literal in shortest round-trip form.
///
/// Non-finite values have no literal syntax and render as casts:
/// `'NaN'::float8`, `'Infinity'::float8`, `'-Infinity'::float8`.
pub fn double(value: f64) -> Exp {
    if value.is_nan() {
        Exp::raw("'NaN'::float8")
    } else if value == f64::INFINITY {
        Exp::raw("'Infinity'::float8")
    } else if value == f64::NEG_INFINITY {
        Exp::raw("'-Infinity'::float8")
    } else {
        Exp(format!("{value:?}"))
    }
}

pub fn boolean(value: bool) -> Exp {
    Exp::raw(if value { "TRUE" } else { "FALSE" })
}

pub fn null() -> Exp {
    Exp::raw("NULL")
}

/// `inner::type_name`
///
/// The cast is dropped and `inner` returned unchanged when `type_name` is not
/// a plain `[A-Za-z0-9_]+` word.
pub fn cast(inner: Exp, type_name: &str) -> Exp {
    if type_name.is_empty() || !type_name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return inner;
    }
    Exp(format!("{inner}::{type_name}"))
}

// =============================================================================
// Identifiers and calls
// =============================================================================

/// Column or table reference. Each dotted segment is double-quoted on its
/// own; a `*` segment is kept bare.
pub fn ident(path: &str) -> Exp {
    let rendered = path
        .split('.')
        .map(|segment| {
            if segment == "*" {
                segment.to_string()
            } else {
                quote_ident(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(".");
    Exp(rendered)
}

/// Function call `name(args, ...)`.
///
/// `name` must be a plain or schema-qualified identifier. Anything else is
/// returned as a raw fragment of `name` alone.
pub fn func(name: &str, args: impl IntoIterator<Item = Exp>) -> Exp {
    if !is_function_name(name) {
        return Exp::raw(name);
    }
    let args = args.into_iter().map(Exp::into_sql).collect::<Vec<_>>();
    Exp(format!("{name}({})", args.join(", ")))
}

pub fn raw(sql: &str) -> Exp {
    Exp::raw(sql)
}

pub fn auth_uid() -> Exp {
    Exp::raw("auth.uid()")
}

pub fn auth_role() -> Exp {
    Exp::raw("auth.role()")
}

pub fn auth_jwt() -> Exp {
    Exp::raw("auth.jwt()")
}

pub fn now() -> Exp {
    Exp::raw("now()")
}

/// `current_setting('key')`, or `current_setting('key', missing_ok)`.
pub fn current_setting(key: &str, missing_ok: Option<bool>) -> Exp {
    match missing_ok {
        None => Exp(format!("current_setting({})", quote_literal(key))),
        Some(flag) => Exp(format!(
            "current_setting({}, {})",
            quote_literal(key),
            if flag { "true" } else { "false" }
        )),
    }
}

// =============================================================================
// Quoting
// =============================================================================

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_word(segment: &str) -> bool {
    let mut bytes = segment.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

pub(crate) fn is_function_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_escape_quotes() {
        assert_eq!(string("it's").sql(), "'it''s'");
        assert_eq!(string("").sql(), "''");
        assert_eq!(int(-4).sql(), "-4");
        assert_eq!(boolean(true).sql(), "TRUE");
        assert_eq!(null().sql(), "NULL");
    }

    #[test]
    fn doubles() {
        assert_eq!(double(1.5).sql(), "1.5");
        assert_eq!(double(0.1).sql(), "0.1");
        assert_eq!(double(f64::NAN).sql(), "'NaN'::float8");
        assert_eq!(double(f64::NEG_INFINITY).sql(), "'-Infinity'::float8");
    }

    #[test]
    fn identifiers_quote_each_segment() {
        assert_eq!(ident("owner_id").sql(), r#""owner_id""#);
        assert_eq!(ident("public.courses.*").sql(), r#""public"."courses".*"#);
        assert_eq!(ident(r#"we"ird"#).sql(), r#""we""ird""#);
    }

    #[test]
    fn casts_require_plain_type_names() {
        assert_eq!(cast(string("1"), "int8").sql(), "'1'::int8");
        assert_eq!(cast(string("1"), "int; DROP").sql(), "'1'");
        assert_eq!(cast(string("1"), "").sql(), "'1'");
    }

    #[test]
    fn function_calls() {
        assert_eq!(func("lower", [ident("email")]).sql(), r#"lower("email")"#);
        assert_eq!(func("auth.uid", []).sql(), "auth.uid()");
        assert_eq!(func("1bad", [int(1)]).sql(), "1bad");
        assert_eq!(
            current_setting("request.jwt.claims", Some(true)).sql(),
            "current_setting('request.jwt.claims', true)"
        );
    }
}
