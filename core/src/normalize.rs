//! Canonical form for policy clauses.
//!
//! pg-meta returns policy expressions the way Postgres deparses them: fully
//! qualified, cast-annotated and wrapped in parentheses. Declarations are
//! written by hand. Normalization maps both to one textual form so they can be
//! compared:
//!
//! ```text
//! (("public"."courses"."owner_id")::text = (auth.uid())::text)
//!                       => auth.uid() = owner_id
//! owner_id = auth.uid() => auth.uid() = owner_id
//! ```
//!
//! The pipeline is lexical. It never needs the clause to parse, so opaque
//! fragments (`EXISTS (SELECT ...)`) normalize too.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::scan::{self, is_ident_byte, is_operator_byte};

static CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)::\s*(?:[a-z_][a-z0-9_]*\.)?(?:character\s+varying|double\s+precision|bit\s+varying|(?:timestamp|time)(?:\s*\(\s*\d+\s*\))?\s+with(?:out)?\s+time\s+zone|[a-z_][a-z0-9_]*)(?:\s*\(\s*\d+(?:\s*,\s*\d+)?\s*\))?(?:\s*\[\s*\])*",
    )
    .expect("cast pattern is valid")
});

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(true|false|null|and|or|not|is|in|like|ilike|between|exists|select|from|where|any|all)\b",
    )
    .expect("keyword pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Words that make an `=` something other than a plain equality.
const NON_EQUALITY_WORDS: &[&str] = &[
    "AND", "OR", "NOT", "IS", "IN", "LIKE", "ILIKE", "BETWEEN",
];

/// Schemas whose functions stay qualified when they are also the clause's
/// own schema.
const PLATFORM_SCHEMAS: &[&str] = &["auth", "storage", "extensions"];

const RELATIONAL: &[&str] = &["=", "<>", "!=", ">=", "<=", "<", ">"];

/// Schema and table a clause is attached to. Prefixes naming them are
/// redundant inside the clause and get stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Qualifier {
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl Qualifier {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: Some(table.into()),
        }
    }

    /// No qualifier stripping.
    pub fn none() -> Self {
        Self::default()
    }

    /// `(prefix, keep_calls)` in stripping order, longest first.
    fn prefixes(&self) -> Vec<(String, bool)> {
        let mut out = Vec::new();
        if let (Some(schema), Some(table)) = (&self.schema, &self.table) {
            out.push((format!("{schema}.{table}."), false));
        }
        if let Some(table) = &self.table {
            out.push((format!("{table}."), false));
        }
        if let Some(schema) = &self.schema {
            let platform = PLATFORM_SCHEMAS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(schema));
            out.push((format!("{schema}."), platform));
        }
        out
    }
}

/// Canonical form, including ordering of a lone equality.
pub fn normalize(sql: &str, qualifier: &Qualifier) -> String {
    fixpoint(sql, qualifier, true)
}

/// Canonical form without reordering equality sides. This is the form
/// written back into declarations.
pub fn simplify(sql: &str, qualifier: &Qualifier) -> String {
    fixpoint(sql, qualifier, false)
}

pub fn normalized_eq(a: &str, b: &str, qualifier: &Qualifier) -> bool {
    normalize(a, qualifier) == normalize(b, qualifier)
}

fn fixpoint(sql: &str, qualifier: &Qualifier, order: bool) -> String {
    let mut current = pass(sql, qualifier, order);
    for _ in 0..8 {
        let next = pass(&current, qualifier, order);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn pass(sql: &str, qualifier: &Qualifier, order: bool) -> String {
    let s = lexical(sql, qualifier);

    for (keyword, other) in [("OR", "AND"), ("AND", "OR")] {
        let parts = scan::split_top_level(&s, keyword);
        if parts.len() > 1 {
            return parts
                .iter()
                .map(|part| {
                    let inner = pass(part, qualifier, order);
                    if scan::has_top_level_word(&inner, other) {
                        format!("({inner})")
                    } else {
                        inner
                    }
                })
                .collect::<Vec<_>>()
                .join(&format!(" {keyword} "));
        }
    }

    if let Some(rest) = strip_not(&s) {
        let inner = pass(rest, qualifier, order);
        return if is_atom(&inner) {
            format!("NOT {inner}")
        } else {
            format!("NOT ({inner})")
        };
    }

    if order { order_equality(&s) } else { s }
}

// =============================================================================
// Lexical steps
// =============================================================================

fn lexical(sql: &str, qualifier: &Qualifier) -> String {
    let s = scan::strip_outer_parens(sql);
    let s = scan::map_code(s, |code| {
        let code = code.replace('"', "");
        let code = CAST.replace_all(&code, "");
        let code = KEYWORD.replace_all(&code, |caps: &Captures| caps[1].to_ascii_uppercase());
        space_operators(&code)
    });
    let s = collapse(&s);
    let s = unwrap_atoms(&s);
    let prefixes = qualifier.prefixes();
    let s = scan::map_code(&s, |code| {
        prefixes
            .iter()
            .fold(code.to_string(), |acc, (prefix, keep_calls)| {
                strip_qualifier(&acc, prefix, *keep_calls)
            })
    });
    collapse(&s)
}

fn collapse(sql: &str) -> String {
    let s = scan::map_code(sql, |code| {
        WHITESPACE
            .replace_all(code, " ")
            .replace("( ", "(")
            .replace(" )", ")")
    });
    s.trim().to_string()
}

/// Single spaces around relational operators; other operator runs untouched.
fn space_operators(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len() + 8);
    let mut i = 0;
    let mut last = 0;

    while i < bytes.len() {
        if !is_operator_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && is_operator_byte(bytes[i]) {
            i += 1;
        }
        let run = &code[start..i];
        if RELATIONAL.contains(&run) {
            out.push_str(code[last..start].trim_end());
            out.push(' ');
            out.push_str(run);
            out.push(' ');
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            last = i;
        }
    }
    out.push_str(&code[last..]);
    out
}

/// `(atom)` becomes `atom`, repeatedly. Parentheses of a call or after a
/// plain word (`IN (...)`, `EXISTS (...)`) are kept.
fn unwrap_atoms(sql: &str) -> String {
    let mut s = sql.to_string();
    loop {
        let depths = scan::depths(&s);
        let group = s.bytes().enumerate().find_map(|(i, b)| {
            if b != b'(' || depths[i].is_none() || !opens_group(&s, i) {
                return None;
            }
            let close = scan::matching_paren(&s, i)?;
            is_atom(s[i + 1..close].trim()).then_some((i, close))
        });
        let Some((open, close)) = group else {
            return s;
        };
        s = format!("{}{}{}", &s[..open], s[open + 1..close].trim(), &s[close + 1..]);
    }
}

fn opens_group(sql: &str, open: usize) -> bool {
    let before = sql[..open].trim_end();
    let Some(&prev) = before.as_bytes().last() else {
        return true;
    };
    if is_operator_byte(prev) || prev == b'(' || prev == b',' {
        return true;
    }
    if before.len() < open && is_ident_byte(prev) {
        let word_start = before
            .bytes()
            .rposition(|b| !is_ident_byte(b))
            .map_or(0, |p| p + 1);
        let word = &before[word_start..];
        return ["AND", "OR", "NOT"]
            .iter()
            .any(|kw| word.eq_ignore_ascii_case(kw));
    }
    false
}

fn is_path(s: &str) -> bool {
    let mut bytes = s.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| is_ident_byte(b) || b == b'.')
}

fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && parts
            .next()
            .is_none_or(|frac| !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()))
}

/// Identifier path, number, string literal or a call like `auth.uid()`.
pub(crate) fn is_atom(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if is_path(s) || is_number(s) {
        return true;
    }
    if let [scan::Piece::Literal(lit)] = scan::pieces(s).as_slice() {
        return lit.len() >= 2 && lit.ends_with('\'');
    }
    match s.find('(') {
        Some(open) if open > 0 && is_path(&s[..open]) => {
            scan::matching_paren(s, open) == Some(s.len() - 1)
        }
        _ => false,
    }
}

/// Remove `prefix` where it starts a word. With `keep_calls`, a prefix in
/// front of a call (`storage.foldername(name)`) stays.
fn strip_qualifier(code: &str, prefix: &str, keep_calls: bool) -> String {
    if prefix.is_empty() {
        return code.to_string();
    }
    let lower = code.to_ascii_lowercase();
    let needle = prefix.to_ascii_lowercase();
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&needle) {
        let at = from + pos;
        let rest = at + needle.len();
        from = rest;

        let bounded = at == 0 || !(is_ident_byte(bytes[at - 1]) || bytes[at - 1] == b'.');
        let before_call = keep_calls && {
            let end = rest
                + bytes[rest..]
                    .iter()
                    .take_while(|b| is_ident_byte(**b))
                    .count();
            bytes.get(end) == Some(&b'(')
        };
        if bounded && !before_call {
            out.push_str(&code[last..at]);
            last = rest;
        }
    }
    out.push_str(&code[last..]);
    out
}

fn strip_not(s: &str) -> Option<&str> {
    let head = s.get(..3)?;
    if !head.eq_ignore_ascii_case("NOT") {
        return None;
    }
    let rest = &s[3..];
    match rest.bytes().next() {
        Some(b) if b.is_ascii_whitespace() || b == b'(' => {
            let rest = rest.trim();
            (!rest.is_empty()).then_some(rest)
        }
        _ => None,
    }
}

/// Order the sides of a single top-level `=` so the smaller one comes first.
fn order_equality(s: &str) -> String {
    let ops = scan::top_level_operators(s);
    let [(start, end)] = ops.as_slice() else {
        return s.to_string();
    };
    if &s[*start..*end] != "="
        || NON_EQUALITY_WORDS
            .iter()
            .any(|kw| scan::has_top_level_word(s, kw))
    {
        return s.to_string();
    }
    let (lhs, rhs) = (s[..*start].trim(), s[*end..].trim());
    if lhs.is_empty() || rhs.is_empty() {
        return s.to_string();
    }
    if lhs <= rhs {
        format!("{lhs} = {rhs}")
    } else {
        format!("{rhs} = {lhs}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courses() -> Qualifier {
        Qualifier::new("public", "courses")
    }

    #[test]
    fn deparsed_policy_matches_handwritten() {
        let remote = r#"(("public"."courses"."owner_id")::text = (auth.uid())::text)"#;
        assert_eq!(normalize(remote, &courses()), "auth.uid() = owner_id");
        assert_eq!(simplify(remote, &courses()), "owner_id = auth.uid()");
        assert!(normalized_eq(remote, "owner_id = auth.uid()", &courses()));
    }

    #[test]
    fn idempotent() {
        for sql in [
            r#"(("public"."courses"."owner_id")::text = (auth.uid())::text)"#,
            "a = 1 OR (b = 2 AND c = 3)",
            "NOT (FALSE)",
            "status::character varying(20) = 'open'::text",
            "EXISTS (SELECT 1 FROM members m WHERE m.user_id = auth.uid())",
        ] {
            let once = normalize(sql, &courses());
            assert_eq!(normalize(&once, &courses()), once, "{sql}");
        }
    }

    #[test]
    fn equality_is_commutative() {
        assert_eq!(
            normalize("b = a", &Qualifier::none()),
            normalize("a = b", &Qualifier::none())
        );
        // only a lone equality is reordered
        assert_eq!(normalize("b >= a", &Qualifier::none()), "b >= a");
        assert_eq!(normalize("b = a IS TRUE", &Qualifier::none()), "b = a IS TRUE");
    }

    #[test]
    fn parentheses_do_not_matter() {
        let q = Qualifier::none();
        assert_eq!(normalize("((x = 1))", &q), normalize("x = 1", &q));
        assert_eq!(
            normalize("(a = 1) AND (b = 2)", &q),
            normalize("a = 1 AND b = 2", &q)
        );
        assert_eq!(
            normalize("a = 1 OR b = 2 AND c = 3", &q),
            "1 = a OR (2 = b AND 3 = c)"
        );
    }

    #[test]
    fn casts_and_literals() {
        let q = Qualifier::none();
        assert_eq!(
            normalize("created_at > now()::timestamp with time zone", &q),
            "created_at > now()"
        );
        assert_eq!(normalize("tags = '{}'::text[]", &q), "'{}' = tags");
        // literal contents are left alone
        assert_eq!(simplify("name = 'A  \"b\"::text'", &q), "name = 'A  \"b\"::text'");
        assert_eq!(simplify("flag = true", &q), "flag = TRUE");
    }

    #[test]
    fn qualifiers_are_word_bounded() {
        let q = courses();
        assert_eq!(simplify("courses.id = mycourses.id", &q), "id = mycourses.id");
        assert_eq!(
            simplify("public.is_admin() AND public.courses.open", &q),
            "is_admin() AND open"
        );
        assert!(normalized_eq("public.is_admin()", "is_admin()", &q));
        assert!(!normalized_eq("other.is_admin()", "is_admin()", &q));
        // platform functions keep their schema
        let objects = Qualifier::new("storage", "objects");
        assert_eq!(
            simplify("objects.owner = storage.owner_of(objects.name)", &objects),
            "owner = storage.owner_of(name)"
        );
        assert_eq!(simplify("x = 1", &Qualifier::none()), "x = 1");
    }

    #[test]
    fn negation_is_not_reduced() {
        let q = Qualifier::none();
        assert_eq!(normalize("NOT (FALSE)", &q), "NOT FALSE");
        assert_eq!(normalize("not (b = a)", &q), "NOT (a = b)");
    }

    #[test]
    fn keeps_list_and_call_parentheses() {
        let q = Qualifier::none();
        assert_eq!(simplify("role IN ('a')", &q), "role IN ('a')");
        assert_eq!(simplify("(auth.uid()) = owner", &q), "auth.uid() = owner");
        assert_eq!(simplify("lower((email)) = 'x'", &q), "lower(email) = 'x'");
    }
}
