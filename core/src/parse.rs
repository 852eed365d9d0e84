//! Parsing clause text back into a builder tree.
//!
//! The grammar is the subset the builders produce for policies: `OR`/`AND`
//! compositions, `NOT`, grouping parentheses, `TRUE`/`FALSE` and equalities
//! between identifiers, literals and the known auth calls. Everything else is
//! kept verbatim as [`Node::Raw`] and the tree is marked unreducible.
//!
//! Parsing never fails.

use crate::scan;

/// Calls the parser recognizes as operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownCall {
    AuthUid,
    AuthRole,
    AuthJwt,
    Now,
    CurrentSetting { key: String, missing_ok: Option<bool> },
}

/// One side of an equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Column or qualified reference, segments joined with `.` and unquoted.
    Ident(String),
    /// String literal, unescaped.
    Str(String),
    Int(i64),
    Bool(bool),
    Call(KnownCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Eq(Operand, Operand),
    Bool(bool),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub node: Node,
    /// Whether every leaf was classified. When false, `node` is
    /// `Node::Raw` holding the input text.
    pub reducible: bool,
}

pub fn parse(sql: &str) -> Parsed {
    let text = sql.trim();
    match parse_node(text) {
        Some(node) => Parsed {
            node,
            reducible: true,
        },
        None => Parsed {
            node: Node::Raw(text.to_string()),
            reducible: false,
        },
    }
}

fn parse_node(sql: &str) -> Option<Node> {
    let s = sql.trim();
    if s.is_empty() {
        return None;
    }

    for (keyword, build) in [("OR", Node::Or as fn(Vec<Node>) -> Node), ("AND", Node::And)] {
        let parts = scan::split_top_level(s, keyword);
        if parts.len() > 1 {
            let nodes = parts
                .into_iter()
                .map(parse_node)
                .collect::<Option<Vec<_>>>()?;
            return Some(build(nodes));
        }
    }

    if let Some(rest) = strip_keyword(s, "NOT") {
        return Some(Node::Not(Box::new(parse_node(rest)?)));
    }

    if scan::is_wrapped(s) {
        return parse_node(&s[1..s.len() - 1]);
    }

    parse_leaf(s)
}

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    match rest.bytes().next() {
        Some(b) if b.is_ascii_whitespace() || b == b'(' => Some(rest.trim_start()),
        _ => None,
    }
}

fn parse_leaf(s: &str) -> Option<Node> {
    if s.eq_ignore_ascii_case("TRUE") {
        return Some(Node::Bool(true));
    }
    if s.eq_ignore_ascii_case("FALSE") {
        return Some(Node::Bool(false));
    }
    let ops = scan::top_level_operators(s);
    let [(start, end)] = ops.as_slice() else {
        return None;
    };
    if &s[*start..*end] != "=" {
        return None;
    }
    let lhs = operand(s[..*start].trim())?;
    let rhs = operand(s[*end..].trim())?;
    Some(Node::Eq(lhs, rhs))
}

fn operand(s: &str) -> Option<Operand> {
    if s.is_empty() {
        return None;
    }
    if scan::is_wrapped(s) {
        return operand(s[1..s.len() - 1].trim());
    }
    if s.eq_ignore_ascii_case("true") {
        return Some(Operand::Bool(true));
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(Operand::Bool(false));
    }
    if let Some(value) = string_literal(s) {
        return Some(Operand::Str(value));
    }
    if let Some(call) = known_call(s) {
        return Some(Operand::Call(call));
    }
    if let Ok(value) = s.parse::<i64>() {
        return Some(Operand::Int(value));
    }
    ident_path(s).map(Operand::Ident)
}

/// `'...'` with `''` escapes, nothing after the closing quote.
fn string_literal(s: &str) -> Option<String> {
    match scan::pieces(s).as_slice() {
        [scan::Piece::Literal(lit)] if lit.len() >= 2 && lit.ends_with('\'') => {
            Some(lit[1..lit.len() - 1].replace("''", "'"))
        }
        _ => None,
    }
}

fn known_call(s: &str) -> Option<KnownCall> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.to_ascii_lowercase().as_str() {
        "auth.uid()" => return Some(KnownCall::AuthUid),
        "auth.role()" => return Some(KnownCall::AuthRole),
        "auth.jwt()" => return Some(KnownCall::AuthJwt),
        "now()" => return Some(KnownCall::Now),
        _ => {}
    }

    let open = s.find('(')?;
    if !s[..open].trim().eq_ignore_ascii_case("current_setting")
        || scan::matching_paren(s, open) != Some(s.len() - 1)
    {
        return None;
    }
    let args = &s[open + 1..s.len() - 1];
    let (key, flag) = match args.rsplit_once(',') {
        Some((key, flag)) if string_literal(flag.trim()).is_none() => (key, Some(flag.trim())),
        _ => (args, None),
    };
    let key = string_literal(key.trim())?;
    let missing_ok = match flag {
        None => None,
        Some(f) if f.eq_ignore_ascii_case("true") => Some(true),
        Some(f) if f.eq_ignore_ascii_case("false") => Some(false),
        Some(_) => return None,
    };
    Some(KnownCall::CurrentSetting { key, missing_ok })
}

/// `a`, `t.a`, `"s"."t"."a"`; quoted segments may hold any text except `"`.
fn ident_path(s: &str) -> Option<String> {
    let mut segments = Vec::new();
    let mut rest = s;
    loop {
        let (segment, tail) = if let Some(quoted) = rest.strip_prefix('"') {
            let close = quoted.find('"')?;
            (&quoted[..close], &quoted[close + 1..])
        } else {
            let len = rest
                .bytes()
                .take_while(|b| scan::is_ident_byte(*b))
                .count();
            let word = &rest[..len];
            if !word.bytes().next().is_some_and(|b| b.is_ascii_alphabetic() || b == b'_') {
                return None;
            }
            (word, &rest[len..])
        };
        if segment.is_empty() {
            return None;
        }
        segments.push(segment);
        match tail.strip_prefix('.') {
            Some(next) => rest = next,
            None if tail.is_empty() => break,
            None => return None,
        }
    }
    Some(segments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(l: Operand, r: Operand) -> Node {
        Node::Eq(l, r)
    }

    #[test]
    fn ownership_check() {
        let parsed = parse("owner_id = auth.uid()");
        assert!(parsed.reducible);
        assert_eq!(
            parsed.node,
            eq(Operand::Ident("owner_id".into()), Operand::Call(KnownCall::AuthUid))
        );
    }

    #[test]
    fn compositions() {
        let parsed = parse("NOT (a = 1) AND (b = 'x' OR TRUE)");
        assert_eq!(
            parsed.node,
            Node::And(vec![
                Node::Not(Box::new(eq(Operand::Ident("a".into()), Operand::Int(1)))),
                Node::Or(vec![
                    eq(Operand::Ident("b".into()), Operand::Str("x".into())),
                    Node::Bool(true),
                ]),
            ])
        );
    }

    #[test]
    fn unknown_leaf_falls_back() {
        let sql = "owner_id = auth.uid() OR EXISTS(SELECT 1 FROM x)";
        let parsed = parse(sql);
        assert!(!parsed.reducible);
        assert_eq!(parsed.node, Node::Raw(sql.into()));

        assert!(!parse("a::text = 'x'").reducible);
        assert!(!parse("a >= 1").reducible);
        assert!(!parse("").reducible);
    }

    #[test]
    fn operand_forms() {
        assert_eq!(
            parse(r#""public"."docs"."owner" = 'it''s'"#).node,
            eq(
                Operand::Ident("public.docs.owner".into()),
                Operand::Str("it's".into())
            )
        );
        assert_eq!(
            parse("current_setting('app.tenant', true) = tenant_id").node,
            eq(
                Operand::Call(KnownCall::CurrentSetting {
                    key: "app.tenant".into(),
                    missing_ok: Some(true)
                }),
                Operand::Ident("tenant_id".into())
            )
        );
        assert_eq!(
            parse(r#""balance" = -4"#).node,
            eq(Operand::Ident("balance".into()), Operand::Int(-4))
        );
        assert_eq!(
            parse("auth.role() = 'authenticated'").node,
            eq(
                Operand::Call(KnownCall::AuthRole),
                Operand::Str("authenticated".into())
            )
        );
    }
}
