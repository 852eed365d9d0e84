//! Lexical scanning shared by the normalizer, the parser and the storage
//! helpers.
//!
//! Nothing here tokenizes SQL fully. The scanner only knows enough to tell
//! code from quoted text and to track parenthesis depth.

/// A run of SQL text that is either code or a single-quoted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    Code(&'a str),
    Literal(&'a str),
}

/// Split into code and single-quoted literal pieces. A doubled `''` stays
/// inside its literal; an unterminated literal runs to the end.
pub(crate) fn pieces(sql: &str) -> Vec<Piece<'_>> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_literal = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if !in_literal {
                if i > start {
                    out.push(Piece::Code(&sql[start..i]));
                }
                start = i;
                in_literal = true;
            } else if bytes.get(i + 1) == Some(&b'\'') {
                i += 1;
            } else {
                out.push(Piece::Literal(&sql[start..=i]));
                start = i + 1;
                in_literal = false;
            }
        }
        i += 1;
    }

    if start < bytes.len() {
        let rest = &sql[start..];
        out.push(if in_literal {
            Piece::Literal(rest)
        } else {
            Piece::Code(rest)
        });
    }
    out
}

/// Rewrite the code pieces of `sql`, leaving literals untouched.
pub fn map_code(sql: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(sql.len());
    for piece in pieces(sql) {
        match piece {
            Piece::Code(code) => out.push_str(&f(code)),
            Piece::Literal(lit) => out.push_str(lit),
        }
    }
    out
}

/// Parenthesis depth of every byte, or `None` for bytes inside (and
/// including) single or double quotes. An opening parenthesis carries the
/// depth outside it, as does its closing partner.
pub(crate) fn depths(sql: &str) -> Vec<Option<usize>> {
    let mut out = Vec::with_capacity(sql.len());
    let mut depth = 0usize;
    let mut single = false;
    let mut double = false;

    for b in sql.bytes() {
        match b {
            b'\'' if !double => {
                single = !single;
                out.push(None);
            }
            b'"' if !single => {
                double = !double;
                out.push(None);
            }
            _ if single || double => out.push(None),
            b'(' => {
                out.push(Some(depth));
                depth += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                out.push(Some(depth));
            }
            _ => out.push(Some(depth)),
        }
    }
    out
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn is_operator_byte(b: u8) -> bool {
    matches!(
        b,
        b'<' | b'>' | b'=' | b'!' | b'~' | b'+' | b'-' | b'*' | b'/' | b'%' | b'^' | b'&' | b'|'
            | b'#' | b'@' | b'?' | b':'
    )
}

/// Whether the whole expression is one parenthesized group.
pub fn is_wrapped(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'(' || bytes[bytes.len() - 1] != b')' {
        return false;
    }
    let depths = depths(sql);
    let last = bytes.len() - 1;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b')' && depths[i] == Some(0) {
            return i == last;
        }
    }
    false
}

/// Trim and remove parentheses enclosing the whole expression, repeatedly.
pub fn strip_outer_parens(sql: &str) -> &str {
    let mut s = sql.trim();
    while is_wrapped(s) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

/// Byte ranges of the words (`[A-Za-z0-9_]+`) outside quotes and parentheses.
pub(crate) fn top_level_words(sql: &str) -> Vec<(usize, usize)> {
    runs(sql, is_ident_byte)
}

/// Byte ranges of operator runs (`=`, `<>`, `->>`, ...) outside quotes and
/// parentheses. The sign of a negative number (`= -4`) is not an operator.
pub(crate) fn top_level_operators(sql: &str) -> Vec<(usize, usize)> {
    let bytes = sql.as_bytes();
    let mut out: Vec<(usize, usize)> = Vec::new();
    for (start, end) in runs(sql, is_operator_byte) {
        let prefix = out.last().map_or(0, |&(_, prev)| prev);
        let sign = &sql[start..end] == "-"
            && bytes.get(end).is_some_and(u8::is_ascii_digit)
            && sql[prefix..start].trim().is_empty();
        if !sign {
            out.push((start, end));
        }
    }
    out
}

fn runs(sql: &str, class: impl Fn(u8) -> bool) -> Vec<(usize, usize)> {
    let bytes = sql.as_bytes();
    let depths = depths(sql);
    let mut out = Vec::new();
    let mut start: Option<usize> = None;

    for i in 0..=bytes.len() {
        let inside = i < bytes.len() && depths[i] == Some(0) && class(bytes[i]);
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    out
}

/// Split on a top-level keyword (`AND`, `OR`), case-insensitively.
///
/// The `AND` of a `BETWEEN x AND y` does not split.
pub fn split_top_level<'a>(sql: &'a str, keyword: &str) -> Vec<&'a str> {
    let bytes = sql.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut pending_between = 0usize;
    let is_and = keyword.eq_ignore_ascii_case("AND");

    for (s, e) in top_level_words(sql) {
        let word = &sql[s..e];
        let dotted = (s > 0 && bytes[s - 1] == b'.') || bytes.get(e) == Some(&b'.');
        if dotted {
            continue;
        }
        if word.eq_ignore_ascii_case("BETWEEN") {
            pending_between += 1;
            continue;
        }
        if word.eq_ignore_ascii_case(keyword) {
            if is_and && pending_between > 0 {
                pending_between -= 1;
                continue;
            }
            parts.push(sql[start..s].trim());
            start = e;
        }
    }
    parts.push(sql[start..].trim());
    parts
}

/// Whether `keyword` appears as a top-level word.
pub(crate) fn has_top_level_word(sql: &str, keyword: &str) -> bool {
    top_level_words(sql)
        .into_iter()
        .any(|(s, e)| sql[s..e].eq_ignore_ascii_case(keyword))
}

/// Index of the parenthesis closing the one at `open`.
pub(crate) fn matching_paren(sql: &str, open: usize) -> Option<usize> {
    let depths = depths(sql);
    let target = depths.get(open).copied().flatten()?;
    sql.bytes()
        .enumerate()
        .skip(open + 1)
        .find(|&(i, b)| b == b')' && depths[i] == Some(target))
        .map(|(i, _)| i)
}
