//! Parser combinators using nom
//!
//! Reads the annotated structs of a Rust source file into declaration
//! records. Only the item shapes the generator writes and a reasonable hand
//! would write are understood: outer attributes, an optional visibility,
//! `struct Name` and a unit, tuple or named-field body. Anything else is
//! skipped.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, value},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};
use supaform_types::{AttrValue, Declaration, FieldDecl, ParamDecl};

// =============================================================================
// Raw Items
// =============================================================================

/// An outer attribute: `#[path]`, `#[path(args)]` or `#[path = value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawAttr<'a> {
    path: &'a str,
    args: Option<&'a str>,
}

impl RawAttr<'_> {
    /// Last path segment, `serde` for `#[serde(...)]`.
    fn name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawField<'a> {
    attrs: Vec<RawAttr<'a>>,
    ident: &'a str,
    ty: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawItem<'a> {
    attrs: Vec<RawAttr<'a>>,
    name: &'a str,
    fields: Vec<RawField<'a>>,
}

// =============================================================================
// Basic Combinators
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse a Rust identifier (alphanumeric + underscore, starting with letter or _)
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input)
}

/// Identifier that may be written raw (`r#type`).
fn field_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(tag("r#")), identifier)).parse(input)
}

fn keyword<'a>(
    word: &'static str,
) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(satisfy(is_ident_char))))
}

fn path(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(tag("::"), identifier)).parse(input)
}

/// `pub`, `pub(crate)`, `pub(in some::path)`
fn visibility(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        keyword("pub"),
        opt(preceded(
            multispace0,
            delimited(char('('), balanced_content('(', ')'), char(')')),
        )),
    ))
    .parse(input)
}

/// Length of the string literal starting at `input`, if any. Escapes are
/// skipped, not interpreted.
fn literal_len(input: &str) -> Option<usize> {
    if input.starts_with('r') {
        let (rest, _) = raw_string(input).ok()?;
        return Some(input.len() - rest.len());
    }
    let mut escaped = false;
    for (i, c) in input.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Parse content inside balanced delimiters, handling nesting and skipping
/// over string literals
fn balanced_content(open: char, close: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let mut depth = 0usize;
        let mut i = 0;

        while i < input.len() {
            let rest = &input[i..];
            if (rest.starts_with('"') || rest.starts_with("r#") || rest.starts_with("r\""))
                && let Some(len) = literal_len(rest)
            {
                i += len;
                continue;
            }
            let Some(c) = rest.chars().next() else {
                break;
            };
            if c == open {
                depth += 1;
            } else if c == close {
                if depth == 0 {
                    return Ok((&input[i..], &input[..i]));
                }
                depth -= 1;
            }
            i += c.len_utf8();
        }

        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeUntil,
        )))
    }
}

// =============================================================================
// Literals
// =============================================================================

fn cooked_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("'", tag("'")),
                    value("\n", tag("n")),
                    value("\r", tag("r")),
                    value("\t", tag("t")),
                    value("\0", tag("0")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )
    .parse(input)
}

/// `r"..."`, `r#"..."#`, with any number of hashes
fn raw_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('r').parse(input)?;
    let (input, hashes) = take_while(|c| c == '#').parse(input)?;
    let (input, _) = char('"').parse(input)?;
    let closing = format!("\"{hashes}");
    let (input, body) = take_until(closing.as_str()).parse(input)?;
    let (input, _) = tag(closing.as_str()).parse(input)?;
    Ok((input, body.to_string()))
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((raw_string, cooked_string)).parse(input)
}

fn boolean(input: &str) -> IResult<&str, bool> {
    alt((value(true, keyword("true")), value(false, keyword("false")))).parse(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(
        recognize(pair(opt(char('-')), take_while1(|c: char| c.is_ascii_digit() || c == '_'))),
        |s: &str| s.replace('_', "").parse::<i64>(),
    )
    .parse(input)
}

fn attr_value(input: &str) -> IResult<&str, AttrValue> {
    alt((
        map(string_literal, AttrValue::Str),
        map(boolean, AttrValue::Bool),
        map(integer, AttrValue::Int),
    ))
    .parse(input)
}

// =============================================================================
// Attributes
// =============================================================================

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse an attribute like #[model(table = "courses", rlsEnabled = true)]
fn attribute(input: &str) -> IResult<&str, RawAttr<'_>> {
    let (input, _) = pair(char('#'), ws(char('['))).parse(input)?;
    let (input, path) = ws(path).parse(input)?;
    let (input, args) = opt(alt((
        delimited(char('('), balanced_content('(', ')'), char(')')),
        preceded(ws(char('=')), balanced_content('[', ']')),
    )))
    .parse(input)?;
    let (input, _) = ws(char(']')).parse(input)?;
    Ok((input, RawAttr { path, args }))
}

/// `key = value, key = value,`
fn key_values(input: &str) -> IResult<&str, Vec<(&str, AttrValue)>> {
    terminated(
        separated_list0(
            char(','),
            ws(separated_pair(identifier, ws(char('=')), attr_value)),
        ),
        opt(ws(char(','))),
    )
    .parse(input)
}

/// One `serde` meta item, yielding the value of `rename = "..."`.
fn serde_meta(input: &str) -> IResult<&str, Option<String>> {
    let (input, key) = ws(identifier).parse(input)?;
    let (input, value) = opt(preceded(ws(char('=')), ws(string_literal))).parse(input)?;
    let (input, _) = opt(delimited(char('('), balanced_content('(', ')'), char(')'))).parse(input)?;
    Ok((input, value.filter(|_| key == "rename")))
}

fn serde_rename(attrs: &[RawAttr<'_>]) -> Option<String> {
    attrs
        .iter()
        .filter(|a| a.name() == "serde")
        .filter_map(|a| a.args)
        .find_map(|args| {
            let (_, metas) = separated_list0(char(','), serde_meta).parse(args).ok()?;
            metas.into_iter().flatten().next()
        })
}

/// The string argument of `#[column("...")]`-style tags.
fn tag_argument(attrs: &[RawAttr<'_>], name: &str) -> Result<Option<String>, String> {
    let Some(attr) = attrs.iter().find(|a| a.name() == name) else {
        return Ok(None);
    };
    let args = attr.args.unwrap_or_default().trim();
    match string_literal(args) {
        Ok((rest, value)) if rest.trim().is_empty() => Ok(Some(value)),
        _ => Err(format!("#[{name}(...)] expects a single string literal")),
    }
}

// =============================================================================
// Items
// =============================================================================

/// A struct field type, up to the next top-level comma.
fn field_type(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Ok((&input[i..], input[..i].trim())),
            _ => {}
        }
    }
    let ty = input.trim();
    if ty.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeWhile1,
        )));
    }
    Ok(("", ty))
}

/// Parse a struct field with optional attributes
fn field(input: &str) -> IResult<&str, RawField<'_>> {
    let (input, attrs) = many0(ws(attribute)).parse(input)?;
    let (input, _) = opt(ws(visibility)).parse(input)?;
    let (input, ident) = ws(field_identifier).parse(input)?;
    let (input, _) = ws(char(':')).parse(input)?;
    let (input, ty) = field_type(input)?;
    Ok((input, RawField { attrs, ident, ty }))
}

fn named_fields(input: &str) -> IResult<&str, Vec<RawField<'_>>> {
    terminated(separated_list0(ws(char(',')), field), opt(ws(char(',')))).parse(input)
}

/// Parse an annotated struct: #[derive(Model)] #[model(...)] pub struct Name { fields... }
fn item(input: &str) -> IResult<&str, RawItem<'_>> {
    let (input, attrs) = many1(ws(attribute)).parse(input)?;
    let (input, _) = opt(ws(visibility)).parse(input)?;
    let (input, _) = pair(keyword("struct"), multispace1).parse(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0.parse(input)?;

    let (input, fields) = alt((
        map(char(';'), |_| Vec::new()),
        map(
            terminated(
                delimited(char('('), balanced_content('(', ')'), char(')')),
                opt(ws(char(';'))),
            ),
            |_| Vec::new(),
        ),
        map_res(
            delimited(char('{'), balanced_content('{', '}'), char('}')),
            |body: &str| match named_fields(body) {
                Ok((rest, fields)) if rest.trim().is_empty() => Ok(fields),
                _ => Err("unparsed field"),
            },
        ),
    ))
    .parse(input)?;

    Ok((input, RawItem { attrs, name, fields }))
}

// =============================================================================
// Declarations
// =============================================================================

/// Replace comments with whitespace, leaving literals intact.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < source.len() {
        let rest = &source[i..];
        if rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            i += end;
            continue;
        }
        if rest.starts_with("/*") {
            let mut depth = 0usize;
            let mut j = 0;
            while j < rest.len() {
                if rest[j..].starts_with("/*") {
                    depth += 1;
                    j += 2;
                } else if rest[j..].starts_with("*/") {
                    depth -= 1;
                    j += 2;
                    if depth == 0 {
                        break;
                    }
                } else {
                    j += rest[j..].chars().next().map_or(1, char::len_utf8);
                }
            }
            out.push(' ');
            i += j;
            continue;
        }
        let starts_literal = rest.starts_with('"')
            || ((rest.starts_with("r#") || rest.starts_with("r\""))
                && !source[..i].ends_with(is_ident_char));
        if starts_literal && let Some(len) = literal_len(rest) {
            out.push_str(&rest[..len]);
            i += len;
            continue;
        }
        if let Some(len) = char_literal_len(rest) {
            out.push_str(&rest[..len]);
            i += len;
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }
    out
}

/// `'x'` or `'\n'`; lifetimes are not literals.
fn char_literal_len(rest: &str) -> Option<usize> {
    let mut chars = rest.char_indices();
    if chars.next()?.1 != '\'' {
        return None;
    }
    let (_, first) = chars.next()?;
    if first == '\\' {
        return rest[2..].find('\'').map(|end| end + 3);
    }
    let (close, c) = chars.next()?;
    (c == '\'').then_some(close + 1)
}

/// All supaform declarations in a source file.
pub fn parse_declarations(source: &str) -> Result<Vec<Declaration>, String> {
    let code = strip_comments(source);
    let mut out = Vec::new();
    let mut offset = 0;

    while let Some(found) = code[offset..].find("#[") {
        let start = offset + found;
        match item(&code[start..]) {
            Ok((rest, raw)) => {
                if let Some(decl) = declaration(&raw)? {
                    out.push(decl);
                }
                offset = code.len() - rest.len();
            }
            Err(_) => offset = start + 2,
        }
    }
    Ok(out)
}

fn declaration(raw: &RawItem<'_>) -> Result<Option<Declaration>, String> {
    let derives: Vec<&str> = raw
        .attrs
        .iter()
        .filter(|a| a.name() == "derive")
        .filter_map(|a| a.args)
        .flat_map(|args| args.split(','))
        .map(|d| d.trim().rsplit("::").next().unwrap_or_default().trim())
        .collect();
    let Some(mut decl) = derives
        .iter()
        .find_map(|derive| Declaration::for_derive(derive, raw.name))
    else {
        return Ok(None);
    };

    let attribute = decl.attribute();
    for attr in raw.attrs.iter().filter(|a| a.name() == attribute) {
        let args = attr.args.unwrap_or_default();
        let pairs = match key_values(args) {
            Ok((rest, pairs)) if rest.trim().is_empty() => pairs,
            _ => {
                return Err(format!(
                    "{}: cannot parse #[{attribute}(...)] arguments",
                    raw.name
                ));
            }
        };
        for (key, value) in pairs {
            decl.set(key, value)
                .map_err(|e| format!("{}: {e}", raw.name))?;
        }
    }

    match &mut decl {
        Declaration::Model(model) => {
            for f in &raw.fields {
                model.fields.push(FieldDecl {
                    ident: f.ident.to_string(),
                    rust_type: compact(f.ty),
                    serde_rename: serde_rename(&f.attrs),
                    column: tag_argument(&f.attrs, "column")?,
                    join: tag_argument(&f.attrs, "join")?,
                });
            }
        }
        Declaration::Rpc(rpc) => {
            for f in &raw.fields {
                rpc.params.push(ParamDecl {
                    ident: f.ident.to_string(),
                    rust_type: compact(f.ty),
                    param: tag_argument(&f.attrs, "param")?,
                });
            }
        }
        _ => {}
    }
    Ok(Some(decl))
}

/// Type text without whitespace, as the derive macros record it.
fn compact(ty: &str) -> String {
    ty.chars().filter(|c| !c.is_whitespace()).collect()
}
