//! Source text building blocks: names, literals and item attributes

use heck::{ToPascalCase, ToSnakeCase};

/// Rust keywords that need the raw identifier form.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers.
const RESERVED: &[&str] = &["crate", "self", "super", "Self", "_"];

/// Items longer than this are written one argument per line.
const LINE_WIDTH: usize = 100;

/// Struct name of a schema-scoped resource. Outside `public` the schema
/// becomes part of the name.
pub fn struct_name(schema: &str, name: &str) -> String {
    let base = if schema == "public" {
        name.to_pascal_case()
    } else {
        format!("{schema}_{name}").to_pascal_case()
    };
    if base.starts_with(|c: char| c.is_ascii_digit()) || base.is_empty() {
        format!("T{base}")
    } else {
        base
    }
}

/// File stem of the file holding `struct_name`.
pub fn file_stem(struct_name: &str) -> String {
    struct_name.to_snake_case()
}

/// A usable identifier for a field or module named `name`.
pub fn ident(name: &str) -> String {
    let mut ident = name.to_snake_case();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RESERVED.contains(&ident.as_str()) {
        ident.push('_');
        return ident;
    }
    if KEYWORDS.contains(&ident.as_str()) {
        return format!("r#{ident}");
    }
    ident
}

/// `ident` with the raw prefix removed, the name other code sees.
pub fn bare(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// A cooked string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A raw string literal with enough hashes for `value`.
pub fn raw_string_literal(value: &str) -> String {
    let mut longest = 0;
    let mut run: Option<usize> = None;
    for c in value.chars() {
        run = match (c, run) {
            ('"', _) => Some(0),
            ('#', Some(n)) => Some(n + 1),
            _ => None,
        };
        if let Some(n) = run {
            longest = longest.max(n);
        }
    }
    let hashes = if value.contains('"') {
        "#".repeat(longest + 1)
    } else {
        "#".to_string()
    };
    format!("r{hashes}\"{value}\"{hashes}")
}

/// SQL text as a literal: raw when it quotes identifiers, cooked otherwise.
pub fn sql_literal(value: &str) -> String {
    if value.contains('"') || value.contains('\\') {
        raw_string_literal(value)
    } else {
        string_literal(value)
    }
}

/// Marker line, imports and a blank line.
pub fn header(marker: &str, imports: &[String]) -> String {
    let mut code = String::new();
    code.push_str(marker);
    code.push_str("\n\n");
    for import in imports {
        code.push_str(import);
        code.push('\n');
    }
    if !imports.is_empty() {
        code.push('\n');
    }
    code
}

/// `use super::{A, B};`
pub fn use_siblings(names: &[String]) -> Option<String> {
    match names {
        [] => None,
        [one] => Some(format!("use super::{one};")),
        many => Some(format!("use super::{{{}}};", many.join(", "))),
    }
}

// =============================================================================
// Item Attributes
// =============================================================================

/// An item-level attribute such as `#[model(schema = "public", ...)]`.
#[derive(Debug, Clone)]
pub struct ItemAttr {
    name: &'static str,
    args: Vec<String>,
    wrap: bool,
}

impl ItemAttr {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
            wrap: false,
        }
    }

    /// One argument per line whatever the width.
    pub fn wrapped(mut self) -> Self {
        self.wrap = true;
        self
    }

    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.args.push(format!("{key} = {}", string_literal(value)));
        self
    }

    /// SQL valued argument.
    pub fn sql(mut self, key: &str, value: &str) -> Self {
        self.args.push(format!("{key} = {}", sql_literal(value)));
        self
    }

    pub fn raw(mut self, key: &str, value: &str) -> Self {
        self.args.push(format!("{key} = {}", raw_string_literal(value)));
        self
    }

    pub fn flag(mut self, key: &str, value: bool) -> Self {
        self.args.push(format!("{key} = {value}"));
        self
    }

    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.args.push(format!("{key} = {value}"));
        self
    }

    pub fn maybe_string(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.string(key, value),
            None => self,
        }
    }

    pub fn maybe_sql(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.sql(key, value),
            None => self,
        }
    }

    /// Comma list argument, omitted when empty.
    pub fn list(self, key: &str, values: &[String]) -> Self {
        if values.is_empty() {
            self
        } else {
            self.string(key, &values.join(","))
        }
    }

    pub fn render(&self) -> String {
        let single = format!("#[{}({})]", self.name, self.args.join(", "));
        if !self.wrap && single.len() <= LINE_WIDTH && !single.contains('\n') {
            return single;
        }
        let mut out = format!("#[{}(\n", self.name);
        for arg in &self.args {
            out.push_str("    ");
            out.push_str(arg);
            out.push_str(",\n");
        }
        out.push_str(")]");
        out
    }
}

/// `#[tag("...")]` for `column`, `join` and `param` tags.
pub fn tag_attr(name: &str, tag: &str) -> String {
    format!("#[{name}({})]", string_literal(tag))
}
