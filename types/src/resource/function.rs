//! RPC functions

use serde::{Deserialize, Serialize};

/// Function volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Behavior {
    #[default]
    Volatile,
    Stable,
    Immutable,
}

impl Behavior {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volatile => "VOLATILE",
            Self::Stable => "STABLE",
            Self::Immutable => "IMMUTABLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VOLATILE" | "V" => Some(Self::Volatile),
            "STABLE" | "S" => Some(Self::Stable),
            "IMMUTABLE" | "I" => Some(Self::Immutable),
            _ => None,
        }
    }
}

/// SECURITY clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Security {
    #[default]
    Invoker,
    Definer,
}

impl Security {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoker => "INVOKER",
            Self::Definer => "DEFINER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INVOKER" => Some(Self::Invoker),
            "DEFINER" => Some(Self::Definer),
            _ => None,
        }
    }
}

/// Typed function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionParam {
    pub name: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl FunctionParam {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            default: None,
        }
    }
}

/// One column of a `RETURNS TABLE(...)` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnColumn {
    pub name: String,
    pub data_type: String,
}

/// Return type clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", content = "value", rename_all = "camelCase")]
pub enum ReturnType {
    Scalar(String),
    SetOf(String),
    Table(Vec<ReturnColumn>),
}

impl Default for ReturnType {
    fn default() -> Self {
        Self::Scalar("void".into())
    }
}

impl ReturnType {
    /// Parse `T`, `SETOF T` or `TABLE(col T, ...)`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let upper = s.to_ascii_uppercase();

        if let Some(rest) = upper.strip_prefix("SETOF")
            && rest.starts_with(char::is_whitespace)
        {
            return Self::SetOf(s[5..].trim().to_string());
        }

        if let Some(rest) = upper.strip_prefix("TABLE") {
            let offset = s.len() - rest.len();
            let inner = s[offset..].trim();
            if let Some(inner) = inner.strip_prefix('(').and_then(|i| i.strip_suffix(')')) {
                let columns = split_top_level_commas(inner)
                    .into_iter()
                    .filter_map(|col| {
                        let col = col.trim();
                        let (name, ty) = col.split_once(char::is_whitespace)?;
                        Some(ReturnColumn {
                            name: name.trim_matches('"').to_string(),
                            data_type: ty.trim().to_string(),
                        })
                    })
                    .collect();
                return Self::Table(columns);
            }
        }

        Self::Scalar(s.to_string())
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

impl std::fmt::Display for ReturnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(ty) => f.write_str(ty),
            Self::SetOf(ty) => write!(f, "SETOF {ty}"),
            Self::Table(cols) => {
                f.write_str("TABLE(")?;
                for (i, col) in cols.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", col.name, col.data_type)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A model bound into a function definition under an alias.
///
/// `:alias` tokens in the definition template are replaced with the bound
/// table name when the function is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBinding {
    pub alias: String,
    /// Struct name of the bound model
    pub model: String,
    pub schema: String,
    pub table: String,
}

/// Runtime function entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<FunctionParam>,
    pub returns: ReturnType,
    pub language: String,
    #[serde(default)]
    pub behavior: Behavior,
    #[serde(default)]
    pub security: Security,
    /// Concrete body, with bound aliases already substituted
    pub definition: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<ModelBinding>,
}

impl Function {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            params: Vec::new(),
            returns: ReturnType::default(),
            language: "plpgsql".into(),
            behavior: Behavior::default(),
            security: Security::default(),
            definition: String::new(),
            bindings: Vec::new(),
        }
    }

    /// Parameter types joined by `, `, the overload-distinguishing part of the identity.
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|p| p.data_type.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn identity(&self) -> String {
        format!("{}.{}({})", self.schema, self.name, self.signature())
    }
}

/// Split on commas that are not nested inside parentheses or quotes.
pub fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' if !in_single && !in_double => depth += 1,
            ')' if !in_single && !in_double => depth = depth.saturating_sub(1),
            ',' if depth == 0 && !in_single && !in_double => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() || !parts.is_empty() {
        parts.push(&s[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_return_forms() {
        assert_eq!(ReturnType::parse("integer"), ReturnType::Scalar("integer".into()));
        assert_eq!(
            ReturnType::parse("SETOF submission"),
            ReturnType::SetOf("submission".into())
        );
        assert_eq!(
            ReturnType::parse("setof public.submission"),
            ReturnType::SetOf("public.submission".into())
        );

        let table = ReturnType::parse("TABLE(id bigint, total numeric(10,2))");
        assert_eq!(table.to_string(), "TABLE(id bigint, total numeric(10,2))");
        assert!(table.is_set());
    }

    #[test]
    fn setof_prefix_needs_whitespace() {
        assert_eq!(ReturnType::parse("setofthings"), ReturnType::Scalar("setofthings".into()));
    }

    #[test]
    fn identity_includes_signature() {
        let mut f = Function::new("public", "get_submissions");
        f.params.push(FunctionParam::new("candidate_id", "uuid"));
        f.params.push(FunctionParam::new("limit_to", "integer"));
        assert_eq!(f.identity(), "public.get_submissions(uuid, integer)");
    }

    #[test]
    fn splits_respecting_nesting() {
        assert_eq!(
            split_top_level_commas("a numeric(10,2), b text DEFAULT 'x,y'"),
            vec!["a numeric(10,2)", " b text DEFAULT 'x,y'"]
        );
        assert!(split_top_level_commas("").is_empty());
    }
}
