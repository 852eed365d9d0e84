//! Directive grammar for `column`, `join` and `param` tags
//!
//! A tag is a `;`-separated list of directives. A directive is either
//! `key:value` or a bare `flag`:
//!
//! ```text
//! name:id;type:bigint;primaryKey;autoIncrement;nullable:false;default:0;unique
//! joinType:hasMany;primaryKey:id;foreignKey:course_id
//! name:candidate_id;type:uuid;default:NULL
//! ```
//!
//! Parsing then printing a tag yields its canonical directive order, which is
//! what the generator writes.

use crate::resource::RelationKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("unknown {tag} directive '{key}'")]
    UnknownDirective { tag: &'static str, key: String },

    #[error("{tag} directive '{key}' expects a value")]
    MissingValue { tag: &'static str, key: String },

    #[error("invalid value '{value}' for {tag} directive '{key}'")]
    InvalidValue {
        tag: &'static str,
        key: String,
        value: String,
    },

    #[error("{tag} tag is missing required directive '{key}'")]
    Missing { tag: &'static str, key: &'static str },
}

/// Split a tag into `(key, value)` directives.
///
/// `;` inside single-quoted literals does not terminate a directive.
pub fn directives(tag: &str) -> Vec<(&str, Option<&str>)> {
    let mut out = Vec::new();
    let mut in_quote = false;
    let mut start = 0;

    for (i, c) in tag.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            ';' if !in_quote => {
                push_directive(&tag[start..i], &mut out);
                start = i + 1;
            }
            _ => {}
        }
    }
    push_directive(&tag[start..], &mut out);
    out
}

fn push_directive<'a>(part: &'a str, out: &mut Vec<(&'a str, Option<&'a str>)>) {
    let part = part.trim();
    if part.is_empty() {
        return;
    }
    match part.split_once(':') {
        Some((key, value)) => out.push((key.trim(), Some(value.trim()))),
        None => out.push((part, None)),
    }
}

/// Split a comma-separated list (`"anon, authenticated"`), dropping empty items.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn required<'a>(tag: &'static str, key: &str, value: Option<&'a str>) -> Result<&'a str, TagError> {
    value.ok_or_else(|| TagError::MissingValue {
        tag,
        key: key.to_string(),
    })
}

fn parse_bool(tag: &'static str, key: &str, value: Option<&str>) -> Result<bool, TagError> {
    match value {
        None => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(TagError::InvalidValue {
            tag,
            key: key.to_string(),
            value: v.to_string(),
        }),
    }
}

// =============================================================================
// column
// =============================================================================

/// Parsed `column` tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTag {
    pub name: Option<String>,
    pub data_type: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub nullable: Option<bool>,
    pub default: Option<String>,
    pub unique: bool,
}

impl ColumnTag {
    const TAG: &'static str = "column";

    pub fn parse(tag: &str) -> Result<Self, TagError> {
        let mut out = Self::default();
        for (key, value) in directives(tag) {
            match key {
                "name" => out.name = Some(required(Self::TAG, key, value)?.to_string()),
                "type" => out.data_type = Some(required(Self::TAG, key, value)?.to_string()),
                "primaryKey" => out.primary_key = parse_bool(Self::TAG, key, value)?,
                "autoIncrement" => out.auto_increment = parse_bool(Self::TAG, key, value)?,
                "nullable" => out.nullable = Some(parse_bool(Self::TAG, key, value)?),
                "default" => out.default = Some(required(Self::TAG, key, value)?.to_string()),
                "unique" => out.unique = parse_bool(Self::TAG, key, value)?,
                other => {
                    return Err(TagError::UnknownDirective {
                        tag: Self::TAG,
                        key: other.to_string(),
                    });
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for ColumnTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(format!("name:{name}"));
        }
        if let Some(ty) = &self.data_type {
            parts.push(format!("type:{ty}"));
        }
        if self.primary_key {
            parts.push("primaryKey".to_string());
        }
        if self.auto_increment {
            parts.push("autoIncrement".to_string());
        }
        if let Some(nullable) = self.nullable {
            parts.push(format!("nullable:{nullable}"));
        }
        if let Some(default) = &self.default {
            parts.push(format!("default:{default}"));
        }
        if self.unique {
            parts.push("unique".to_string());
        }
        f.write_str(&parts.join(";"))
    }
}

// =============================================================================
// join
// =============================================================================

/// Parsed `join` tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinTag {
    pub join_type: RelationKind,
    pub primary_key: Option<String>,
    pub foreign_key: Option<String>,
    pub through: Option<String>,
    pub source_primary_key: Option<String>,
    pub source_foreign_key: Option<String>,
    pub target_primary_key: Option<String>,
    pub target_foreign: Option<String>,
}

impl JoinTag {
    const TAG: &'static str = "join";

    pub fn parse(tag: &str) -> Result<Self, TagError> {
        let mut out = Self::default();
        let mut saw_type = false;
        for (key, value) in directives(tag) {
            let slot = match key {
                "joinType" => {
                    let v = required(Self::TAG, key, value)?;
                    out.join_type = v.parse().map_err(|_| TagError::InvalidValue {
                        tag: Self::TAG,
                        key: key.to_string(),
                        value: v.to_string(),
                    })?;
                    saw_type = true;
                    continue;
                }
                "primaryKey" => &mut out.primary_key,
                "foreignKey" => &mut out.foreign_key,
                "through" => &mut out.through,
                "sourcePrimaryKey" => &mut out.source_primary_key,
                "sourceForeignKey" => &mut out.source_foreign_key,
                "targetPrimaryKey" => &mut out.target_primary_key,
                "targetForeign" => &mut out.target_foreign,
                other => {
                    return Err(TagError::UnknownDirective {
                        tag: Self::TAG,
                        key: other.to_string(),
                    });
                }
            };
            *slot = Some(required(Self::TAG, key, value)?.to_string());
        }
        if !saw_type {
            return Err(TagError::Missing {
                tag: Self::TAG,
                key: "joinType",
            });
        }
        Ok(out)
    }
}

impl std::fmt::Display for JoinTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = vec![format!("joinType:{}", self.join_type)];
        let named = [
            ("primaryKey", &self.primary_key),
            ("foreignKey", &self.foreign_key),
            ("through", &self.through),
            ("sourcePrimaryKey", &self.source_primary_key),
            ("sourceForeignKey", &self.source_foreign_key),
            ("targetPrimaryKey", &self.target_primary_key),
            ("targetForeign", &self.target_foreign),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                parts.push(format!("{key}:{value}"));
            }
        }
        f.write_str(&parts.join(";"))
    }
}

// =============================================================================
// param
// =============================================================================

/// Parsed `param` tag of an RPC field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTag {
    pub name: Option<String>,
    pub data_type: Option<String>,
    pub default: Option<String>,
}

impl ParamTag {
    const TAG: &'static str = "param";

    pub fn parse(tag: &str) -> Result<Self, TagError> {
        let mut out = Self::default();
        for (key, value) in directives(tag) {
            match key {
                "name" => out.name = Some(required(Self::TAG, key, value)?.to_string()),
                "type" => out.data_type = Some(required(Self::TAG, key, value)?.to_string()),
                "default" => out.default = Some(required(Self::TAG, key, value)?.to_string()),
                other => {
                    return Err(TagError::UnknownDirective {
                        tag: Self::TAG,
                        key: other.to_string(),
                    });
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for ParamTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(format!("name:{name}"));
        }
        if let Some(ty) = &self.data_type {
            parts.push(format!("type:{ty}"));
        }
        if let Some(default) = &self.default {
            parts.push(format!("default:{default}"));
        }
        f.write_str(&parts.join(";"))
    }
}
