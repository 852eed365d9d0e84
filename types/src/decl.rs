//! Declaration records
//!
//! A declaration is the raw, unvalidated content of an annotated struct: the
//! attribute values exactly as written. The derive macros build them at
//! compile time and the source extractor builds them by parsing files, both
//! through the `set` methods below so that the two paths accept the same
//! attribute vocabulary.

use serde::{Deserialize, Serialize};

/// A literal attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl AttrValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "a string",
            Self::Bool(_) => "a boolean",
            Self::Int(_) => "an integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclError {
    #[error("unknown {item} attribute '{key}'")]
    UnknownKey { item: &'static str, key: String },

    #[error("{item} attribute '{key}' expects {expected}, found {found}")]
    WrongType {
        item: &'static str,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

fn string(item: &'static str, key: &str, value: AttrValue) -> Result<String, DeclError> {
    match value {
        AttrValue::Str(s) => Ok(s),
        other => Err(DeclError::WrongType {
            item,
            key: key.to_string(),
            expected: "a string",
            found: other.type_name(),
        }),
    }
}

fn boolean(item: &'static str, key: &str, value: AttrValue) -> Result<bool, DeclError> {
    match value {
        AttrValue::Bool(b) => Ok(b),
        other => Err(DeclError::WrongType {
            item,
            key: key.to_string(),
            expected: "a boolean",
            found: other.type_name(),
        }),
    }
}

fn integer(item: &'static str, key: &str, value: AttrValue) -> Result<i64, DeclError> {
    match value {
        AttrValue::Int(i) => Ok(i),
        other => Err(DeclError::WrongType {
            item,
            key: key.to_string(),
            expected: "an integer",
            found: other.type_name(),
        }),
    }
}

fn unknown(item: &'static str, key: &str) -> DeclError {
    DeclError::UnknownKey {
        item,
        key: key.to_string(),
    }
}

// =============================================================================
// Models
// =============================================================================

/// A model struct field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    pub ident: String,
    pub rust_type: String,
    /// `#[serde(rename = "...")]`, the column name fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serde_rename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
}

/// `#[derive(Model)]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDecl {
    pub struct_name: String,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub read: Option<String>,
    pub write: Option<String>,
    pub read_using: Option<String>,
    pub write_check: Option<String>,
    pub write_using: Option<String>,
    pub rls_enabled: Option<bool>,
    pub rls_forced: Option<bool>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl ModelDecl {
    const ITEM: &'static str = "model";

    pub fn new(struct_name: impl Into<String>) -> Self {
        Self {
            struct_name: struct_name.into(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: AttrValue) -> Result<(), DeclError> {
        let item = Self::ITEM;
        match key {
            "schema" => self.schema = Some(string(item, key, value)?),
            "table" => self.table = Some(string(item, key, value)?),
            "read" => self.read = Some(string(item, key, value)?),
            "write" => self.write = Some(string(item, key, value)?),
            "readUsing" => self.read_using = Some(string(item, key, value)?),
            "writeCheck" => self.write_check = Some(string(item, key, value)?),
            "writeUsing" => self.write_using = Some(string(item, key, value)?),
            "rlsEnabled" => self.rls_enabled = Some(boolean(item, key, value)?),
            "rlsForced" => self.rls_forced = Some(boolean(item, key, value)?),
            _ => return Err(unknown(item, key)),
        }
        Ok(())
    }
}

// =============================================================================
// RPCs
// =============================================================================

/// An RPC struct field, one function parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDecl {
    pub ident: String,
    pub rust_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// `#[derive(Rpc)]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcDecl {
    pub struct_name: String,
    pub name: Option<String>,
    pub schema: Option<String>,
    pub security: Option<String>,
    pub behavior: Option<String>,
    pub language: Option<String>,
    pub returns: Option<String>,
    /// `alias:Model` pairs, comma separated
    pub models: Option<String>,
    pub definition: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

impl RpcDecl {
    const ITEM: &'static str = "rpc";

    pub fn new(struct_name: impl Into<String>) -> Self {
        Self {
            struct_name: struct_name.into(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: AttrValue) -> Result<(), DeclError> {
        let item = Self::ITEM;
        let slot = match key {
            "name" => &mut self.name,
            "schema" => &mut self.schema,
            "security" => &mut self.security,
            "behavior" => &mut self.behavior,
            "language" => &mut self.language,
            "returns" => &mut self.returns,
            "models" => &mut self.models,
            "definition" => &mut self.definition,
            _ => return Err(unknown(item, key)),
        };
        *slot = Some(string(item, key, value)?);
        Ok(())
    }
}

// =============================================================================
// Roles
// =============================================================================

/// `#[derive(Role)]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDecl {
    pub struct_name: String,
    pub name: Option<String>,
    pub connection_limit: Option<i64>,
    pub inherit: Option<bool>,
    /// Parent roles, comma separated
    pub inherits: Option<String>,
    pub can_login: Option<bool>,
    pub can_create_db: Option<bool>,
    pub can_create_role: Option<bool>,
    pub replication: Option<bool>,
    pub superuser: Option<bool>,
    pub bypass_rls: Option<bool>,
    pub valid_until: Option<String>,
}

impl RoleDecl {
    const ITEM: &'static str = "role";

    pub fn new(struct_name: impl Into<String>) -> Self {
        Self {
            struct_name: struct_name.into(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: AttrValue) -> Result<(), DeclError> {
        let item = Self::ITEM;
        let flag = match key {
            "name" => {
                self.name = Some(string(item, key, value)?);
                return Ok(());
            }
            "inherits" => {
                self.inherits = Some(string(item, key, value)?);
                return Ok(());
            }
            "validUntil" => {
                self.valid_until = Some(string(item, key, value)?);
                return Ok(());
            }
            "connectionLimit" => {
                self.connection_limit = Some(integer(item, key, value)?);
                return Ok(());
            }
            "inherit" => &mut self.inherit,
            "canLogin" => &mut self.can_login,
            "canCreateDb" => &mut self.can_create_db,
            "canCreateRole" => &mut self.can_create_role,
            "replication" => &mut self.replication,
            "superuser" => &mut self.superuser,
            "bypassRls" => &mut self.bypass_rls,
            _ => return Err(unknown(item, key)),
        };
        *flag = Some(boolean(item, key, value)?);
        Ok(())
    }
}

// =============================================================================
// Buckets
// =============================================================================

/// `#[derive(Bucket)]`, a bucket plus its object access rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketDecl {
    pub struct_name: String,
    pub name: Option<String>,
    pub public: Option<bool>,
    pub allowed_mime_types: Option<String>,
    pub file_size_limit: Option<i64>,
    pub avif_autodetection: Option<bool>,
    pub read: Option<String>,
    pub write: Option<String>,
    pub read_using: Option<String>,
    pub write_check: Option<String>,
    pub write_using: Option<String>,
}

impl BucketDecl {
    const ITEM: &'static str = "bucket";

    pub fn new(struct_name: impl Into<String>) -> Self {
        Self {
            struct_name: struct_name.into(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: AttrValue) -> Result<(), DeclError> {
        let item = Self::ITEM;
        match key {
            "public" => self.public = Some(boolean(item, key, value)?),
            "avifAutodetection" => self.avif_autodetection = Some(boolean(item, key, value)?),
            "fileSizeLimit" => self.file_size_limit = Some(integer(item, key, value)?),
            _ => {
                let slot = match key {
                    "name" => &mut self.name,
                    "allowedMimeTypes" => &mut self.allowed_mime_types,
                    "read" => &mut self.read,
                    "write" => &mut self.write,
                    "readUsing" => &mut self.read_using,
                    "writeCheck" => &mut self.write_check,
                    "writeUsing" => &mut self.write_using,
                    _ => return Err(unknown(item, key)),
                };
                *slot = Some(string(item, key, value)?);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Types
// =============================================================================

/// `#[derive(PgType)]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    pub struct_name: String,
    pub schema: Option<String>,
    pub name: Option<String>,
    pub format: Option<String>,
    /// Enum labels, comma separated
    pub enums: Option<String>,
    /// `name:type` pairs, comma separated
    pub attributes: Option<String>,
    pub comment: Option<String>,
}

impl TypeDecl {
    const ITEM: &'static str = "pg_type";

    pub fn new(struct_name: impl Into<String>) -> Self {
        Self {
            struct_name: struct_name.into(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, key: &str, value: AttrValue) -> Result<(), DeclError> {
        let item = Self::ITEM;
        let slot = match key {
            "schema" => &mut self.schema,
            "name" => &mut self.name,
            "format" => &mut self.format,
            "enums" => &mut self.enums,
            "attributes" => &mut self.attributes,
            "comment" => &mut self.comment,
            _ => return Err(unknown(item, key)),
        };
        *slot = Some(string(item, key, value)?);
        Ok(())
    }
}

// =============================================================================
// Declaration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Model(ModelDecl),
    Rpc(RpcDecl),
    Role(RoleDecl),
    Bucket(BucketDecl),
    Type(TypeDecl),
}

impl Declaration {
    pub fn struct_name(&self) -> &str {
        match self {
            Self::Model(d) => &d.struct_name,
            Self::Rpc(d) => &d.struct_name,
            Self::Role(d) => &d.struct_name,
            Self::Bucket(d) => &d.struct_name,
            Self::Type(d) => &d.struct_name,
        }
    }

    /// Attribute name carrying the item-level settings (`#[model(...)]`, ...).
    pub const fn attribute(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::Rpc(_) => "rpc",
            Self::Role(_) => "role",
            Self::Bucket(_) => "bucket",
            Self::Type(_) => "pg_type",
        }
    }

    /// Apply an item-level attribute value.
    pub fn set(&mut self, key: &str, value: AttrValue) -> Result<(), DeclError> {
        match self {
            Self::Model(d) => d.set(key, value),
            Self::Rpc(d) => d.set(key, value),
            Self::Role(d) => d.set(key, value),
            Self::Bucket(d) => d.set(key, value),
            Self::Type(d) => d.set(key, value),
        }
    }

    /// Empty declaration for a derive name (`Model`, `Rpc`, `Role`, `Bucket`, `PgType`).
    pub fn for_derive(derive: &str, struct_name: &str) -> Option<Self> {
        Some(match derive {
            "Model" => Self::Model(ModelDecl::new(struct_name)),
            "Rpc" => Self::Rpc(RpcDecl::new(struct_name)),
            "Role" => Self::Role(RoleDecl::new(struct_name)),
            "Bucket" => Self::Bucket(BucketDecl::new(struct_name)),
            "PgType" => Self::Type(TypeDecl::new(struct_name)),
            _ => return None,
        })
    }
}

/// Implemented by `#[derive(Model | Rpc | Role | Bucket | PgType)]`.
pub trait Declared {
    fn declaration() -> Declaration;
}
