//! pg-meta response rows
//!
//! Field names follow pg-meta's JSON. Everything that pg-meta may omit or
//! send as `null` defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaTable {
    pub schema: String,
    pub name: String,
    pub rls_enabled: bool,
    pub rls_forced: bool,
    pub comment: Option<String>,
    pub primary_keys: Vec<PgMetaPrimaryKey>,
    pub relationships: Vec<PgMetaRelationship>,
    pub columns: Vec<PgMetaColumn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaPrimaryKey {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaRelationship {
    pub constraint_name: String,
    pub source_schema: String,
    pub source_table_name: String,
    pub source_column_name: String,
    pub target_table_schema: String,
    pub target_table_name: String,
    pub target_column_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaColumn {
    pub name: String,
    pub ordinal_position: i32,
    pub default_value: Option<String>,
    /// `USER-DEFINED` and `ARRAY` are resolved through `format`
    pub data_type: String,
    pub format: String,
    pub is_identity: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    pub enums: Vec<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaPolicy {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub action: String,
    pub roles: Vec<String>,
    pub command: String,
    pub definition: Option<String>,
    pub check: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaRole {
    pub name: String,
    pub is_superuser: bool,
    pub can_create_db: bool,
    pub can_create_role: bool,
    pub inherit_role: bool,
    pub can_login: bool,
    pub is_replication_role: bool,
    pub can_bypass_rls: bool,
    pub connection_limit: i32,
    pub valid_until: Option<String>,
}

/// Row of [`queries::ROLE_MEMBERSHIPS`](super::queries::ROLE_MEMBERSHIPS)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaMembership {
    /// The granted (parent) role
    pub role: String,
    /// The role holding the membership
    pub member: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaFunction {
    pub schema: String,
    pub name: String,
    pub language: String,
    pub definition: String,
    pub argument_types: String,
    pub return_type: String,
    pub behavior: String,
    pub security_definer: bool,
}

/// Row of [`queries::TYPES`](super::queries::TYPES)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaType {
    pub schema: String,
    pub name: String,
    pub format: String,
    pub enums: Vec<String>,
    pub attributes: Vec<PgMetaTypeAttribute>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaTypeAttribute {
    pub name: String,
    pub type_name: String,
}

/// Row of [`queries::BUCKETS`](super::queries::BUCKETS)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PgMetaBucket {
    pub id: String,
    pub name: String,
    pub public: bool,
    pub allowed_mime_types: Option<Vec<String>>,
    pub file_size_limit: Option<i64>,
    pub avif_autodetection: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_nulls_and_missing_fields() {
        let table: PgMetaTable = serde_json::from_value(serde_json::json!({
            "id": 17,
            "schema": "public",
            "name": "courses",
            "rls_enabled": true,
            "comment": null,
            "primary_keys": [{ "schema": "public", "table_name": "courses", "name": "id" }],
            "columns": [{
                "name": "id",
                "data_type": "bigint",
                "format": "int8",
                "is_identity": true,
                "default_value": null,
                "enums": []
            }]
        }))
        .unwrap();
        assert!(table.rls_enabled && !table.rls_forced);
        assert_eq!(table.primary_keys[0].name, "id");
        assert!(table.columns[0].is_identity);
        assert!(table.relationships.is_empty());

        let bucket: PgMetaBucket = serde_json::from_value(serde_json::json!({
            "id": "avatars", "name": "avatars", "public": false,
            "allowed_mime_types": null, "file_size_limit": null
        }))
        .unwrap();
        assert!(bucket.allowed_mime_types.is_none());
    }
}
