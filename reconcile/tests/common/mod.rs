//! In-memory pg-meta for pipeline tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use serde_json::{Value, json};
use supaform_reconcile::introspect::{
    PgMetaApi, PgMetaBucket, PgMetaFunction, PgMetaMembership, PgMetaPolicy, PgMetaRole,
    PgMetaTable, PgMetaType,
};
use supaform_reconcile::{Error, Result};

/// Serves fixed pg-meta rows and records every query.
#[derive(Default)]
pub struct FakePgMeta {
    pub tables: Vec<PgMetaTable>,
    pub policies: Vec<PgMetaPolicy>,
    pub roles: Vec<PgMetaRole>,
    pub memberships: Vec<PgMetaMembership>,
    pub functions: Vec<PgMetaFunction>,
    pub types: Vec<PgMetaType>,
    pub buckets: Vec<PgMetaBucket>,
    /// Endpoint answering with a 500
    pub failing: Option<&'static str>,
    /// Query text that fails
    pub failing_query: Option<&'static str>,
    pub queries: Mutex<Vec<String>>,
}

fn rows<T: serde::de::DeserializeOwned>(fixture: &Value, key: &str) -> Vec<T> {
    fixture
        .get(key)
        .cloned()
        .map(|v| serde_json::from_value(v).expect("fixture rows"))
        .unwrap_or_default()
}

impl FakePgMeta {
    pub fn from_json(fixture: Value) -> Self {
        Self {
            tables: rows(&fixture, "tables"),
            policies: rows(&fixture, "policies"),
            roles: rows(&fixture, "roles"),
            memberships: rows(&fixture, "memberships"),
            functions: rows(&fixture, "functions"),
            types: rows(&fixture, "types"),
            buckets: rows(&fixture, "buckets"),
            ..Self::default()
        }
    }

    pub fn failing(mut self, endpoint: &'static str) -> Self {
        self.failing = Some(endpoint);
        self
    }

    pub fn failing_query(mut self, fragment: &'static str) -> Self {
        self.failing_query = Some(fragment);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn check(&self, endpoint: &str) -> Result<()> {
        if self.failing == Some(endpoint) {
            return Err(Error::Protocol {
                status: 500,
                endpoint: endpoint.to_string(),
                body: "internal error".into(),
            });
        }
        Ok(())
    }
}

fn in_schemas(schemas: &[String], schema: &str) -> bool {
    schemas.iter().any(|s| s == schema)
}

impl PgMetaApi for FakePgMeta {
    async fn tables(&self, schemas: &[String]) -> Result<Vec<PgMetaTable>> {
        self.check("/tables")?;
        Ok(self.tables.iter().filter(|t| in_schemas(schemas, &t.schema)).cloned().collect())
    }

    async fn policies(&self, schemas: &[String]) -> Result<Vec<PgMetaPolicy>> {
        self.check("/policies")?;
        Ok(self.policies.iter().filter(|p| in_schemas(schemas, &p.schema)).cloned().collect())
    }

    async fn roles(&self) -> Result<Vec<PgMetaRole>> {
        self.check("/roles")?;
        Ok(self.roles.clone())
    }

    async fn role_memberships(&self) -> Result<Vec<PgMetaMembership>> {
        self.check("/query")?;
        Ok(self.memberships.clone())
    }

    async fn functions(&self, schemas: &[String]) -> Result<Vec<PgMetaFunction>> {
        self.check("/functions")?;
        Ok(self.functions.iter().filter(|f| in_schemas(schemas, &f.schema)).cloned().collect())
    }

    async fn types(&self, schemas: &[String]) -> Result<Vec<PgMetaType>> {
        self.check("/types")?;
        Ok(self.types.iter().filter(|t| in_schemas(schemas, &t.schema)).cloned().collect())
    }

    async fn buckets(&self) -> Result<Vec<PgMetaBucket>> {
        self.check("/buckets")?;
        Ok(self.buckets.clone())
    }

    async fn query(&self, sql: &str) -> Result<Value> {
        if self.failing_query.is_some_and(|fragment| sql.contains(fragment)) {
            return Err(Error::Protocol {
                status: 400,
                endpoint: "/query".into(),
                body: format!("syntax error at or near \"{sql}\""),
            });
        }
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(json!([]))
    }
}

fn column(name: &str, position: i32, data_type: &str, nullable: bool) -> Value {
    json!({
        "name": name,
        "ordinal_position": position,
        "data_type": data_type,
        "format": data_type,
        "is_nullable": nullable,
    })
}

/// A course platform: two public tables, an enum, roles with a membership,
/// table and storage policies, a bucket and an SQL function.
pub fn course_platform() -> Value {
    let lessons_course = json!({
        "constraint_name": "lessons_course_id_fkey",
        "source_schema": "public",
        "source_table_name": "lessons",
        "source_column_name": "course_id",
        "target_table_schema": "public",
        "target_table_name": "courses",
        "target_column_name": "id",
    });
    let courses_owner = json!({
        "constraint_name": "courses_owner_id_fkey",
        "source_schema": "public",
        "source_table_name": "courses",
        "source_column_name": "owner_id",
        "target_table_schema": "auth",
        "target_table_name": "users",
        "target_column_name": "id",
    });
    let owner_only = r#"(("public"."courses"."owner_id")::text = (auth.uid())::text)"#;

    json!({
        "tables": [
            {
                "schema": "public",
                "name": "courses",
                "rls_enabled": true,
                "rls_forced": false,
                "comment": "Published and draft courses",
                "primary_keys": [{ "name": "id" }],
                "relationships": [lessons_course, courses_owner],
                "columns": [
                    {
                        "name": "id",
                        "ordinal_position": 1,
                        "data_type": "bigint",
                        "format": "int8",
                        "default_value": "nextval('courses_id_seq'::regclass)",
                        "is_nullable": false,
                        "is_unique": true,
                    },
                    column("title", 2, "text", false),
                    column("owner_id", 3, "uuid", true),
                    {
                        "name": "status",
                        "ordinal_position": 4,
                        "data_type": "USER-DEFINED",
                        "format": "status",
                        "default_value": "'draft'::status",
                        "is_nullable": false,
                        "enums": ["draft", "published"],
                    },
                ],
            },
            {
                "schema": "public",
                "name": "lessons",
                "rls_enabled": false,
                "rls_forced": false,
                "primary_keys": [{ "name": "id" }],
                "relationships": [lessons_course],
                "columns": [
                    {
                        "name": "id",
                        "ordinal_position": 1,
                        "data_type": "bigint",
                        "format": "int8",
                        "is_identity": true,
                        "is_nullable": false,
                    },
                    column("course_id", 2, "bigint", false),
                ],
            },
            {
                "schema": "auth",
                "name": "users",
                "rls_enabled": true,
                "primary_keys": [{ "name": "id" }],
                "relationships": [courses_owner],
                "columns": [column("id", 1, "uuid", false)],
            },
        ],
        "policies": [
            {
                "schema": "public", "table": "courses", "name": "courses_read",
                "action": "PERMISSIVE", "roles": ["anon", "authenticated"], "command": "SELECT",
                "definition": "true",
            },
            {
                "schema": "public", "table": "courses", "name": "courses_insert",
                "action": "PERMISSIVE", "roles": ["owner"], "command": "INSERT",
                "check": "true",
            },
            {
                "schema": "public", "table": "courses", "name": "courses_update",
                "action": "PERMISSIVE", "roles": ["owner"], "command": "UPDATE",
                "definition": owner_only, "check": "true",
            },
            {
                "schema": "public", "table": "courses", "name": "courses_delete",
                "action": "PERMISSIVE", "roles": ["owner"], "command": "DELETE",
                "definition": owner_only,
            },
            {
                "schema": "storage", "table": "objects", "name": "avatars_read",
                "action": "PERMISSIVE", "roles": ["authenticated"], "command": "SELECT",
                "definition": "((bucket_id = 'avatars'::text) AND (owner = auth.uid()))",
            },
        ],
        "roles": [
            { "name": "postgres", "is_superuser": true, "can_login": true, "connection_limit": -1, "inherit_role": true },
            { "name": "anon", "connection_limit": -1, "inherit_role": true },
            { "name": "authenticated", "connection_limit": -1, "inherit_role": true },
            { "name": "service_role", "connection_limit": -1, "inherit_role": true, "can_bypass_rls": true },
            { "name": "owner", "connection_limit": 60, "inherit_role": true },
            { "name": "reader", "connection_limit": 60, "inherit_role": true },
            { "name": "editor", "connection_limit": 60, "inherit_role": true },
        ],
        "memberships": [{ "role": "reader", "member": "editor" }],
        "functions": [
            {
                "schema": "public",
                "name": "course_titles",
                "language": "sql",
                "definition": "select c.title from courses c where c.owner_id = auth.uid()",
                "argument_types": "",
                "return_type": "SETOF text",
                "behavior": "STABLE",
                "security_definer": false,
            },
        ],
        "types": [
            { "schema": "public", "name": "status", "format": "", "enums": ["draft", "published"] },
        ],
        "buckets": [
            {
                "id": "avatars",
                "name": "avatars",
                "public": false,
                "allowed_mime_types": ["image/png"],
                "file_size_limit": 1048576,
                "avif_autodetection": false,
            },
        ],
    })
}

/// Write `content` to `root/rel`, creating directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
}
