//! Turning pg-meta rows into resources
//!
//! Each `process_*` function takes the rows of one endpoint and returns the
//! resources they describe, without I/O.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use supaform_types::{
    Behavior, Bucket, Column, ColumnRef, Function, PgType, Policy, PolicyAction, PolicyCommand,
    Relation, RelationKind, ReturnType, Role, Security, Table, TypeAttribute,
};
use tracing::warn;

use super::wire::{
    PgMetaBucket, PgMetaColumn, PgMetaFunction, PgMetaMembership, PgMetaPolicy, PgMetaRole,
    PgMetaTable, PgMetaType,
};
use crate::grammar::{
    collapse_whitespace, is_serial_expression, normalize_default, normalize_type,
    parse_function_arguments,
};

static BUCKET_SCOPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?bucket_id"?\s*\)?\s*=\s*\(?\s*'((?:[^']|'')*)'"#)
        .expect("bucket scope pattern is valid")
});

// =============================================================================
// Types
// =============================================================================

pub fn process_types(raw: &[PgMetaType]) -> Vec<PgType> {
    raw.iter()
        .map(|t| PgType {
            schema: t.schema.clone(),
            name: t.name.clone(),
            format: if t.format.is_empty() {
                t.name.clone()
            } else {
                t.format.clone()
            },
            enums: t.enums.clone(),
            attributes: t
                .attributes
                .iter()
                .map(|a| TypeAttribute {
                    name: a.name.clone(),
                    data_type: normalize_type(&a.type_name),
                })
                .collect(),
            comment: t.comment.clone().filter(|c| !c.is_empty()),
        })
        .collect()
}

// =============================================================================
// Tables, Columns and Relations
// =============================================================================

/// Tables with their columns, and the foreign-key edges between them.
///
/// pg-meta lists a relationship on both of its tables; each edge is kept once.
pub fn process_tables(raw: &[PgMetaTable]) -> (Vec<Table>, Vec<Relation>) {
    let mut relations: Vec<Relation> = Vec::new();
    for rel in raw.iter().flat_map(|t| &t.relationships) {
        let relation = Relation {
            source: ColumnRef::new(
                &rel.source_schema,
                &rel.source_table_name,
                &rel.source_column_name,
            ),
            target: ColumnRef::new(
                &rel.target_table_schema,
                &rel.target_table_name,
                &rel.target_column_name,
            ),
            kind: RelationKind::HasOne,
            through: None,
            constraint_name: Some(rel.constraint_name.clone()).filter(|n| !n.is_empty()),
        };
        if !relations.iter().any(|r| r.same_edge(&relation)) {
            relations.push(relation);
        }
    }

    let tables = raw
        .iter()
        .map(|t| {
            let mut columns: Vec<&PgMetaColumn> = t.columns.iter().collect();
            columns.sort_by_key(|c| c.ordinal_position);

            let primary_keys: Vec<String> =
                t.primary_keys.iter().map(|pk| pk.name.clone()).collect();
            let mut table = Table::new(&t.schema, &t.name).rls(t.rls_enabled, t.rls_forced);
            table.comment = t.comment.clone().filter(|c| !c.is_empty());
            table.primary_keys = primary_keys.clone();

            for raw_column in columns {
                let mut column = process_column(raw_column);
                column.primary_key = primary_keys.contains(&column.name);
                column.unique = column.unique && !(column.primary_key && primary_keys.len() == 1);
                column.foreign_key = relations
                    .iter()
                    .find(|r| {
                        r.source.schema == t.schema
                            && r.source.table == t.name
                            && r.source.column == column.name
                    })
                    .map(|r| r.target.clone());
                table.columns.push(column);
            }
            table
        })
        .collect();

    (tables, relations)
}

fn process_column(raw: &PgMetaColumn) -> Column {
    let mut column = Column::new(&raw.name, column_type(raw));
    column.nullable = raw.is_nullable;
    column.unique = raw.is_unique;

    match raw.default_value.as_deref() {
        Some(default) if is_serial_expression(default) => column.auto_increment = true,
        Some(default) => column.default = Some(normalize_default(default)),
        None => {}
    }
    if raw.is_identity {
        column.auto_increment = true;
    }
    column
}

/// Resolve `USER-DEFINED` and `ARRAY` columns from their `format`.
fn column_type(raw: &PgMetaColumn) -> String {
    match raw.data_type.as_str() {
        "USER-DEFINED" => raw.format.clone(),
        "ARRAY" => normalize_type(&raw.format),
        other => normalize_type(other),
    }
}

// =============================================================================
// Policies
// =============================================================================

pub fn process_policies(raw: &[PgMetaPolicy]) -> Vec<Policy> {
    raw.iter()
        .filter_map(|p| {
            let Some(command) = PolicyCommand::parse(&p.command) else {
                warn!(
                    policy = %p.name,
                    command = %p.command,
                    "skipping policy with unknown command"
                );
                return None;
            };
            let mut policy = Policy::new(&p.schema, &p.table, &p.name, command).to(p.roles.clone());
            policy.action = PolicyAction::parse(&p.action).unwrap_or_default();
            policy.using = p.definition.clone();
            policy.check = p.check.clone();
            if policy.is_storage() {
                policy.bucket = [policy.using.as_deref(), policy.check.as_deref()]
                    .into_iter()
                    .flatten()
                    .find_map(bucket_of);
            }
            Some(policy)
        })
        .collect()
}

/// Bucket named by a `bucket_id = '<name>'` comparison in a storage clause.
pub fn bucket_of(clause: &str) -> Option<String> {
    BUCKET_SCOPE
        .captures(clause)
        .map(|caps| caps[1].replace("''", "'"))
}

// =============================================================================
// Roles
// =============================================================================

pub fn process_roles(raw: &[PgMetaRole], memberships: &[PgMetaMembership]) -> Vec<Role> {
    let mut parents: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for m in memberships {
        parents.entry(m.member.as_str()).or_default().push(m.role.clone());
    }

    raw.iter()
        .map(|r| Role {
            name: r.name.clone(),
            connection_limit: r.connection_limit,
            inherit: r.inherit_role,
            inherits: parents.get(r.name.as_str()).cloned().unwrap_or_default(),
            replication: r.is_replication_role,
            superuser: r.is_superuser,
            bypass_rls: r.can_bypass_rls,
            can_create_db: r.can_create_db,
            can_create_role: r.can_create_role,
            can_login: r.can_login,
            valid_until: r.valid_until.clone().filter(|v| !v.is_empty()),
        })
        .collect()
}

// =============================================================================
// Functions
// =============================================================================

pub fn process_functions(raw: &[PgMetaFunction]) -> Vec<Function> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|f| {
            let mut function = Function::new(&f.schema, &f.name);
            function.params = parse_function_arguments(&f.argument_types);
            function.returns = ReturnType::parse(&collapse_whitespace(&f.return_type));
            function.language = f.language.clone();
            function.behavior = Behavior::parse(&f.behavior).unwrap_or_default();
            function.security = if f.security_definer {
                Security::Definer
            } else {
                Security::Invoker
            };
            function.definition = f.definition.trim().to_string();
            seen.insert(function.identity()).then_some(function)
        })
        .collect()
}

// =============================================================================
// Buckets
// =============================================================================

pub fn process_buckets(raw: &[PgMetaBucket]) -> Vec<Bucket> {
    raw.iter()
        .map(|b| Bucket {
            name: if b.name.is_empty() {
                b.id.clone()
            } else {
                b.name.clone()
            },
            public: b.public,
            allowed_mime_types: b.allowed_mime_types.clone().unwrap_or_default(),
            file_size_limit: b.file_size_limit,
            avif_autodetection: b.avif_autodetection,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::wire::{PgMetaPrimaryKey, PgMetaRelationship};

    fn column(name: &str, data_type: &str, format: &str) -> PgMetaColumn {
        PgMetaColumn {
            name: name.into(),
            data_type: data_type.into(),
            format: format.into(),
            is_nullable: true,
            ..Default::default()
        }
    }

    #[test]
    fn columns_and_relations() {
        let relationship = PgMetaRelationship {
            constraint_name: "lessons_course_id_fkey".into(),
            source_schema: "public".into(),
            source_table_name: "lessons".into(),
            source_column_name: "course_id".into(),
            target_table_schema: "public".into(),
            target_table_name: "courses".into(),
            target_column_name: "id".into(),
        };
        let mut id = column("id", "bigint", "int8");
        id.is_identity = true;
        id.is_nullable = false;
        id.is_unique = true;
        id.ordinal_position = 1;
        let mut status = column("status", "USER-DEFINED", "status");
        status.default_value = Some("'draft'::status".into());
        status.ordinal_position = 3;
        let mut tags = column("tags", "ARRAY", "_text");
        tags.ordinal_position = 2;
        let mut course_id = column("course_id", "bigint", "int8");
        course_id.default_value = Some("nextval('lessons_course_id_seq'::regclass)".into());

        let raw = vec![
            PgMetaTable {
                schema: "public".into(),
                name: "courses".into(),
                rls_enabled: true,
                primary_keys: vec![PgMetaPrimaryKey { name: "id".into() }],
                relationships: vec![relationship.clone()],
                columns: vec![status, id, tags],
                ..Default::default()
            },
            PgMetaTable {
                schema: "public".into(),
                name: "lessons".into(),
                relationships: vec![relationship],
                columns: vec![course_id],
                ..Default::default()
            },
        ];

        let (tables, relations) = process_tables(&raw);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].constraint(), "lessons_course_id_fkey");

        let courses = &tables[0];
        let names: Vec<_> = courses.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "tags", "status"]);
        let id = &courses.columns[0];
        assert!(id.primary_key && id.auto_increment && !id.unique && !id.nullable);
        assert_eq!(courses.columns[1].data_type, "text[]");
        assert_eq!(courses.columns[2].data_type, "status");
        assert_eq!(courses.columns[2].default.as_deref(), Some("'draft'"));

        let lesson_course = &tables[1].columns[0];
        assert!(lesson_course.auto_increment && lesson_course.default.is_none());
        assert_eq!(
            lesson_course.foreign_key,
            Some(ColumnRef::new("public", "courses", "id"))
        );
    }

    #[test]
    fn storage_policies_are_bucket_scoped() {
        let raw = vec![
            PgMetaPolicy {
                schema: "storage".into(),
                table: "objects".into(),
                name: "avatars_read".into(),
                action: "PERMISSIVE".into(),
                roles: vec!["authenticated".into()],
                command: "SELECT".into(),
                definition: Some("((bucket_id = 'avatars'::text) AND (owner = auth.uid()))".into()),
                check: None,
            },
            PgMetaPolicy {
                schema: "public".into(),
                table: "courses".into(),
                name: "courses_read".into(),
                action: "RESTRICTIVE".into(),
                roles: vec!["anon".into()],
                command: "SELECT".into(),
                definition: Some("true".into()),
                check: None,
            },
            PgMetaPolicy {
                name: "weird".into(),
                command: "TRUNCATE".into(),
                ..Default::default()
            },
        ];
        let policies = process_policies(&raw);
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0].bucket.as_deref(), Some("avatars"));
        assert_eq!(policies[1].bucket, None);
        assert_eq!(policies[1].action, PolicyAction::Restrictive);
    }

    #[test]
    fn roles_collect_memberships() {
        let raw = vec![PgMetaRole {
            name: "editor".into(),
            inherit_role: true,
            connection_limit: -1,
            valid_until: Some("2030-01-01 00:00:00+00".into()),
            ..Default::default()
        }];
        let memberships = vec![PgMetaMembership {
            role: "reader".into(),
            member: "editor".into(),
        }];
        let roles = process_roles(&raw, &memberships);
        assert_eq!(roles[0].inherits, ["reader"]);
        assert_eq!(roles[0].connection_limit, -1);
        assert!(roles[0].inherit);
    }

    #[test]
    fn functions_parse_signature() {
        let raw = vec![PgMetaFunction {
            schema: "public".into(),
            name: "get_submissions".into(),
            language: "plpgsql".into(),
            definition: "\n  begin return query select * from submissions; end;\n".into(),
            argument_types: "candidate_id uuid DEFAULT NULL::uuid".into(),
            return_type: "SETOF submissions".into(),
            behavior: "STABLE".into(),
            security_definer: true,
        }];
        let functions = process_functions(&raw);
        let f = &functions[0];
        assert_eq!(f.identity(), "public.get_submissions(uuid)");
        assert_eq!(f.returns, ReturnType::SetOf("submissions".into()));
        assert_eq!(f.behavior, Behavior::Stable);
        assert_eq!(f.security, Security::Definer);
        assert!(f.definition.starts_with("begin"));
    }

    #[test]
    fn bucket_rows() {
        let raw = vec![PgMetaBucket {
            id: "avatars".into(),
            name: "avatars".into(),
            allowed_mime_types: Some(vec!["image/png".into()]),
            file_size_limit: Some(1_048_576),
            ..Default::default()
        }];
        let buckets = process_buckets(&raw);
        assert_eq!(buckets[0].allowed_mime_types, ["image/png"]);
        assert_eq!(buckets[0].file_size_limit, Some(1_048_576));
        assert_eq!(bucket_of(r#""bucket_id" = 'it''s'"#).as_deref(), Some("it's"));
    }
}
