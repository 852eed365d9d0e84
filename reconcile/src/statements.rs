//! DDL rendering for planned changes
//!
//! Every function returns the statements for one change, in execution order.
//! Identifiers are always quoted and schema-qualified; clause text goes
//! through the clause algebra so that empty sides become `TRUE`.

use supaform_core::{Clause, quote_ident, quote_literal, strip_outer_parens};
use supaform_types::{Bucket, Function, PgType, Policy, Relation, Role, Table, TableColumn};

use crate::diff::FieldDelta;
use crate::grammar::{default_name_for_pk, default_name_for_unique, is_integer_type};

// =============================================================================
// Helpers
// =============================================================================

/// `"schema"."name"`
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

fn ident_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn changed(deltas: &[FieldDelta], field: &str) -> bool {
    deltas.iter().any(|d| d.field == field)
}

fn yes_no(value: bool, yes: &'static str, no: &'static str) -> &'static str {
    if value { yes } else { no }
}

/// Clause text for a `USING (...)` or `WITH CHECK (...)` slot.
fn clause_body(clause: Option<&str>) -> String {
    let clause = Clause::raw(clause.unwrap_or_default()).or_true();
    strip_outer_parens(clause.sql()).to_string()
}

// =============================================================================
// Roles
// =============================================================================

fn role_options(role: &Role, clear_expiry: bool) -> String {
    let mut options = vec![
        yes_no(role.superuser, "SUPERUSER", "NOSUPERUSER").to_string(),
        yes_no(role.can_create_db, "CREATEDB", "NOCREATEDB").to_string(),
        yes_no(role.can_create_role, "CREATEROLE", "NOCREATEROLE").to_string(),
        yes_no(role.inherit, "INHERIT", "NOINHERIT").to_string(),
        yes_no(role.can_login, "LOGIN", "NOLOGIN").to_string(),
        yes_no(role.replication, "REPLICATION", "NOREPLICATION").to_string(),
        yes_no(role.bypass_rls, "BYPASSRLS", "NOBYPASSRLS").to_string(),
        format!("CONNECTION LIMIT {}", role.connection_limit),
    ];
    match &role.valid_until {
        Some(until) => options.push(format!("VALID UNTIL {}", quote_literal(until))),
        None if clear_expiry => options.push("VALID UNTIL 'infinity'".to_string()),
        None => {}
    }
    options.join(" ")
}

fn grant(parent: &str, role: &str) -> String {
    format!("GRANT {} TO {};", quote_ident(parent), quote_ident(role))
}

fn revoke(parent: &str, role: &str) -> String {
    format!("REVOKE {} FROM {};", quote_ident(parent), quote_ident(role))
}

pub fn create_role(role: &Role) -> Vec<String> {
    let mut sqls = vec![format!(
        "CREATE ROLE {} WITH {};",
        quote_ident(&role.name),
        role_options(role, false)
    )];
    sqls.extend(role.inherits.iter().map(|parent| grant(parent, &role.name)));
    sqls
}

/// Options are re-stated as a whole when any of them changed; memberships
/// are granted and revoked one by one.
pub fn alter_role(app: &Role, remote: &Role, deltas: &[FieldDelta]) -> Vec<String> {
    let mut sqls = Vec::new();
    if deltas.iter().any(|d| d.field != "inherits") {
        sqls.push(format!(
            "ALTER ROLE {} WITH {};",
            quote_ident(&app.name),
            role_options(app, remote.valid_until.is_some())
        ));
    }
    for parent in app.inherits.iter().filter(|p| !remote.inherits.contains(p)) {
        sqls.push(grant(parent, &app.name));
    }
    for parent in remote.inherits.iter().filter(|p| !app.inherits.contains(p)) {
        sqls.push(revoke(parent, &app.name));
    }
    sqls
}

pub fn drop_role(role: &Role) -> Vec<String> {
    vec![format!("DROP ROLE IF EXISTS {};", quote_ident(&role.name))]
}

// =============================================================================
// Types
// =============================================================================

fn type_comment(ty: &PgType) -> String {
    let comment = ty
        .comment
        .as_deref()
        .map_or_else(|| "NULL".to_string(), quote_literal);
    format!(
        "COMMENT ON TYPE {} IS {};",
        qualified(&ty.schema, &ty.name),
        comment
    )
}

pub fn create_type(ty: &PgType) -> Vec<String> {
    let name = qualified(&ty.schema, &ty.name);
    let body = if ty.is_enum() {
        let values = ty
            .enums
            .iter()
            .map(|v| quote_literal(v))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TYPE {name} AS ENUM ({values});")
    } else {
        let attributes = ty
            .attributes
            .iter()
            .map(|a| format!("{} {}", quote_ident(&a.name), a.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TYPE {name} AS ({attributes});")
    };

    let mut sqls = vec![body];
    if ty.comment.is_some() {
        sqls.push(type_comment(ty));
    }
    sqls
}

/// Enum values can be added but not removed; switching between enum and
/// composite recreates the type.
pub fn alter_type(app: &PgType, remote: &PgType, deltas: &[FieldDelta]) -> Vec<String> {
    if app.is_enum() != remote.is_enum() {
        let mut sqls = drop_type(remote);
        sqls.extend(create_type(app));
        return sqls;
    }

    let name = qualified(&app.schema, &app.name);
    let mut sqls = Vec::new();
    if changed(deltas, "enums") {
        for value in app.enums.iter().filter(|v| !remote.enums.contains(v)) {
            sqls.push(format!(
                "ALTER TYPE {name} ADD VALUE IF NOT EXISTS {};",
                quote_literal(value)
            ));
        }
    }
    if changed(deltas, "attributes") {
        for attr in &app.attributes {
            match remote.attributes.iter().find(|a| a.name == attr.name) {
                None => sqls.push(format!(
                    "ALTER TYPE {name} ADD ATTRIBUTE {} {};",
                    quote_ident(&attr.name),
                    attr.data_type
                )),
                Some(theirs) if theirs.data_type != attr.data_type => sqls.push(format!(
                    "ALTER TYPE {name} ALTER ATTRIBUTE {} SET DATA TYPE {};",
                    quote_ident(&attr.name),
                    attr.data_type
                )),
                Some(_) => {}
            }
        }
        for attr in remote
            .attributes
            .iter()
            .filter(|r| !app.attributes.iter().any(|a| a.name == r.name))
        {
            sqls.push(format!(
                "ALTER TYPE {name} DROP ATTRIBUTE IF EXISTS {};",
                quote_ident(&attr.name)
            ));
        }
    }
    if changed(deltas, "comment") {
        sqls.push(type_comment(app));
    }
    sqls
}

pub fn drop_type(ty: &PgType) -> Vec<String> {
    vec![format!(
        "DROP TYPE IF EXISTS {};",
        qualified(&ty.schema, &ty.name)
    )]
}

// =============================================================================
// Tables
// =============================================================================

fn column_def(column: &supaform_types::Column) -> String {
    let mut def = format!("{} {}", quote_ident(&column.name), column.data_type);
    if column.auto_increment && is_integer_type(&column.data_type) {
        def.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        def.push_str(&format!(" DEFAULT {default}"));
    }
    if column.unique && !column.primary_key {
        def.push_str(" UNIQUE");
    }
    def
}

fn primary_key_constraint(table: &Table) -> String {
    format!(
        "CONSTRAINT {} PRIMARY KEY({})",
        quote_ident(&default_name_for_pk(&table.name)),
        ident_list(&table.primary_keys)
    )
}

pub fn create_table(table: &Table) -> Vec<String> {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\t{}", column_def(c)))
        .collect();
    if !table.primary_keys.is_empty() {
        lines.push(format!("\t{}", primary_key_constraint(table)));
    }
    vec![format!(
        "CREATE TABLE {} (\n{}\n);",
        qualified(&table.schema, &table.name),
        lines.join(",\n")
    )]
}

/// Primary key changes; the constraint is dropped and added again.
pub fn alter_table(app: &Table, deltas: &[FieldDelta]) -> Vec<String> {
    if !changed(deltas, "primary_key") {
        return Vec::new();
    }
    let name = qualified(&app.schema, &app.name);
    let mut sqls = vec![format!(
        "ALTER TABLE {name} DROP CONSTRAINT IF EXISTS {};",
        quote_ident(&default_name_for_pk(&app.name))
    )];
    if !app.primary_keys.is_empty() {
        sqls.push(format!(
            "ALTER TABLE {name} ADD {};",
            primary_key_constraint(app)
        ));
    }
    sqls
}

/// Row level security switches. A new table has nothing to switch off.
pub fn row_level_security(app: &Table, remote: Option<&Table>) -> Vec<String> {
    let name = qualified(&app.schema, &app.name);
    let (enabled, forced) = remote.map_or((false, false), |r| (r.rls_enabled, r.rls_forced));
    let mut sqls = Vec::new();
    if app.rls_enabled != enabled {
        sqls.push(format!(
            "ALTER TABLE {name} {} ROW LEVEL SECURITY;",
            yes_no(app.rls_enabled, "ENABLE", "DISABLE")
        ));
    }
    if app.rls_forced != forced {
        sqls.push(format!(
            "ALTER TABLE {name} {} ROW LEVEL SECURITY;",
            yes_no(app.rls_forced, "FORCE", "NO FORCE")
        ));
    }
    sqls
}

pub fn drop_table(table: &Table) -> Vec<String> {
    vec![format!(
        "DROP TABLE IF EXISTS {};",
        qualified(&table.schema, &table.name)
    )]
}

// =============================================================================
// Columns
// =============================================================================

pub fn add_column(column: &TableColumn) -> Vec<String> {
    vec![format!(
        "ALTER TABLE {} ADD COLUMN {};",
        qualified(&column.schema, &column.table),
        column_def(&column.column)
    )]
}

/// Foreign key deltas are left to the relation changes.
pub fn alter_column(app: &TableColumn, remote: &TableColumn, deltas: &[FieldDelta]) -> Vec<String> {
    let table = qualified(&app.schema, &app.table);
    let (column, name) = (&app.column, quote_ident(&app.column.name));
    let mut sqls = Vec::new();

    if changed(deltas, "type") {
        sqls.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {name} SET DATA TYPE {ty} USING {name}::{ty};",
            ty = column.data_type
        ));
    }
    if changed(deltas, "nullable") {
        sqls.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {name} {} NOT NULL;",
            yes_no(column.nullable, "DROP", "SET")
        ));
    }
    if changed(deltas, "default") {
        sqls.push(match &column.default {
            Some(default) => {
                format!("ALTER TABLE {table} ALTER COLUMN {name} SET DEFAULT {default};")
            }
            None => format!("ALTER TABLE {table} ALTER COLUMN {name} DROP DEFAULT;"),
        });
    }
    if changed(deltas, "unique") {
        let constraint = quote_ident(&default_name_for_unique(&app.table, &column.name));
        sqls.push(if column.unique && !remote.column.unique {
            format!("ALTER TABLE {table} ADD CONSTRAINT {constraint} UNIQUE ({name});")
        } else {
            format!("ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {constraint};")
        });
    }
    sqls
}

pub fn drop_column(column: &TableColumn) -> Vec<String> {
    vec![format!(
        "ALTER TABLE {} DROP COLUMN IF EXISTS {};",
        qualified(&column.schema, &column.table),
        quote_ident(&column.column.name)
    )]
}

// =============================================================================
// Relations
// =============================================================================

pub fn add_foreign_key(relation: &Relation) -> Vec<String> {
    let (source, target) = (&relation.source, &relation.target);
    vec![format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({});",
        qualified(&source.schema, &source.table),
        quote_ident(&relation.constraint()),
        quote_ident(&source.column),
        qualified(&target.schema, &target.table),
        quote_ident(&target.column)
    )]
}

pub fn drop_foreign_key(relation: &Relation) -> Vec<String> {
    vec![format!(
        "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};",
        qualified(&relation.source.schema, &relation.source.table),
        quote_ident(&relation.constraint())
    )]
}

// =============================================================================
// Functions
// =============================================================================

/// A dollar-quote tag that does not occur in the body.
fn dollar_tag(body: &str) -> String {
    let mut tag = "$function$".to_string();
    let mut n = 0;
    while body.contains(&tag) {
        n += 1;
        tag = format!("$function_{n}$");
    }
    tag
}

fn function_arguments(function: &Function) -> String {
    function
        .params
        .iter()
        .map(|p| {
            let mut arg = format!("{} {}", quote_ident(&p.name), p.data_type);
            if let Some(default) = &p.default {
                arg.push_str(&format!(" DEFAULT {default}"));
            }
            arg
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_function(function: &Function) -> Vec<String> {
    let tag = dollar_tag(&function.definition);
    vec![format!(
        "CREATE OR REPLACE FUNCTION {}({})\nRETURNS {}\nLANGUAGE {}\nSECURITY {}\n{}\nAS {tag}\n{}\n{tag};",
        qualified(&function.schema, &function.name),
        function_arguments(function),
        function.returns,
        function.language,
        function.security.as_str(),
        function.behavior.as_str(),
        function.definition.trim(),
    )]
}

/// `CREATE OR REPLACE` cannot change the return type or the parameter list,
/// so such updates drop the remote function first.
pub fn replace_function(app: &Function, remote: &Function, deltas: &[FieldDelta]) -> Vec<String> {
    let mut sqls = Vec::new();
    if changed(deltas, "returns") || changed(deltas, "params") {
        sqls.extend(drop_function(remote));
    }
    sqls.extend(create_function(app));
    sqls
}

pub fn drop_function(function: &Function) -> Vec<String> {
    vec![format!(
        "DROP FUNCTION IF EXISTS {}({});",
        qualified(&function.schema, &function.name),
        function.signature()
    )]
}

// =============================================================================
// Buckets
// =============================================================================

fn mime_types(bucket: &Bucket) -> String {
    if bucket.allowed_mime_types.is_empty() {
        return "NULL".to_string();
    }
    let items = bucket
        .allowed_mime_types
        .iter()
        .map(|m| quote_literal(m))
        .collect::<Vec<_>>()
        .join(", ");
    format!("ARRAY[{items}]::text[]")
}

fn size_limit(bucket: &Bucket) -> String {
    bucket
        .file_size_limit
        .map_or_else(|| "NULL".to_string(), |l| l.to_string())
}

pub fn insert_bucket(bucket: &Bucket) -> Vec<String> {
    let id = quote_literal(&bucket.name);
    vec![format!(
        "INSERT INTO storage.buckets (id, name, public, file_size_limit, allowed_mime_types, avif_autodetection) VALUES ({id}, {id}, {}, {}, {}, {});",
        bucket.public,
        size_limit(bucket),
        mime_types(bucket),
        bucket.avif_autodetection
    )]
}

pub fn update_bucket(bucket: &Bucket) -> Vec<String> {
    vec![format!(
        "UPDATE storage.buckets SET public = {}, file_size_limit = {}, allowed_mime_types = {}, avif_autodetection = {} WHERE id = {};",
        bucket.public,
        size_limit(bucket),
        mime_types(bucket),
        bucket.avif_autodetection,
        quote_literal(&bucket.name)
    )]
}

pub fn delete_bucket(bucket: &Bucket) -> Vec<String> {
    vec![format!(
        "DELETE FROM storage.buckets WHERE id = {};",
        quote_literal(&bucket.name)
    )]
}

// =============================================================================
// Policies
// =============================================================================

fn policy_roles(roles: &[String]) -> String {
    if roles.is_empty() {
        return "public".to_string();
    }
    roles
        .iter()
        .map(|r| {
            if r == "public" {
                r.clone()
            } else {
                quote_ident(r)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn create_policy(policy: &Policy) -> Vec<String> {
    let mut sql = format!(
        "CREATE POLICY {} ON {} AS {} FOR {} TO {}",
        quote_ident(&policy.name),
        qualified(&policy.schema, &policy.table),
        policy.action,
        policy.command,
        policy_roles(&policy.roles)
    );
    if policy.command.has_using() {
        sql.push_str(&format!(" USING ({})", clause_body(policy.using.as_deref())));
    }
    if policy.command.has_check() {
        sql.push_str(&format!(
            " WITH CHECK ({})",
            clause_body(policy.check.as_deref())
        ));
    }
    sql.push(';');
    vec![sql]
}

/// `ALTER POLICY` when only roles or clauses changed, else drop and create.
pub fn alter_policy(app: &Policy, remote: &Policy, deltas: &[FieldDelta]) -> Vec<String> {
    if changed(deltas, "command") || changed(deltas, "action") {
        let mut sqls = drop_policy(remote);
        sqls.extend(create_policy(app));
        return sqls;
    }

    let mut sql = format!(
        "ALTER POLICY {} ON {}",
        quote_ident(&app.name),
        qualified(&app.schema, &app.table)
    );
    if changed(deltas, "roles") {
        sql.push_str(&format!(" TO {}", policy_roles(&app.roles)));
    }
    if changed(deltas, "using") && app.command.has_using() {
        sql.push_str(&format!(" USING ({})", clause_body(app.using.as_deref())));
    }
    if changed(deltas, "check") && app.command.has_check() {
        sql.push_str(&format!(" WITH CHECK ({})", clause_body(app.check.as_deref())));
    }
    sql.push(';');
    vec![sql]
}

pub fn drop_policy(policy: &Policy) -> Vec<String> {
    vec![format!(
        "DROP POLICY IF EXISTS {} ON {};",
        quote_ident(&policy.name),
        qualified(&policy.schema, &policy.table)
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use supaform_types::{
        Column, ColumnRef, FunctionParam, PolicyAction, PolicyCommand, RelationKind, ReturnType,
        Security,
    };

    fn delta(field: &str) -> FieldDelta {
        FieldDelta {
            field: field.into(),
            app: String::new(),
            remote: String::new(),
        }
    }

    #[test]
    fn create_table_with_identity_and_key() {
        let table = Table::new("public", "courses")
            .column(Column::new("id", "bigint").primary().auto_increment())
            .column(Column::new("title", "text").not_null().default_value("'untitled'"))
            .column({
                let mut slug = Column::new("slug", "text");
                slug.unique = true;
                slug
            });
        assert_eq!(
            create_table(&table),
            vec![
                "CREATE TABLE \"public\".\"courses\" (\n\
                 \t\"id\" bigint GENERATED BY DEFAULT AS IDENTITY NOT NULL,\n\
                 \t\"title\" text NOT NULL DEFAULT 'untitled',\n\
                 \t\"slug\" text UNIQUE,\n\
                 \tCONSTRAINT \"courses_pkey\" PRIMARY KEY(\"id\")\n);"
                    .to_string()
            ]
        );
    }

    #[test]
    fn rls_switches() {
        let app = Table::new("public", "courses").rls(true, true);
        assert_eq!(
            row_level_security(&app, None),
            vec![
                "ALTER TABLE \"public\".\"courses\" ENABLE ROW LEVEL SECURITY;",
                "ALTER TABLE \"public\".\"courses\" FORCE ROW LEVEL SECURITY;",
            ]
        );
        let remote = Table::new("public", "courses").rls(true, true);
        let app = Table::new("public", "courses").rls(true, false);
        assert_eq!(
            row_level_security(&app, Some(&remote)),
            vec!["ALTER TABLE \"public\".\"courses\" NO FORCE ROW LEVEL SECURITY;"]
        );
    }

    #[test]
    fn column_alterations() {
        let column = |c: Column| TableColumn {
            schema: "public".into(),
            table: "courses".into(),
            column: c,
        };
        let app = column(Column::new("title", "character varying(80)"));
        let remote = column(Column::new("title", "text").not_null().default_value("''"));
        let sqls = alter_column(
            &app,
            &remote,
            &[delta("type"), delta("nullable"), delta("default")],
        );
        assert_eq!(
            sqls,
            vec![
                "ALTER TABLE \"public\".\"courses\" ALTER COLUMN \"title\" SET DATA TYPE character varying(80) USING \"title\"::character varying(80);",
                "ALTER TABLE \"public\".\"courses\" ALTER COLUMN \"title\" DROP NOT NULL;",
                "ALTER TABLE \"public\".\"courses\" ALTER COLUMN \"title\" DROP DEFAULT;",
            ]
        );
        assert!(alter_column(&app, &remote, &[delta("foreign_key")]).is_empty());
    }

    #[test]
    fn foreign_keys() {
        let relation = Relation::new(
            ColumnRef::new("public", "lessons", "course_id"),
            ColumnRef::new("public", "courses", "id"),
            RelationKind::HasOne,
        );
        assert_eq!(
            add_foreign_key(&relation),
            vec![
                "ALTER TABLE \"public\".\"lessons\" ADD CONSTRAINT \"lessons_course_id_fkey\" FOREIGN KEY (\"course_id\") REFERENCES \"public\".\"courses\"(\"id\");"
            ]
        );
    }

    #[test]
    fn roles_and_memberships() {
        let app = Role::new("editor").inheriting(["reader"]);
        let sqls = create_role(&app);
        assert_eq!(
            sqls[0],
            "CREATE ROLE \"editor\" WITH NOSUPERUSER NOCREATEDB NOCREATEROLE INHERIT NOLOGIN NOREPLICATION NOBYPASSRLS CONNECTION LIMIT 60;"
        );
        assert_eq!(sqls[1], "GRANT \"reader\" TO \"editor\";");

        let mut remote = Role::new("editor").inheriting(["writer"]);
        remote.valid_until = Some("2030-01-01".into());
        let sqls = alter_role(&app, &remote, &[delta("inherits"), delta("valid_until")]);
        assert!(sqls[0].ends_with("CONNECTION LIMIT 60 VALID UNTIL 'infinity';"));
        assert_eq!(sqls[1], "GRANT \"reader\" TO \"editor\";");
        assert_eq!(sqls[2], "REVOKE \"writer\" FROM \"editor\";");

        assert_eq!(alter_role(&app, &remote, &[delta("inherits")]).len(), 2);
    }

    #[test]
    fn enum_types() {
        let mut app = PgType::enumeration("public", "status", ["draft", "it's live"]);
        app.comment = Some("publication".into());
        assert_eq!(
            create_type(&app),
            vec![
                "CREATE TYPE \"public\".\"status\" AS ENUM ('draft', 'it''s live');",
                "COMMENT ON TYPE \"public\".\"status\" IS 'publication';",
            ]
        );
        let remote = PgType::enumeration("public", "status", ["draft"]);
        assert_eq!(
            alter_type(&app, &remote, &[delta("enums")]),
            vec!["ALTER TYPE \"public\".\"status\" ADD VALUE IF NOT EXISTS 'it''s live';"]
        );
    }

    #[test]
    fn function_definition_and_return_change() {
        let mut app = Function::new("public", "get_submissions");
        app.params.push(FunctionParam {
            default: Some("NULL".into()),
            ..FunctionParam::new("candidate_id", "uuid")
        });
        app.returns = ReturnType::SetOf("submissions".into());
        app.security = Security::Definer;
        app.definition = "begin return query select * from submissions; end;".into();

        let sql = &create_function(&app)[0];
        assert!(sql.starts_with(
            "CREATE OR REPLACE FUNCTION \"public\".\"get_submissions\"(\"candidate_id\" uuid DEFAULT NULL)\nRETURNS SETOF submissions\nLANGUAGE plpgsql\nSECURITY DEFINER\nVOLATILE\nAS $function$\n"
        ));
        assert!(sql.ends_with("\n$function$;"));

        let mut remote = app.clone();
        remote.returns = ReturnType::Scalar("integer".into());
        let sqls = replace_function(&app, &remote, &[delta("returns")]);
        assert_eq!(sqls[0], "DROP FUNCTION IF EXISTS \"public\".\"get_submissions\"(uuid);");
        assert_eq!(replace_function(&app, &remote, &[delta("definition")]).len(), 1);
    }

    #[test]
    fn dollar_tag_avoids_body() {
        assert_eq!(dollar_tag("select 1"), "$function$");
        assert_eq!(dollar_tag("select '$function$'"), "$function_1$");
    }

    #[test]
    fn bucket_rows() {
        let mut bucket = Bucket::new("avatars");
        bucket.allowed_mime_types = vec!["image/png".into()];
        bucket.file_size_limit = Some(1_048_576);
        assert_eq!(
            insert_bucket(&bucket),
            vec![
                "INSERT INTO storage.buckets (id, name, public, file_size_limit, allowed_mime_types, avif_autodetection) VALUES ('avatars', 'avatars', false, 1048576, ARRAY['image/png']::text[], false);"
            ]
        );
        assert_eq!(
            delete_bucket(&bucket),
            vec!["DELETE FROM storage.buckets WHERE id = 'avatars';"]
        );
    }

    #[test]
    fn policy_sides_follow_command() {
        let select = Policy::new("public", "courses", "courses_read", PolicyCommand::Select)
            .to(["anon", "authenticated"]);
        assert_eq!(
            create_policy(&select),
            vec![
                "CREATE POLICY \"courses_read\" ON \"public\".\"courses\" AS PERMISSIVE FOR SELECT TO \"anon\", \"authenticated\" USING (TRUE);"
            ]
        );

        let insert = Policy::new("public", "courses", "courses_insert", PolicyCommand::Insert)
            .to(["authenticated"])
            .with_check("(owner_id = auth.uid())");
        assert_eq!(
            create_policy(&insert)[0],
            "CREATE POLICY \"courses_insert\" ON \"public\".\"courses\" AS PERMISSIVE FOR INSERT TO \"authenticated\" WITH CHECK (owner_id = auth.uid());"
        );
    }

    #[test]
    fn policy_updates() {
        let app = Policy::new("public", "courses", "courses_update", PolicyCommand::Update)
            .to(["authenticated"])
            .using("owner_id = auth.uid()");
        let remote = app.clone().using("TRUE");
        assert_eq!(
            alter_policy(&app, &remote, &[delta("using")]),
            vec!["ALTER POLICY \"courses_update\" ON \"public\".\"courses\" USING (owner_id = auth.uid());"]
        );

        let mut restrictive = remote.clone();
        restrictive.action = PolicyAction::Restrictive;
        let sqls = alter_policy(&app, &restrictive, &[delta("action")]);
        assert_eq!(
            sqls[0],
            "DROP POLICY IF EXISTS \"courses_update\" ON \"public\".\"courses\";"
        );
        assert!(sqls[1].starts_with("CREATE POLICY"));
    }
}
