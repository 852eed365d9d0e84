//! Declarations to resources
//!
//! Applies the naming and typing defaults, resolves `join` tags into
//! relation edges and `read`/`write` tags into policies. This is the single
//! conversion used for both source-extracted and derive-produced records.

use std::collections::HashMap;

use heck::ToSnakeCase;
use supaform_core::{Clause, storage_check, storage_using};
use supaform_types::tags::split_list;
use supaform_types::{
    Behavior, Bucket, BucketDecl, Column, ColumnRef, ColumnTag, Declaration, FieldDecl, Function,
    FunctionParam, JoinTag, ModelBinding, ModelDecl, ParamTag, PgType, Policy, PolicyCommand,
    Relation, RelationKind, Resource, ReturnType, Role, RoleDecl, RpcDecl, Security, Table,
    TypeAttribute, TypeDecl, split_top_level_commas,
};

use crate::error::{Error, Result};
use crate::grammar::{
    generic_arg, is_serial_type, normalize_default, normalize_type, policy_name, rust_type_to_sql,
    target_struct, unwrap_option,
};
use crate::rpc::{parse_bindings, substitute};
use crate::set::ResourceSet;

const DEFAULT_SCHEMA: &str = "public";

/// Struct names of models and user types, resolved up front so that fields
/// can refer to items declared later.
struct Names {
    /// struct name -> (schema, table)
    models: HashMap<String, (String, String)>,
    /// struct name -> type reference as written in a column type
    types: HashMap<String, String>,
}

impl Names {
    fn collect(decls: &[Declaration]) -> Self {
        let mut models = HashMap::new();
        let mut types = HashMap::new();
        for decl in decls {
            match decl {
                Declaration::Model(d) => {
                    models.insert(d.struct_name.clone(), model_location(d));
                }
                Declaration::Type(d) => {
                    let (schema, name) = type_location(d);
                    let reference = if schema == DEFAULT_SCHEMA {
                        name
                    } else {
                        format!("{schema}.{name}")
                    };
                    types.insert(d.struct_name.clone(), reference);
                }
                _ => {}
            }
        }
        Self { models, types }
    }

    fn model(&self, struct_name: &str) -> Option<&(String, String)> {
        self.models.get(struct_name)
    }

    /// SQL type of a field whose Rust type is a declared `PgType`.
    fn user_type(&self, rust_type: &str) -> Option<String> {
        let (inner, _) = unwrap_option(rust_type);
        if let Some(element) = generic_arg(inner, "Vec") {
            return self.user_type(element).map(|t| format!("{t}[]"));
        }
        self.types.get(target_struct(inner)).cloned()
    }

    /// SQL type inferred from a Rust type.
    fn sql_type(&self, rust_type: &str) -> Option<String> {
        rust_type_to_sql(rust_type).or_else(|| self.user_type(rust_type))
    }
}

fn default_name(struct_name: &str) -> String {
    struct_name.to_snake_case()
}

fn model_location(d: &ModelDecl) -> (String, String) {
    (
        d.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        d.table.clone().unwrap_or_else(|| default_name(&d.struct_name)),
    )
}

fn type_location(d: &TypeDecl) -> (String, String) {
    (
        d.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        d.name.clone().unwrap_or_else(|| default_name(&d.struct_name)),
    )
}

fn insert(set: &mut ResourceSet, resource: Resource) -> Result<()> {
    let identity = resource.identity();
    let kind = resource.kind();
    if set.insert(resource) {
        Ok(())
    } else {
        Err(Error::validation(
            identity,
            format!("{kind} is declared more than once"),
        ))
    }
}

/// Build the declared resource set.
pub fn materialize(decls: &[Declaration]) -> Result<ResourceSet> {
    let names = Names::collect(decls);
    let mut set = ResourceSet::new();

    for decl in decls {
        match decl {
            Declaration::Role(d) => insert(&mut set, Resource::Role(role(d)?))?,
            Declaration::Type(d) => insert(&mut set, Resource::Type(pg_type(d)?))?,
            Declaration::Model(d) => insert(&mut set, Resource::Table(table(d, &names)?))?,
            _ => {}
        }
    }

    let mut relations = Vec::new();
    for decl in decls {
        if let Declaration::Model(d) = decl {
            for field in d.fields.iter().filter(|f| f.join.is_some()) {
                for edge in join_edges(d, field, &names, &set)? {
                    add_edge(&mut relations, &mut set, edge)?;
                }
            }
        }
    }
    for edge in relations {
        insert(&mut set, Resource::Relation(edge))?;
    }

    for decl in decls {
        match decl {
            Declaration::Model(d) => {
                let (schema, table) = model_location(d);
                let rules = Rules {
                    read: d.read.as_deref(),
                    write: d.write.as_deref(),
                    read_using: d.read_using.as_deref(),
                    write_check: d.write_check.as_deref(),
                    write_using: d.write_using.as_deref(),
                };
                for policy in rules.policies(&schema, &table, &table, None) {
                    insert(&mut set, Resource::Policy(policy))?;
                }
            }
            Declaration::Rpc(d) => insert(&mut set, Resource::Function(function(d, &names)?))?,
            Declaration::Bucket(d) => {
                let (bucket, rules) = bucket(d)?;
                let name = bucket.name.clone();
                insert(&mut set, Resource::Bucket(bucket))?;
                for policy in rules.policies("storage", "objects", &name, Some(&name)) {
                    insert(&mut set, Resource::Policy(policy))?;
                }
            }
            _ => {}
        }
    }

    Ok(set)
}

// =============================================================================
// Tables
// =============================================================================

fn table(d: &ModelDecl, names: &Names) -> Result<Table> {
    let (schema, name) = model_location(d);
    let mut table = Table::new(&schema, &name).rls(
        d.rls_enabled.unwrap_or(true),
        d.rls_forced.unwrap_or(false),
    );

    for field in d.fields.iter().filter(|f| f.join.is_none()) {
        let column = column(&table.identity(), field, names)?;
        if table.find_column(&column.name).is_some() {
            return Err(Error::validation(
                format!("{}.{}", table.identity(), column.name),
                "column is declared more than once",
            ));
        }
        table.push_column(column);
    }
    Ok(table)
}

/// Column name: tag `name`, else the snake-cased serde rename, else the field.
fn column_name(field: &FieldDecl, tag: &ColumnTag) -> String {
    tag.name
        .clone()
        .or_else(|| field.serde_rename.as_deref().map(ToSnakeCase::to_snake_case))
        .unwrap_or_else(|| field.ident.trim_start_matches("r#").to_string())
}

fn column(owner: &str, field: &FieldDecl, names: &Names) -> Result<Column> {
    let resource = format!("{owner}.{}", field.ident);
    let tag = match &field.column {
        Some(tag) => {
            ColumnTag::parse(tag).map_err(|e| Error::validation(&resource, e.to_string()))?
        }
        None => ColumnTag::default(),
    };

    let declared = match &tag.data_type {
        Some(ty) => ty.clone(),
        None => names.sql_type(&field.rust_type).ok_or_else(|| {
            Error::validation(
                &resource,
                format!(
                    "cannot infer a SQL type for `{}`, add `type:` to the column tag",
                    field.rust_type
                ),
            )
        })?,
    };
    let (_, optional) = unwrap_option(&field.rust_type);

    let mut column = Column::new(column_name(field, &tag), normalize_type(&declared));
    column.nullable = tag.nullable.unwrap_or(optional);
    column.unique = tag.unique;
    column.auto_increment = tag.auto_increment || is_serial_type(&declared);
    column.default = tag.default.as_deref().map(normalize_default);
    if tag.primary_key {
        column = column.primary();
    }
    Ok(column)
}

// =============================================================================
// Relations
// =============================================================================

fn required<'a>(value: &'a Option<String>, resource: &str, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::validation(resource, format!("join tag needs `{key}`")))
}

fn join_edges(
    d: &ModelDecl,
    field: &FieldDecl,
    names: &Names,
    set: &ResourceSet,
) -> Result<Vec<Relation>> {
    let (schema, table) = model_location(d);
    let resource = format!("{schema}.{table}.{}", field.ident);
    let tag = JoinTag::parse(field.join.as_deref().unwrap_or_default())
        .map_err(|e| Error::validation(&resource, e.to_string()))?;

    let target_name = target_struct(&field.rust_type);
    let (target_schema, target_table) = names.model(target_name).ok_or_else(|| {
        Error::validation(&resource, format!("join target `{target_name}` is not a model"))
    })?;

    let edges = match tag.join_type {
        RelationKind::HasOne => {
            let fk = required(&tag.foreign_key, &resource, "foreignKey")?;
            let pk = tag.primary_key.as_deref().unwrap_or("id");
            vec![Relation::new(
                ColumnRef::new(&schema, &table, fk),
                ColumnRef::new(target_schema, target_table, pk),
                RelationKind::HasOne,
            )]
        }
        RelationKind::HasMany => {
            let fk = required(&tag.foreign_key, &resource, "foreignKey")?;
            let pk = tag.primary_key.as_deref().unwrap_or("id");
            vec![Relation::new(
                ColumnRef::new(target_schema, target_table, fk),
                ColumnRef::new(&schema, &table, pk),
                RelationKind::HasMany,
            )]
        }
        RelationKind::ManyToMany => {
            let through = required(&tag.through, &resource, "through")?;
            let (through_schema, through_table) = match through.split_once('.') {
                Some((s, t)) => (s.to_string(), t.to_string()),
                None => (DEFAULT_SCHEMA.to_string(), through.to_string()),
            };
            let junction = set.table(&through_schema, &through_table).ok_or_else(|| {
                Error::validation(&resource, format!("through table `{through}` is not a model"))
            })?;
            let source_fk = required(&tag.source_foreign_key, &resource, "sourceForeignKey")?;
            let target_fk = required(&tag.target_foreign, &resource, "targetForeign")?;
            for fk in [source_fk, target_fk] {
                if junction.find_column(fk).is_none() {
                    return Err(Error::validation(
                        &resource,
                        format!("through table `{through}` has no column `{fk}`"),
                    ));
                }
            }

            let through_id = junction.identity();
            [
                (
                    source_fk,
                    ColumnRef::new(
                        &schema,
                        &table,
                        tag.source_primary_key.as_deref().unwrap_or("id"),
                    ),
                ),
                (
                    target_fk,
                    ColumnRef::new(
                        target_schema,
                        target_table,
                        tag.target_primary_key.as_deref().unwrap_or("id"),
                    ),
                ),
            ]
            .into_iter()
            .map(|(fk, target)| {
                let mut edge = Relation::new(
                    ColumnRef::new(&through_schema, &through_table, fk),
                    target,
                    RelationKind::ManyToMany,
                );
                edge.through = Some(through_id.clone());
                edge
            })
            .collect()
        }
    };
    Ok(edges)
}

/// Record an edge once and mark its source column as a foreign key.
fn add_edge(relations: &mut Vec<Relation>, set: &mut ResourceSet, edge: Relation) -> Result<()> {
    if relations.iter().any(|r| r.same_edge(&edge)) {
        return Ok(());
    }
    if let Some(other) = relations.iter().find(|r| r.source == edge.source) {
        return Err(Error::validation(
            edge.source.to_string(),
            format!(
                "foreign key references both {} and {}",
                other.target, edge.target
            ),
        ));
    }

    let column = set
        .tables
        .get_mut(&edge.source.table_identity())
        .and_then(|t| t.columns.iter_mut().find(|c| c.name == edge.source.column))
        .ok_or_else(|| {
            Error::validation(edge.source.to_string(), "foreign key column does not exist")
        })?;
    column.foreign_key = Some(edge.target.clone());
    relations.push(edge);
    Ok(())
}

// =============================================================================
// Policies
// =============================================================================

/// The `read`/`write` attributes shared by models and buckets.
struct Rules<'a> {
    read: Option<&'a str>,
    write: Option<&'a str>,
    read_using: Option<&'a str>,
    write_check: Option<&'a str>,
    write_using: Option<&'a str>,
}

impl Rules<'_> {
    /// The four policies, named after `owner`. Bucket rules are scoped to
    /// their bucket.
    fn policies(
        &self,
        schema: &str,
        table: &str,
        owner: &str,
        bucket: Option<&str>,
    ) -> Vec<Policy> {
        let side = |clause: Option<&str>| -> String {
            let clause = Clause::raw(clause.unwrap_or_default());
            match bucket {
                Some(bucket) => storage_using(bucket, &clause).into_sql(),
                None => clause.or_true().into_sql(),
            }
        };
        let check_side = |clause: Option<&str>| -> String {
            let clause = Clause::raw(clause.unwrap_or_default());
            match bucket {
                Some(bucket) => storage_check(bucket, &clause).into_sql(),
                None => clause.or_true().into_sql(),
            }
        };
        let scoped = |policy: Policy| match bucket {
            Some(bucket) => policy.for_bucket(bucket),
            None => policy,
        };

        let mut out = Vec::new();
        let readers = split_list(self.read.unwrap_or_default());
        if !readers.is_empty() {
            out.push(scoped(
                Policy::new(schema, table, policy_name(owner, "read"), PolicyCommand::Select)
                    .to(readers)
                    .using(side(self.read_using)),
            ));
        }

        let writers = split_list(self.write.unwrap_or_default());
        if !writers.is_empty() {
            out.push(scoped(
                Policy::new(schema, table, policy_name(owner, "insert"), PolicyCommand::Insert)
                    .to(writers.clone())
                    .with_check(check_side(self.write_check)),
            ));
            out.push(scoped(
                Policy::new(schema, table, policy_name(owner, "update"), PolicyCommand::Update)
                    .to(writers.clone())
                    .using(side(self.write_using))
                    .with_check(check_side(self.write_check)),
            ));
            out.push(scoped(
                Policy::new(schema, table, policy_name(owner, "delete"), PolicyCommand::Delete)
                    .to(writers)
                    .using(side(self.write_using)),
            ));
        }
        out
    }
}

// =============================================================================
// Roles, Buckets, Types, Functions
// =============================================================================

fn role(d: &RoleDecl) -> Result<Role> {
    let mut role = Role::new(d.name.clone().unwrap_or_else(|| default_name(&d.struct_name)));
    if let Some(limit) = d.connection_limit {
        role.connection_limit = i32::try_from(limit).map_err(|_| {
            Error::validation(&role.name, format!("connection limit {limit} is out of range"))
        })?;
    }
    role.inherit = d.inherit.unwrap_or(true);
    role.inherits = split_list(d.inherits.as_deref().unwrap_or_default());
    role.can_login = d.can_login.unwrap_or(false);
    role.can_create_db = d.can_create_db.unwrap_or(false);
    role.can_create_role = d.can_create_role.unwrap_or(false);
    role.replication = d.replication.unwrap_or(false);
    role.superuser = d.superuser.unwrap_or(false);
    role.bypass_rls = d.bypass_rls.unwrap_or(false);
    role.valid_until = d.valid_until.clone().filter(|v| !v.trim().is_empty());
    Ok(role)
}

fn bucket(d: &BucketDecl) -> Result<(Bucket, Rules<'_>)> {
    let mut bucket = Bucket::new(d.name.clone().unwrap_or_else(|| default_name(&d.struct_name)));
    bucket.public = d.public.unwrap_or(false);
    bucket.allowed_mime_types = split_list(d.allowed_mime_types.as_deref().unwrap_or_default());
    bucket.file_size_limit = d.file_size_limit;
    bucket.avif_autodetection = d.avif_autodetection.unwrap_or(false);
    if bucket.file_size_limit.is_some_and(|limit| limit < 0) {
        return Err(Error::validation(&bucket.name, "file size limit must not be negative"));
    }

    let rules = Rules {
        read: d.read.as_deref(),
        write: d.write.as_deref(),
        read_using: d.read_using.as_deref(),
        write_check: d.write_check.as_deref(),
        write_using: d.write_using.as_deref(),
    };
    Ok((bucket, rules))
}

fn pg_type(d: &TypeDecl) -> Result<PgType> {
    let (schema, name) = type_location(d);
    let identity = format!("{schema}.{name}");

    let attributes = split_top_level_commas(d.attributes.as_deref().unwrap_or_default())
        .into_iter()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|attr| match attr.split_once(':') {
            Some((name, ty)) if !name.trim().is_empty() && !ty.trim().is_empty() => {
                Ok(TypeAttribute {
                    name: name.trim().to_string(),
                    data_type: normalize_type(ty),
                })
            }
            _ => Err(Error::validation(
                &identity,
                format!("attribute '{attr}' is not of the form name:type"),
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    let enums = split_list(d.enums.as_deref().unwrap_or_default());
    if !enums.is_empty() && !attributes.is_empty() {
        return Err(Error::validation(
            &identity,
            "a type is either an enum or a composite",
        ));
    }

    Ok(PgType {
        format: d.format.clone().unwrap_or_else(|| name.clone()),
        schema,
        name,
        enums,
        attributes,
        comment: d.comment.clone().filter(|c| !c.is_empty()),
    })
}

fn function(d: &RpcDecl, names: &Names) -> Result<Function> {
    let mut function = Function::new(
        d.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        d.name.clone().unwrap_or_else(|| default_name(&d.struct_name)),
    );
    let resource = format!("{}.{}", function.schema, function.name);

    if let Some(security) = &d.security {
        function.security = Security::parse(security).ok_or_else(|| {
            Error::validation(&resource, format!("unknown security '{security}'"))
        })?;
    }
    if let Some(behavior) = &d.behavior {
        function.behavior = Behavior::parse(behavior).ok_or_else(|| {
            Error::validation(&resource, format!("unknown behavior '{behavior}'"))
        })?;
    }
    if let Some(language) = &d.language {
        function.language = language.trim().to_ascii_lowercase();
    }
    if let Some(returns) = &d.returns {
        function.returns = ReturnType::parse(returns);
    }

    for param in &d.params {
        let tag = match &param.param {
            Some(tag) => ParamTag::parse(tag).map_err(|e| {
                Error::validation(format!("{resource}.{}", param.ident), e.to_string())
            })?,
            None => ParamTag::default(),
        };
        let declared = match &tag.data_type {
            Some(ty) => ty.clone(),
            None => names.sql_type(&param.rust_type).ok_or_else(|| {
                Error::validation(
                    format!("{resource}.{}", param.ident),
                    format!("cannot infer a SQL type for `{}`", param.rust_type),
                )
            })?,
        };
        function.params.push(FunctionParam {
            name: tag
                .name
                .clone()
                .unwrap_or_else(|| param.ident.trim_start_matches("r#").to_string()),
            data_type: normalize_type(&declared),
            default: tag.default.as_deref().map(normalize_default),
        });
    }

    let models = d.models.as_deref().unwrap_or_default();
    for (alias, model) in parse_bindings(models).map_err(|e| Error::validation(&resource, e))? {
        let (schema, table) = names.model(&model).ok_or_else(|| {
            Error::validation(
                &resource,
                format!("alias `{alias}` is bound to unknown model `{model}`"),
            )
        })?;
        function.bindings.push(ModelBinding {
            alias,
            model,
            schema: schema.clone(),
            table: table.clone(),
        });
    }
    function.definition = substitute(
        d.definition.as_deref().unwrap_or_default(),
        &function.bindings,
    );
    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_declarations;

    fn decls(source: &str) -> Vec<Declaration> {
        parse_declarations(source).unwrap()
    }

    const COURSES: &str = r#"
#[derive(Model)]
#[model(table = "courses", read = "anon, authenticated", write = "authenticated",
        writeUsing = "owner_id = auth.uid()")]
pub struct Courses {
    #[column("name:id;type:bigserial;primaryKey")]
    pub id: i64,
    #[serde(rename = "ownerId")]
    pub owner: Uuid,
    pub summary: Option<String>,
    pub status: Status,
    #[join("joinType:hasMany;primaryKey:id;foreignKey:course_id")]
    pub lessons: Vec<Lessons>,
}

#[derive(Model)]
#[model(table = "lessons")]
pub struct Lessons {
    #[column("name:id;type:uuid;primaryKey;default:gen_random_uuid()")]
    pub id: Uuid,
    pub course_id: i64,
    #[join("joinType:hasOne;primaryKey:id;foreignKey:course_id")]
    pub course: Option<Box<Courses>>,
}

#[derive(PgType)]
#[pg_type(enums = "draft,published")]
pub struct Status;
"#;

    #[test]
    fn model_columns_and_relations() {
        let set = materialize(&decls(COURSES)).unwrap();
        let courses = set.table("public", "courses").unwrap();
        let names: Vec<_> = courses.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "owner_id", "summary", "status"]);

        let id = &courses.columns[0];
        assert_eq!(id.data_type, "bigint");
        assert!(id.auto_increment && id.primary_key && !id.nullable);
        assert_eq!(courses.primary_keys, ["id"]);
        assert_eq!(courses.columns[1].data_type, "uuid");
        assert!(!courses.columns[1].nullable);
        assert!(courses.columns[2].nullable);
        assert_eq!(courses.columns[3].data_type, "status");
        assert!(courses.rls_enabled && !courses.rls_forced);

        // hasMany on one side and hasOne on the other are the same edge
        assert_eq!(set.relations.len(), 1);
        let edge = &set.relations.list()[0];
        assert_eq!(edge.source, ColumnRef::new("public", "lessons", "course_id"));
        assert_eq!(edge.target, ColumnRef::new("public", "courses", "id"));
        let lessons = set.table("public", "lessons").unwrap();
        assert_eq!(
            lessons.find_column("course_id").unwrap().foreign_key,
            Some(ColumnRef::new("public", "courses", "id"))
        );
        assert_eq!(
            lessons.find_column("id").unwrap().default.as_deref(),
            Some("gen_random_uuid()")
        );
    }

    #[test]
    fn model_rules_become_policies() {
        let set = materialize(&decls(COURSES)).unwrap();
        let names: Vec<_> = set
            .policies
            .iter()
            .filter(|p| p.table == "courses")
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["courses_read", "courses_insert", "courses_update", "courses_delete"]);

        let read = set.policies.get("public.courses.courses_read").unwrap();
        assert_eq!(read.roles, ["anon", "authenticated"]);
        assert_eq!(read.using.as_deref(), Some("TRUE"));
        assert_eq!(read.check, None);

        let update = set.policies.get("public.courses.courses_update").unwrap();
        assert_eq!(update.using.as_deref(), Some("owner_id = auth.uid()"));
        assert_eq!(update.check.as_deref(), Some("TRUE"));

        // no read/write tags, no policies
        assert!(set.policies.iter().all(|p| p.table != "lessons"));
    }

    #[test]
    fn bucket_rules_are_scoped() {
        let set = materialize(&decls(
            r#"
#[derive(Bucket)]
#[bucket(name = "avatars", allowedMimeTypes = "image/png,image/jpeg", fileSizeLimit = 1048576,
         read = "authenticated", readUsing = "owner = auth.uid()")]
pub struct Avatars;
"#,
        ))
        .unwrap();
        let bucket = set.buckets.get("avatars").unwrap();
        assert_eq!(bucket.allowed_mime_types, ["image/png", "image/jpeg"]);
        assert!(!bucket.public);

        let read = set.policies.get("storage.objects.avatars_read").unwrap();
        assert_eq!(read.bucket.as_deref(), Some("avatars"));
        assert_eq!(
            read.using.as_deref(),
            Some(r#""bucket_id" = 'avatars' AND owner = auth.uid()"#)
        );
        assert_eq!(set.policies.len(), 1);
    }

    #[test]
    fn rpc_bindings_are_substituted() {
        let source = format!(
            "{COURSES}{}",
            r###"
#[derive(Rpc)]
#[rpc(name = "course_titles", behavior = "stable", returns = "SETOF text", models = "c:Courses",
      definition = r#"begin return query select c.summary from :c c where c.owner_id = uid; end;"#)]
pub struct CourseTitles {
    pub uid: Uuid,
    #[param("name:max_rows;type:int4;default:10")]
    pub limit: Option<i32>,
}
"###
        );
        let set = materialize(&decls(&source)).unwrap();
        let function = set.functions.get("public.course_titles(uuid, integer)").unwrap();
        assert_eq!(function.behavior, Behavior::Stable);
        assert_eq!(function.security, Security::Invoker);
        assert_eq!(function.language, "plpgsql");
        assert_eq!(function.returns, ReturnType::SetOf("text".into()));
        assert_eq!(function.params[1].name, "max_rows");
        assert_eq!(function.params[1].default.as_deref(), Some("10"));
        assert!(function.definition.contains("from courses c where"));
        assert_eq!(function.bindings[0].table, "courses");
    }

    #[test]
    fn rejects_unknown_binding_and_duplicates() {
        let unknown = decls(
            "#[derive(Rpc)]\n#[rpc(name = \"f\", models = \"x:Missing\")]\npub struct F;\n",
        );
        let err = materialize(&unknown).unwrap_err();
        assert!(err.to_string().contains("unknown model `Missing`"));

        let twice = decls(
            "#[derive(Role)]\n#[role(name = \"editor\")]\npub struct A;\n#[derive(Role)]\n#[role(name = \"editor\")]\npub struct B;\n",
        );
        assert!(materialize(&twice).unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn many_to_many_needs_through_columns() {
        let source = r#"
#[derive(Model)]
pub struct Students {
    #[column("primaryKey")]
    pub id: i64,
    #[join("joinType:manyToMany;through:enrollments;sourceForeignKey:student_id;targetForeign:course_id")]
    pub courses: Vec<Courses>,
}

#[derive(Model)]
pub struct Courses {
    #[column("primaryKey")]
    pub id: i64,
}

#[derive(Model)]
pub struct Enrollments {
    pub student_id: i64,
    pub course_id: i64,
}
"#;
        let set = materialize(&decls(source)).unwrap();
        assert_eq!(set.relations.len(), 2);
        assert!(set.relations.iter().all(|r| r.kind == RelationKind::ManyToMany
            && r.through.as_deref() == Some("public.enrollments")));

        let missing = source.replace("pub course_id: i64,", "");
        let err = materialize(&decls(&missing)).unwrap_err();
        assert!(err.to_string().contains("has no column `course_id`"));
    }

    #[test]
    fn conflicting_foreign_keys() {
        let source = r#"
#[derive(Model)]
pub struct A {
    #[column("primaryKey")]
    pub id: i64,
}

#[derive(Model)]
pub struct B {
    #[column("primaryKey")]
    pub id: i64,
}

#[derive(Model)]
pub struct C {
    pub parent_id: i64,
    #[join("joinType:hasOne;foreignKey:parent_id")]
    pub a: Option<A>,
    #[join("joinType:hasOne;foreignKey:parent_id")]
    pub b: Option<B>,
}
"#;
        let err = materialize(&decls(source)).unwrap_err();
        assert!(err.to_string().contains("references both public.a.id and public.b.id"));
    }
}
