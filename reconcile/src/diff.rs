//! Declared vs. remote comparison
//!
//! [`diff`] pairs resources by identity and reports, per kind, what must be
//! created, updated or dropped. Comparison is semantic: types are compared
//! after alias normalization, defaults without casts, clauses in their
//! normal form and lists as sets where order carries no meaning.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use supaform_core::{Qualifier, normalized_eq};
use supaform_types::{
    Bucket, Column, Function, PgType, Policy, Relation, Resource, ResourceKind, Role, Table,
    TableColumn,
};
use tracing::debug;

use crate::context::Context;
use crate::grammar::{
    collapse_whitespace, is_platform_role, is_protected_schema, normalize_default,
    normalize_return_type, normalize_type,
};
use crate::set::{Collection, Keyed, ResourceSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Create,
    Update,
    Drop,
}

impl ChangeOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One differing field of an updated resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDelta {
    pub field: String,
    /// Declared value
    pub app: String,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub kind: ResourceKind,
    pub op: ChangeOp,
    pub identity: String,
    pub declared: Option<Resource>,
    pub remote: Option<Resource>,
    pub deltas: Vec<FieldDelta>,
}

impl Change {
    pub fn has_delta(&self, field: &str) -> bool {
        self.deltas.iter().any(|d| d.field == field)
    }
}

/// Every change between two sets, grouped by kind in planner order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub changes: Vec<Change>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn count(&self, op: ChangeOp) -> usize {
        self.changes.iter().filter(|c| c.op == op).count()
    }
}

// =============================================================================
// Field Comparison
// =============================================================================

#[derive(Default)]
struct Deltas(Vec<FieldDelta>);

impl Deltas {
    fn check(
        &mut self,
        field: &str,
        equal: bool,
        app: impl fmt::Display,
        remote: impl fmt::Display,
    ) {
        if !equal {
            self.0.push(FieldDelta {
                field: field.to_string(),
                app: app.to_string(),
                remote: remote.to_string(),
            });
        }
    }

    fn value<T: PartialEq + fmt::Display>(&mut self, field: &str, app: T, remote: T) {
        let equal = app == remote;
        self.check(field, equal, app, remote);
    }

    fn set(&mut self, field: &str, app: &[String], remote: &[String]) {
        let (a, r) = (sorted(app), sorted(remote));
        let equal = a == r;
        self.check(field, equal, list(&a), list(&r));
    }
}

fn sorted(items: &[String]) -> Vec<String> {
    let mut out = items.to_vec();
    out.sort();
    out.dedup();
    out
}

fn list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("null")
}

/// Type name without a schema prefix, after alias normalization.
fn canonical_type(sql_type: &str) -> String {
    let ty = normalize_type(sql_type);
    let head_end = ty.find('(').unwrap_or(ty.len());
    match ty[..head_end].rfind('.') {
        Some(dot) => ty[dot + 1..].to_string(),
        None => ty,
    }
}

/// A role expiry as a calendar date; `infinity` means none.
fn expiry(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("infinity") {
        return None;
    }
    let date = DateTime::parse_from_rfc3339(value)
        .map(|d| d.date_naive())
        .or_else(|_| {
            DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%#z").map(|d| d.date_naive())
        })
        .or_else(|_| NaiveDate::parse_from_str(value.get(..10).unwrap_or(value), "%Y-%m-%d"));
    Some(match date {
        Ok(date) => date.to_string(),
        Err(_) => value.to_string(),
    })
}

fn table_deltas(app: &Table, remote: &Table) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    d.set("primary_key", &app.primary_keys, &remote.primary_keys);
    d.value("rls_enabled", app.rls_enabled, remote.rls_enabled);
    d.value("rls_forced", app.rls_forced, remote.rls_forced);
    d.0
}

fn column_deltas(app: &Column, remote: &Column) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    d.check(
        "type",
        canonical_type(&app.data_type) == canonical_type(&remote.data_type),
        &app.data_type,
        &remote.data_type,
    );
    d.value("nullable", app.nullable, remote.nullable);
    let (a, r) = (
        app.default.as_deref().map(normalize_default),
        remote.default.as_deref().map(normalize_default),
    );
    d.check("default", a == r, opt(a.as_deref()), opt(r.as_deref()));
    d.value("unique", app.unique, remote.unique);
    // keys into platform schemas cannot be declared
    let key = |c: &Column| {
        c.foreign_key
            .as_ref()
            .filter(|fk| !is_protected_schema(&fk.schema))
            .map(ToString::to_string)
    };
    let (a, r) = (key(app), key(remote));
    d.check("foreign_key", a == r, opt(a.as_deref()), opt(r.as_deref()));
    d.0
}

/// A policy side as the command evaluates it, `TRUE` when absent.
fn side(policy: &Policy, using: bool) -> Option<&str> {
    let (applies, clause) = if using {
        (policy.command.has_using(), policy.using.as_deref())
    } else {
        (policy.command.has_check(), policy.check.as_deref())
    };
    applies.then(|| clause.unwrap_or("TRUE"))
}

fn policy_deltas(app: &Policy, remote: &Policy) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    let qualifier = Qualifier::new(&app.schema, &app.table);
    d.value("action", app.action, remote.action);
    d.value("command", app.command, remote.command);
    d.set("roles", &app.roles, &remote.roles);
    for (field, using) in [("using", true), ("check", false)] {
        let (a, r) = (side(app, using), side(remote, using));
        let equal = match (a, r) {
            (Some(a), Some(r)) => normalized_eq(a, r, &qualifier),
            (a, r) => a == r,
        };
        d.check(field, equal, opt(a), opt(r));
    }
    d.0
}

fn role_deltas(app: &Role, remote: &Role) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    d.value("connection_limit", app.connection_limit, remote.connection_limit);
    d.value("inherit", app.inherit, remote.inherit);
    d.set("inherits", &app.inherits, &remote.inherits);
    d.value("can_login", app.can_login, remote.can_login);
    d.value("can_create_db", app.can_create_db, remote.can_create_db);
    d.value("can_create_role", app.can_create_role, remote.can_create_role);
    d.value("replication", app.replication, remote.replication);
    d.value("superuser", app.superuser, remote.superuser);
    d.value("bypass_rls", app.bypass_rls, remote.bypass_rls);
    let (a, r) = (
        expiry(app.valid_until.as_deref()),
        expiry(remote.valid_until.as_deref()),
    );
    d.check("valid_until", a == r, opt(a.as_deref()), opt(r.as_deref()));
    d.0
}

fn param_list(function: &Function) -> String {
    function
        .params
        .iter()
        .map(|p| match &p.default {
            Some(default) => format!("{} {} = {}", p.name, p.data_type, normalize_default(default)),
            None => format!("{} {}", p.name, p.data_type),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn function_deltas(app: &Function, remote: &Function) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    d.value("params", param_list(app), param_list(remote));
    d.check(
        "returns",
        normalize_return_type(&app.returns) == normalize_return_type(&remote.returns),
        &app.returns,
        &remote.returns,
    );
    d.value("language", app.language.to_ascii_lowercase(), remote.language.to_ascii_lowercase());
    d.value("security", app.security.as_str(), remote.security.as_str());
    d.value("behavior", app.behavior.as_str(), remote.behavior.as_str());
    let (a, r) = (
        collapse_whitespace(&app.definition),
        collapse_whitespace(&remote.definition),
    );
    d.check("definition", a == r, &a, &r);
    d.0
}

fn type_deltas(app: &PgType, remote: &PgType) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    d.value("format", app.format.as_str(), remote.format.as_str());
    d.set("enums", &app.enums, &remote.enums);
    let attrs = |t: &PgType| {
        t.attributes
            .iter()
            .map(|a| format!("{} {}", a.name, canonical_type(&a.data_type)))
            .collect::<Vec<_>>()
    };
    d.value("attributes", list(&attrs(app)), list(&attrs(remote)));
    d.value("comment", opt(app.comment.as_deref()), opt(remote.comment.as_deref()));
    d.0
}

fn bucket_deltas(app: &Bucket, remote: &Bucket) -> Vec<FieldDelta> {
    let mut d = Deltas::default();
    d.value("public", app.public, remote.public);
    d.set("allowed_mime_types", &app.allowed_mime_types, &remote.allowed_mime_types);
    let limit = |b: &Bucket| {
        b.file_size_limit
            .map_or_else(|| "null".to_string(), |l| l.to_string())
    };
    d.value("file_size_limit", limit(app), limit(remote));
    d.value("avif_autodetection", app.avif_autodetection, remote.avif_autodetection);
    d.0
}

// =============================================================================
// Protection
// =============================================================================

/// Remote objects owned by the platform; never dropped when undeclared.
pub fn is_protected(resource: &Resource) -> bool {
    match resource {
        Resource::Role(r) => is_platform_role(&r.name),
        Resource::Table(t) => is_protected_schema(&t.schema),
        Resource::Column(c) => is_protected_schema(&c.schema),
        Resource::Type(t) => is_protected_schema(&t.schema),
        Resource::Function(f) => is_protected_schema(&f.schema),
        Resource::Relation(r) => {
            is_protected_schema(&r.source.schema) || is_protected_schema(&r.target.schema)
        }
        Resource::Policy(p) if p.is_storage() => p.bucket.is_none(),
        Resource::Policy(p) => is_protected_schema(&p.schema),
        Resource::Bucket(_) => false,
    }
}

// =============================================================================
// Diff
// =============================================================================

fn diff_collection<E: Keyed>(
    changes: &mut Vec<Change>,
    kind: ResourceKind,
    declared: &Collection<E>,
    remote: &Collection<E>,
    wrap: fn(E) -> Resource,
    deltas: fn(&E, &E) -> Vec<FieldDelta>,
) {
    for app in declared.iter() {
        let identity = app.key();
        match remote.get(&identity) {
            Some(theirs) => {
                let deltas = deltas(app, theirs);
                if !deltas.is_empty() {
                    changes.push(Change {
                        kind,
                        op: ChangeOp::Update,
                        identity,
                        declared: Some(wrap(app.clone())),
                        remote: Some(wrap(theirs.clone())),
                        deltas,
                    });
                }
            }
            None => changes.push(Change {
                kind,
                op: ChangeOp::Create,
                identity,
                declared: Some(wrap(app.clone())),
                remote: None,
                deltas: Vec::new(),
            }),
        }
    }

    for theirs in remote.iter() {
        let identity = theirs.key();
        if declared.contains(&identity) {
            continue;
        }
        let resource = wrap(theirs.clone());
        if is_protected(&resource) {
            debug!(kind = %kind, identity = %identity, "keeping protected remote object");
            continue;
        }
        changes.push(Change {
            kind,
            op: ChangeOp::Drop,
            identity,
            declared: None,
            remote: Some(resource),
            deltas: Vec::new(),
        });
    }
}

fn column_resource(table: &Table, column: &Column) -> Resource {
    Resource::Column(TableColumn {
        schema: table.schema.clone(),
        table: table.name.clone(),
        column: column.clone(),
    })
}

fn diff_columns(changes: &mut Vec<Change>, declared: &ResourceSet, remote: &ResourceSet) {
    let paired: Vec<(&Table, &Table)> = declared
        .tables
        .iter()
        .filter_map(|app| remote.tables.get(&app.key()).map(|theirs| (app, theirs)))
        .collect();

    for (app, theirs) in &paired {
        for column in &app.columns {
            let identity = format!("{}.{}", app.identity(), column.name);
            match theirs.find_column(&column.name) {
                Some(remote_column) => {
                    let deltas = column_deltas(column, remote_column);
                    if !deltas.is_empty() {
                        changes.push(Change {
                            kind: ResourceKind::Column,
                            op: ChangeOp::Update,
                            identity,
                            declared: Some(column_resource(app, column)),
                            remote: Some(column_resource(theirs, remote_column)),
                            deltas,
                        });
                    }
                }
                None => changes.push(Change {
                    kind: ResourceKind::Column,
                    op: ChangeOp::Create,
                    identity,
                    declared: Some(column_resource(app, column)),
                    remote: None,
                    deltas: Vec::new(),
                }),
            }
        }
    }

    for (app, theirs) in &paired {
        for column in theirs.columns.iter().filter(|c| app.find_column(&c.name).is_none()) {
            changes.push(Change {
                kind: ResourceKind::Column,
                op: ChangeOp::Drop,
                identity: format!("{}.{}", theirs.identity(), column.name),
                declared: None,
                remote: Some(column_resource(theirs, column)),
                deltas: Vec::new(),
            });
        }
    }
}

fn no_deltas(_: &Relation, _: &Relation) -> Vec<FieldDelta> {
    Vec::new()
}

/// Compare both sides after restricting them to the context's schemas and
/// selection.
pub fn diff(declared: &ResourceSet, remote: &ResourceSet, ctx: &Context) -> Diff {
    let declared = declared.filtered(ctx);
    let remote = remote.filtered(ctx);
    let mut changes = Vec::new();

    diff_collection(
        &mut changes,
        ResourceKind::Role,
        &declared.roles,
        &remote.roles,
        Resource::Role,
        role_deltas,
    );
    diff_collection(
        &mut changes,
        ResourceKind::Type,
        &declared.types,
        &remote.types,
        Resource::Type,
        type_deltas,
    );
    diff_collection(
        &mut changes,
        ResourceKind::Table,
        &declared.tables,
        &remote.tables,
        Resource::Table,
        table_deltas,
    );
    diff_columns(&mut changes, &declared, &remote);
    diff_collection(
        &mut changes,
        ResourceKind::Relation,
        &declared.relations,
        &remote.relations,
        Resource::Relation,
        no_deltas,
    );
    diff_collection(
        &mut changes,
        ResourceKind::Function,
        &declared.functions,
        &remote.functions,
        Resource::Function,
        function_deltas,
    );
    diff_collection(
        &mut changes,
        ResourceKind::Bucket,
        &declared.buckets,
        &remote.buckets,
        Resource::Bucket,
        bucket_deltas,
    );
    diff_collection(
        &mut changes,
        ResourceKind::Policy,
        &declared.policies,
        &remote.policies,
        Resource::Policy,
        policy_deltas,
    );

    let diff = Diff { changes };
    debug!(
        create = diff.count(ChangeOp::Create),
        update = diff.count(ChangeOp::Update),
        drop = diff.count(ChangeOp::Drop),
        "diff computed"
    );
    diff
}
