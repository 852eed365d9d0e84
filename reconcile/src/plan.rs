//! Ordering changes into executable actions
//!
//! Creates and updates run first, parents before dependents; drops follow
//! in reverse dependency order:
//!
//! ```text
//! roles -> types -> tables -> columns -> relations -> rls -> functions -> buckets -> policies
//! policies -> buckets -> functions -> relations -> columns -> tables -> types -> roles
//! ```

use std::collections::HashSet;
use std::fmt::Write;

use serde::Serialize;
use supaform_types::{Resource, ResourceKind, Role};

use crate::diff::{Change, ChangeOp, Diff, FieldDelta};
use crate::statements as sql;

/// One planned change and the statements that carry it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub kind: ResourceKind,
    pub op: ChangeOp,
    pub identity: String,
    pub description: String,
    pub deltas: Vec<FieldDelta>,
    pub statements: Vec<String>,
}

impl Action {
    fn sign(&self) -> char {
        match self.op {
            ChangeOp::Create => '+',
            ChangeOp::Update => '~',
            ChangeOp::Drop => '-',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Every statement in execution order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.actions
            .iter()
            .flat_map(|a| a.statements.iter().map(String::as_str))
    }

    /// The dry-run report.
    ///
    /// ```text
    /// + create table public.courses
    /// ~ update policy public.courses.courses_update
    ///     app:    using = (owner_id = auth.uid())
    ///     remote: using = TRUE
    /// ```
    pub fn render(&self) -> String {
        if self.actions.is_empty() {
            return "No changes.\n".to_string();
        }
        let mut out = String::new();
        for action in &self.actions {
            let _ = writeln!(out, "{} {}", action.sign(), action.description);
            for delta in &action.deltas {
                let _ = writeln!(out, "    app:    {} = {}", delta.field, delta.app);
                let _ = writeln!(out, "    remote: {} = {}", delta.field, delta.remote);
            }
        }
        out
    }
}

// =============================================================================
// Phases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Kind(ResourceKind),
    RowLevelSecurity,
}

const FORWARD: [Phase; 9] = [
    Phase::Kind(ResourceKind::Role),
    Phase::Kind(ResourceKind::Type),
    Phase::Kind(ResourceKind::Table),
    Phase::Kind(ResourceKind::Column),
    Phase::Kind(ResourceKind::Relation),
    Phase::RowLevelSecurity,
    Phase::Kind(ResourceKind::Function),
    Phase::Kind(ResourceKind::Bucket),
    Phase::Kind(ResourceKind::Policy),
];

const REVERSE: [ResourceKind; 8] = [
    ResourceKind::Policy,
    ResourceKind::Bucket,
    ResourceKind::Function,
    ResourceKind::Relation,
    ResourceKind::Column,
    ResourceKind::Table,
    ResourceKind::Type,
    ResourceKind::Role,
];

/// Roles whose inherited parents come first. Ties keep input order and
/// members of a cycle are appended as they were.
fn order_roles(changes: Vec<&Change>) -> Vec<&Change> {
    let (roles, others): (Vec<&Change>, Vec<&Change>) = changes
        .into_iter()
        .partition(|c| matches!(c.declared, Some(Resource::Role(_))));
    let parents = |change: &Change| -> Vec<String> {
        match &change.declared {
            Some(Resource::Role(Role { inherits, .. })) => inherits.clone(),
            _ => Vec::new(),
        }
    };
    let pending: HashSet<&str> = roles.iter().map(|c| c.identity.as_str()).collect();

    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(roles.len());
    let mut remaining = roles;
    loop {
        let next = remaining.iter().position(|change| {
            parents(change)
                .iter()
                .all(|p| !pending.contains(p.as_str()) || placed.contains(p))
        });
        match next {
            Some(index) => {
                let change = remaining.remove(index);
                placed.insert(change.identity.clone());
                ordered.push(change);
            }
            None => break,
        }
    }
    ordered.extend(remaining);
    ordered.extend(others);
    ordered
}

// =============================================================================
// Actions
// =============================================================================

fn action(change: &Change, statements: Vec<String>) -> Action {
    Action {
        kind: change.kind,
        op: change.op,
        identity: change.identity.clone(),
        description: format!("{} {} {}", change.op, change.kind, change.identity),
        deltas: change.deltas.clone(),
        statements,
    }
}

/// Statements for a change in its own kind's phase.
fn statements(change: &Change) -> Vec<String> {
    use Resource as R;

    match (change.op, &change.declared, &change.remote) {
        (ChangeOp::Create, Some(declared), _) => match declared {
            R::Role(r) => sql::create_role(r),
            R::Type(t) => sql::create_type(t),
            R::Table(t) => sql::create_table(t),
            R::Column(c) => sql::add_column(c),
            R::Relation(r) => sql::add_foreign_key(r),
            R::Function(f) => sql::create_function(f),
            R::Bucket(b) => sql::insert_bucket(b),
            R::Policy(p) => sql::create_policy(p),
        },
        (ChangeOp::Update, Some(declared), Some(remote)) => {
            let deltas = change.deltas.as_slice();
            match (declared, remote) {
                (R::Role(a), R::Role(r)) => sql::alter_role(a, r, deltas),
                (R::Type(a), R::Type(r)) => sql::alter_type(a, r, deltas),
                (R::Table(a), R::Table(_)) => sql::alter_table(a, deltas),
                (R::Column(a), R::Column(r)) => sql::alter_column(a, r, deltas),
                (R::Function(a), R::Function(r)) => sql::replace_function(a, r, deltas),
                (R::Bucket(a), R::Bucket(_)) => sql::update_bucket(a),
                (R::Policy(a), R::Policy(r)) => sql::alter_policy(a, r, deltas),
                _ => Vec::new(),
            }
        }
        (ChangeOp::Drop, _, Some(remote)) => match remote {
            R::Role(r) => sql::drop_role(r),
            R::Type(t) => sql::drop_type(t),
            R::Table(t) => sql::drop_table(t),
            R::Column(c) => sql::drop_column(c),
            R::Relation(r) => sql::drop_foreign_key(r),
            R::Function(f) => sql::drop_function(f),
            R::Bucket(b) => sql::delete_bucket(b),
            R::Policy(p) => sql::drop_policy(p),
        },
        _ => Vec::new(),
    }
}

fn is_rls_delta(delta: &FieldDelta) -> bool {
    matches!(delta.field.as_str(), "rls_enabled" | "rls_forced")
}

/// Table changes split in two: structure in the table phase, the row level
/// security switches in their own phase once relations are in place.
fn table_action(change: &Change) -> Option<Action> {
    let mut action = action(change, statements(change));
    action.deltas.retain(|d| !is_rls_delta(d));
    (change.op != ChangeOp::Update || !action.deltas.is_empty()).then_some(action)
}

fn rls_action(change: &Change) -> Option<Action> {
    let Some(Resource::Table(app)) = &change.declared else {
        return None;
    };
    let remote = match &change.remote {
        Some(Resource::Table(remote)) => Some(remote),
        _ => None,
    };
    let statements = sql::row_level_security(app, remote);
    if statements.is_empty() {
        return None;
    }
    let verb = if remote.is_some() { "alter" } else { "enable" };
    Some(Action {
        kind: ResourceKind::Table,
        op: change.op,
        identity: change.identity.clone(),
        description: format!("{verb} row level security on {}", change.identity),
        deltas: change.deltas.iter().filter(|d| is_rls_delta(d)).cloned().collect(),
        statements,
    })
}

/// Order a diff into actions. Equal diffs give equal plans.
pub fn plan(diff: &Diff) -> Plan {
    let mut actions = Vec::new();

    for phase in FORWARD {
        let forward = |c: &&Change| c.op != ChangeOp::Drop;
        match phase {
            Phase::RowLevelSecurity => {
                actions.extend(
                    diff.iter()
                        .filter(forward)
                        .filter(|c| c.kind == ResourceKind::Table)
                        .filter_map(rls_action),
                );
            }
            Phase::Kind(ResourceKind::Role) => {
                let roles: Vec<&Change> = diff
                    .iter()
                    .filter(forward)
                    .filter(|c| c.kind == ResourceKind::Role)
                    .collect();
                actions.extend(order_roles(roles).into_iter().map(|c| action(c, statements(c))));
            }
            Phase::Kind(ResourceKind::Table) => {
                actions.extend(
                    diff.iter()
                        .filter(forward)
                        .filter(|c| c.kind == ResourceKind::Table)
                        .filter_map(table_action),
                );
            }
            Phase::Kind(kind) => {
                actions.extend(
                    diff.iter()
                        .filter(forward)
                        .filter(|c| c.kind == kind)
                        .map(|c| action(c, statements(c))),
                );
            }
        }
    }

    for kind in REVERSE {
        actions.extend(
            diff.iter()
                .filter(|c| c.op == ChangeOp::Drop && c.kind == kind)
                .map(|c| action(c, statements(c))),
        );
    }

    actions.retain(|a| !a.statements.is_empty() || !a.deltas.is_empty());
    Plan { actions }
}
