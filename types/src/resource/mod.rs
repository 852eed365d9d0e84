//! Resources managed by the reconciler
//!
//! Every resource kind carries an identity used to pair the declared and the
//! remote side of a diff. Identities are rendered as dotted strings so that
//! change lists and reports stay readable.

mod bucket;
mod function;
mod pg_type;
mod policy;
mod relation;
mod role;
mod table;

pub use bucket::Bucket;
pub use function::{
    Behavior, Function, FunctionParam, ModelBinding, ReturnColumn, ReturnType, Security,
    split_top_level_commas,
};
pub use pg_type::{PgType, TypeAttribute};
pub use policy::{Policy, PolicyAction, PolicyCommand};
pub use relation::{Relation, RelationKind};
pub use role::Role;
pub use table::{Column, ColumnRef, Table, TableColumn};

use serde::{Deserialize, Serialize};

/// The resource kinds, in the order the planner creates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Role,
    Type,
    Table,
    Column,
    Relation,
    Function,
    Bucket,
    Policy,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        Self::Role,
        Self::Type,
        Self::Table,
        Self::Column,
        Self::Relation,
        Self::Function,
        Self::Bucket,
        Self::Policy,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Type => "type",
            Self::Table => "table",
            Self::Column => "column",
            Self::Relation => "relation",
            Self::Function => "function",
            Self::Bucket => "bucket",
            Self::Policy => "policy",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resource of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Role(Role),
    Type(PgType),
    Table(Table),
    Column(TableColumn),
    Relation(Relation),
    Function(Function),
    Bucket(Bucket),
    Policy(Policy),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Role(_) => ResourceKind::Role,
            Self::Type(_) => ResourceKind::Type,
            Self::Table(_) => ResourceKind::Table,
            Self::Column(_) => ResourceKind::Column,
            Self::Relation(_) => ResourceKind::Relation,
            Self::Function(_) => ResourceKind::Function,
            Self::Bucket(_) => ResourceKind::Bucket,
            Self::Policy(_) => ResourceKind::Policy,
        }
    }

    pub fn identity(&self) -> String {
        match self {
            Self::Role(r) => r.identity(),
            Self::Type(t) => t.identity(),
            Self::Table(t) => t.identity(),
            Self::Column(c) => c.identity(),
            Self::Relation(r) => r.identity(),
            Self::Function(f) => f.identity(),
            Self::Bucket(b) => b.identity(),
            Self::Policy(p) => p.identity(),
        }
    }

    /// Schema the resource lives in, if it is schema-scoped.
    pub fn schema(&self) -> Option<&str> {
        match self {
            Self::Role(_) => None,
            Self::Bucket(_) => Some("storage"),
            Self::Type(t) => Some(&t.schema),
            Self::Table(t) => Some(&t.schema),
            Self::Column(c) => Some(&c.schema),
            Self::Relation(r) => Some(&r.source.schema),
            Self::Function(f) => Some(&f.schema),
            Self::Policy(p) => Some(&p.schema),
        }
    }
}

/// `schema.name`, the dotted identity shared by schema-scoped resources.
pub(crate) fn qualified(schema: &str, name: &str) -> String {
    format!("{schema}.{name}")
}
