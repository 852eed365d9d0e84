//! Shared type definitions for supaform
//!
//! This crate provides the data shared by the derive macros, the reconciler
//! and the generated project code:
//!
//! - [`resource`] - the Supabase resources the reconciler manages
//!   (tables, columns, relations, policies, roles, functions, types, buckets)
//! - [`tags`] - the `key:value;flag` directive grammar used by `column`,
//!   `join` and `param` attributes
//! - [`decl`] - raw declaration records produced from annotated structs,
//!   either by the `#[derive(...)]` macros or by parsing source files

pub mod decl;
pub mod resource;
pub mod tags;

pub use decl::{
    AttrValue, BucketDecl, DeclError, Declaration, Declared, FieldDecl, ModelDecl, ParamDecl,
    RoleDecl, RpcDecl, TypeDecl,
};
pub use resource::{
    Behavior, Bucket, Column, ColumnRef, Function, FunctionParam, ModelBinding, PgType, Policy,
    PolicyAction, PolicyCommand, Relation, RelationKind, Resource, ResourceKind, ReturnColumn,
    ReturnType, Role, Security, Table, TableColumn, TypeAttribute, split_top_level_commas,
};
pub use tags::{ColumnTag, JoinTag, ParamTag, TagError};

/// Prelude module for commonly used types
pub mod prelude {
    pub use crate::decl::{Declaration, Declared};
    pub use crate::resource::{Resource, ResourceKind};
}
