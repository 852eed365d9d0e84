//! Derive macros for supaform declarations
//!
//! Each derive reads the item attribute named after the resource kind and
//! implements `supaform::types::Declared`:
//!
//! | Derive | Item attribute | Field attributes |
//! |---|---|---|
//! | `Model` | `#[model(...)]` | `#[column("...")]`, `#[join("...")]` |
//! | `Rpc` | `#[rpc(...)]` | `#[param("...")]` |
//! | `Role` | `#[role(...)]` | |
//! | `Bucket` | `#[bucket(...)]` | |
//! | `PgType` | `#[pg_type(...)]` | |

extern crate proc_macro;

mod attrs;
mod declare;
mod paths;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

fn expand(input: TokenStream, derive_name: &str) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match declare::derive(input, derive_name) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// A table with its columns, relations and RLS policies.
///
/// ```ignore
/// #[derive(Model)]
/// #[model(table = "courses", read = "anon,authenticated", write = "owner",
///         writeUsing = "owner_id = auth.uid()")]
/// pub struct Courses {
///     #[column("name:id;type:bigint;primaryKey;autoIncrement")]
///     pub id: i64,
///     #[join("joinType:hasMany;primaryKey:id;foreignKey:course_id")]
///     pub lessons: Vec<Lessons>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model, column, join))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    expand(input, "Model")
}

/// A Postgres function; every named field is a parameter.
#[proc_macro_derive(Rpc, attributes(rpc, param))]
pub fn derive_rpc(input: TokenStream) -> TokenStream {
    expand(input, "Rpc")
}

#[proc_macro_derive(Role, attributes(role))]
pub fn derive_role(input: TokenStream) -> TokenStream {
    expand(input, "Role")
}

/// A storage bucket and the access rules of its objects.
#[proc_macro_derive(Bucket, attributes(bucket))]
pub fn derive_bucket(input: TokenStream) -> TokenStream {
    expand(input, "Bucket")
}

/// An enum or composite type.
#[proc_macro_derive(PgType, attributes(pg_type))]
pub fn derive_pg_type(input: TokenStream) -> TokenStream {
    expand(input, "PgType")
}
