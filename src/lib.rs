//! # supaform
//!
//! Declarative Supabase resources for Rust: tables, RLS policies, functions,
//! roles, storage buckets and types are written as annotated structs under
//! `internal/` and kept in sync with the database through pg-meta.
//!
//! ## Quick Start
//!
//! ```ignore
//! use supaform::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! #[model(table = "courses", read = "anon,authenticated", write = "owner")]
//! pub struct Courses {
//!     #[column("primaryKey;autoIncrement")]
//!     pub id: i64,
//!     pub title: String,
//!     pub owner_id: Option<Uuid>,
//! }
//!
//! impl Courses {
//!     pub fn write_using() -> Clause {
//!         eq(ident("owner_id"), auth_uid())
//!     }
//! }
//!
//! let declaration = Courses::declaration();
//! assert_eq!(declaration.struct_name(), "Courses");
//! ```
//!
//! ## Crates
//!
//! | Crate | Re-exported as | Contents |
//! |---|---|---|
//! | `supaform-types` | [`types`] | Resource model, declaration records, tag grammar |
//! | `supaform-core` | [`clause`] | Clause builders, normalizer, parser |
//! | `supaform-macros` | [`prelude`] | `Model`, `Rpc`, `Role`, `Bucket`, `PgType` derives |
//! | `supaform-reconcile` | `reconcile` | Introspection, diffing, planning, code generation (feature `reconcile`) |

// Generated impls name `::supaform::...`, also from inside this crate's tests.
extern crate self as supaform;

// =============================================================================
// Root-level exports
// =============================================================================

/// Resource model and declaration records.
pub use supaform_types as types;

/// Clause algebra for `USING` and `WITH CHECK` expressions.
pub use supaform_core as clause;

pub use supaform_types::{Declaration, Declared};

/// Introspection, diffing, planning and code generation against pg-meta.
#[cfg(feature = "reconcile")]
pub use supaform_reconcile as reconcile;

#[doc(hidden)]
pub use serde;

// =============================================================================
// Prelude
// =============================================================================

/// Everything a file under `internal/` uses.
pub mod prelude {
    // Derives for declarations
    pub use supaform_macros::{Bucket, Model, PgType, Rpc, Role};
    pub use serde::{Deserialize, Serialize};

    pub use supaform_types::{Declaration, Declared};

    // Clause builders
    pub use supaform_core::predicate::*;
    pub use supaform_core::{
        Clause, Exp, and, auth_jwt, auth_role, auth_uid, boolean, cast, current_setting, double,
        func, ident, int, not, now, null, or, raw, string, uint,
    };

    // Column value types
    pub use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    pub use serde_json::Value;
    pub use uuid::Uuid;
}

// =============================================================================
// Tests
// =============================================================================
