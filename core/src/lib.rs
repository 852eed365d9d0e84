//! Clause algebra for Postgres row level security
//!
//! Builds the SQL fragments that go into `USING (...)` and `WITH CHECK (...)`
//! of a policy, and reads them back:
//!
//! - [`exp`] and [`predicate`] build values and boolean predicates with
//!   literals and identifiers escaped,
//! - [`clause`] combines them with `AND`, `OR` and `NOT`,
//! - [`normalize`] maps a clause to the canonical text used for comparison,
//! - [`parse`] and [`serialize`] turn clause text into a [`Node`] tree and
//!   back into a clause or into builder source code,
//! - [`storage`] adds and strips the bucket scope of storage policies.
//!
//! Nothing in this crate performs I/O or returns errors.

pub mod clause;
pub mod exp;
pub mod normalize;
pub mod parse;
pub mod predicate;
mod scan;
pub mod serialize;
pub mod storage;

pub use clause::{Clause, and, not, or};
pub use exp::{
    Exp, auth_jwt, auth_role, auth_uid, boolean, cast, current_setting, double, func, ident, int,
    now, null, quote_ident, quote_literal, raw, string, uint,
};
pub use normalize::{Qualifier, normalize, normalized_eq, simplify};
pub use parse::{KnownCall, Node, Operand, Parsed, parse};
pub use predicate::*;
pub use scan::{is_wrapped, map_code, split_top_level, strip_outer_parens};
pub use storage::{
    StrippedClause, bucket_scope, storage_check, storage_using, strip_storage_bucket_filter,
};
