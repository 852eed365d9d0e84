//! Predicates: functions building a [`Clause`](crate::Clause) from values.
//!
//! Every predicate takes `impl Into<Exp>` operands, so plain Rust integers,
//! floats and booleans work directly next to [`ident`](crate::ident) and
//! [`string`](crate::string):
//!
//! ```ignore
//! eq(ident("owner_id"), auth_uid())
//! gt(ident("age"), 18)
//! in_list(ident("role"), [string("admin"), string("editor")])
//! like(ident("name"), contains("50%"))
//! ```

mod cmp;
mod json;
mod null;
mod range;
mod set;
mod string;

pub use cmp::*;
pub use json::*;
pub use null::*;
pub use range::*;
pub use set::*;
pub use string::*;

use crate::clause::Clause;
use crate::exp::Exp;

/// `left op right`
fn binary(left: impl Into<Exp>, op: &str, right: impl Into<Exp>) -> Clause {
    Clause::raw(format!("{} {op} {}", left.into(), right.into()))
}

fn comma_list(items: impl IntoIterator<Item = impl Into<Exp>>) -> Vec<String> {
    items.into_iter().map(|e| e.into().into_sql()).collect()
}
