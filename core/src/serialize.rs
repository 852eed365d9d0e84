//! Turning a parsed tree back into a clause or into builder source code.

use crate::clause::{self, Clause};
use crate::exp::{self, Exp};
use crate::parse::{KnownCall, Node, Operand};
use crate::predicate;

impl KnownCall {
    pub fn to_exp(&self) -> Exp {
        match self {
            Self::AuthUid => exp::auth_uid(),
            Self::AuthRole => exp::auth_role(),
            Self::AuthJwt => exp::auth_jwt(),
            Self::Now => exp::now(),
            Self::CurrentSetting { key, missing_ok } => exp::current_setting(key, *missing_ok),
        }
    }

    fn to_builder_source(&self) -> String {
        match self {
            Self::AuthUid => "auth_uid()".to_string(),
            Self::AuthRole => "auth_role()".to_string(),
            Self::AuthJwt => "auth_jwt()".to_string(),
            Self::Now => "now()".to_string(),
            Self::CurrentSetting { key, missing_ok } => match missing_ok {
                None => format!("current_setting({key:?}, None)"),
                Some(flag) => format!("current_setting({key:?}, Some({flag}))"),
            },
        }
    }
}

impl Operand {
    pub fn to_exp(&self) -> Exp {
        match self {
            Self::Ident(path) => exp::ident(path),
            Self::Str(value) => exp::string(value),
            Self::Int(value) => exp::int(*value),
            Self::Bool(value) => exp::boolean(*value),
            Self::Call(call) => call.to_exp(),
        }
    }

    pub fn to_builder_source(&self) -> String {
        match self {
            Self::Ident(path) => format!("ident({path:?})"),
            Self::Str(value) => format!("string({value:?})"),
            Self::Int(value) => format!("int({value})"),
            Self::Bool(value) => format!("boolean({value})"),
            Self::Call(call) => call.to_builder_source(),
        }
    }
}

impl Node {
    /// Rebuild the clause through the builders.
    pub fn to_clause(&self) -> Clause {
        match self {
            Self::And(nodes) => clause::and(nodes.iter().map(Node::to_clause)),
            Self::Or(nodes) => clause::or(nodes.iter().map(Node::to_clause)),
            Self::Not(inner) => clause::not(inner.to_clause()),
            Self::Eq(lhs, rhs) => predicate::eq(lhs.to_exp(), rhs.to_exp()),
            Self::Bool(true) => Clause::always(),
            Self::Bool(false) => Clause::never(),
            Self::Raw(sql) => Clause::raw(sql),
        }
    }

    /// Rust expression that builds this clause, for generated source.
    ///
    /// ```ignore
    /// eq(ident("owner_id"), auth_uid())
    /// and([eq(ident("a"), int(1)), Clause::always()])
    /// ```
    pub fn to_builder_source(&self) -> String {
        match self {
            Self::And(nodes) => format!("and([{}])", list(nodes)),
            Self::Or(nodes) => format!("or([{}])", list(nodes)),
            Self::Not(inner) => format!("not({})", inner.to_builder_source()),
            Self::Eq(lhs, rhs) => format!(
                "eq({}, {})",
                lhs.to_builder_source(),
                rhs.to_builder_source()
            ),
            Self::Bool(true) => "Clause::always()".to_string(),
            Self::Bool(false) => "Clause::never()".to_string(),
            Self::Raw(sql) => format!("Clause::raw({sql:?})"),
        }
    }
}

fn list(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(Node::to_builder_source)
        .collect::<Vec<_>>()
        .join(", ")
}
