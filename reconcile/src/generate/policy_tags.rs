//! `read`/`write` tags recovered from remote policies
//!
//! The four commands fold back into the two role lists and three clauses a
//! model or bucket declares:
//!
//! | tag          | taken from                          |
//! |--------------|-------------------------------------|
//! | `read`       | roles of SELECT policies            |
//! | `write`      | roles of INSERT, UPDATE and DELETE  |
//! | `readUsing`  | SELECT `USING`                      |
//! | `writeCheck` | INSERT `WITH CHECK`, else UPDATE's  |
//! | `writeUsing` | UPDATE `USING`, else DELETE's       |
//!
//! An `ALL` policy counts for every command.

use std::collections::BTreeSet;

use supaform_core::{Qualifier, parse, simplify, strip_outer_parens, strip_storage_bucket_filter};
use supaform_types::{Policy, PolicyAction, PolicyCommand};

/// What the rules are attached to.
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    Table { schema: &'a str, table: &'a str },
    Bucket(&'a str),
}

impl Owner<'_> {
    fn describe(&self) -> String {
        match self {
            Self::Table { schema, table } => format!("table {schema}.{table}"),
            Self::Bucket(bucket) => format!("bucket {bucket}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTags {
    pub read: Vec<String>,
    pub write: Vec<String>,
    pub read_using: Option<String>,
    pub write_check: Option<String>,
    pub write_using: Option<String>,
}

impl RuleTags {
    /// `(function name, clause)` for every clause that maps onto builder calls.
    pub fn builders(&self) -> Vec<(&'static str, &str)> {
        [
            ("read_using", self.read_using.as_deref()),
            ("write_check", self.write_check.as_deref()),
            ("write_using", self.write_using.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, clause)| clause.map(|c| (name, c)))
        .filter(|(_, clause)| parse(clause).reducible)
        .collect()
    }
}

fn covers(policy: &Policy, command: PolicyCommand) -> bool {
    policy.command == command || policy.command == PolicyCommand::All
}

/// Tags for the policies attached to `owner`.
pub fn rule_tags(policies: &[&Policy], owner: Owner<'_>, warnings: &mut Vec<String>) -> RuleTags {
    let mut usable = Vec::new();
    for policy in policies {
        if policy.action == PolicyAction::Restrictive {
            warnings.push(format!(
                "policy {} is restrictive and cannot be expressed as read/write tags, skipped",
                policy.identity()
            ));
            continue;
        }
        usable.push(*policy);
    }

    let roles = |commands: &[PolicyCommand], warnings: &mut Vec<String>| {
        let mut out = BTreeSet::new();
        for policy in usable.iter().filter(|p| commands.iter().any(|c| covers(p, *c))) {
            for role in &policy.roles {
                if role == "public" {
                    warnings.push(format!(
                        "policy {} targets `public`, list its roles explicitly",
                        policy.identity()
                    ));
                } else {
                    out.insert(role.clone());
                }
            }
        }
        out.into_iter().collect::<Vec<_>>()
    };
    let first = |command: PolicyCommand, using: bool| {
        usable
            .iter()
            .find(|p| p.command == command)
            .or_else(|| usable.iter().find(|p| p.command == PolicyCommand::All))
            .and_then(|p| if using { p.using.as_deref() } else { p.check.as_deref() })
    };

    let read = roles(&[PolicyCommand::Select], warnings);
    let write = roles(
        &[PolicyCommand::Insert, PolicyCommand::Update, PolicyCommand::Delete],
        warnings,
    );
    let mut tag = |clause: Option<&str>| tag_clause(clause, owner, warnings);

    RuleTags {
        read_using: if read.is_empty() {
            None
        } else {
            tag(first(PolicyCommand::Select, true))
        },
        write_check: if write.is_empty() {
            None
        } else {
            tag(first(PolicyCommand::Insert, false).or(first(PolicyCommand::Update, false)))
        },
        write_using: if write.is_empty() {
            None
        } else {
            tag(first(PolicyCommand::Update, true).or(first(PolicyCommand::Delete, true)))
        },
        read,
        write,
    }
}

/// The clause as a tag value; `None` when it is empty or `TRUE`.
fn tag_clause(
    clause: Option<&str>,
    owner: Owner<'_>,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let clause = clause?.trim();
    if clause.is_empty() {
        return None;
    }
    let text = match owner {
        Owner::Table { schema, table } => simplify(clause, &Qualifier::new(schema, table)),
        Owner::Bucket(bucket) => {
            let stripped = strip_storage_bucket_filter(clause, bucket);
            if stripped.mixed_or {
                warnings.push(format!(
                    "storage rule `{clause}` of {} is OR-composed; the bucket scope is re-applied to the whole clause",
                    owner.describe()
                ));
            }
            stripped.clause
        }
    };
    let text = strip_outer_parens(&text).trim();
    (!text.is_empty() && !text.eq_ignore_ascii_case("TRUE")).then(|| text.to_string())
}
