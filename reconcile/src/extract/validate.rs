//! Cross-resource checks on the declared set
//!
//! Materialization checks what a single declaration can get wrong. The
//! checks here need the remote snapshot as well: a policy may target a role
//! or table that only exists remotely.

use supaform_types::Policy;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::grammar::is_platform_role;
use crate::set::ResourceSet;

fn role_exists(name: &str, declared: &ResourceSet, remote: &ResourceSet) -> bool {
    declared.has_role(name) || remote.has_role(name) || is_platform_role(name)
}

fn table_exists(schema: &str, table: &str, declared: &ResourceSet, remote: &ResourceSet) -> bool {
    (schema == "storage" && table == "objects")
        || declared.table(schema, table).is_some()
        || remote.table(schema, table).is_some()
}

fn check_policy(policy: &Policy, declared: &ResourceSet, remote: &ResourceSet) -> Result<()> {
    let identity = policy.identity();
    if !table_exists(&policy.schema, &policy.table, declared, remote) {
        return Err(Error::validation(
            identity,
            format!("table {} does not exist", policy.table_identity()),
        ));
    }
    for role in &policy.roles {
        if role == "public" {
            return Err(Error::validation(
                identity,
                "the `public` role cannot be targeted, list the roles explicitly",
            ));
        }
        if !role_exists(role, declared, remote) {
            return Err(Error::validation(
                identity,
                format!("role `{role}` is neither declared nor present remotely"),
            ));
        }
    }
    Ok(())
}

/// Check the declared set against itself and the remote snapshot.
pub fn validate(declared: &ResourceSet, remote: &ResourceSet, ctx: &Context) -> Result<()> {
    for role in declared.roles.iter() {
        if let Some(parent) = role
            .inherits
            .iter()
            .find(|parent| !role_exists(parent, declared, remote))
        {
            return Err(Error::validation(
                &role.name,
                format!("inherited role `{parent}` is neither declared nor present remotely"),
            ));
        }
    }

    for policy in declared.policies.iter() {
        check_policy(policy, declared, remote)?;
    }

    for relation in declared.relations.iter() {
        let (source, target) = (&relation.source, &relation.target);
        if source.schema != target.schema
            && !(ctx.allows_schema(&source.schema) && ctx.allows_schema(&target.schema))
        {
            return Err(Error::validation(
                relation.identity(),
                format!(
                    "cross-schema foreign key needs both `{}` and `{}` in the allowed schemas",
                    source.schema, target.schema
                ),
            ));
        }
        if !table_exists(&target.schema, &target.table, declared, remote) {
            return Err(Error::validation(
                relation.identity(),
                format!("referenced table {} does not exist", target.table_identity()),
            ));
        }
    }
    Ok(())
}
