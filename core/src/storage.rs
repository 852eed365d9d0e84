//! Bucket scoping for policies on `storage.objects`.
//!
//! A bucket rule is stored as a policy whose clause starts with
//! `"bucket_id" = '<bucket>'`. The scope is added on the way out and stripped
//! again when a remote policy is read back.

use crate::clause::Clause;
use crate::exp::{ident, string};
use crate::normalize::{Qualifier, normalize, simplify};
use crate::predicate::eq;
use crate::scan;

fn objects() -> Qualifier {
    Qualifier::new("storage", "objects")
}

/// `"bucket_id" = '<bucket>'`
pub fn bucket_scope(bucket: &str) -> Clause {
    eq(ident("bucket_id"), string(bucket))
}

/// `USING` clause for a bucket rule.
pub fn storage_using(bucket: &str, clause: &Clause) -> Clause {
    scoped(bucket, clause)
}

/// `WITH CHECK` clause for a bucket rule.
pub fn storage_check(bucket: &str, clause: &Clause) -> Clause {
    scoped(bucket, clause)
}

fn scoped(bucket: &str, clause: &Clause) -> Clause {
    let scope = bucket_scope(bucket);
    if clause.is_empty() {
        return scope;
    }

    let q = objects();
    let wanted = normalize(scope.sql(), &q);
    let body = normalize(clause.sql(), &q);
    if scan::split_top_level(&body, "AND")
        .iter()
        .any(|conjunct| conjunct.eq_ignore_ascii_case(&wanted))
    {
        return clause.clone();
    }

    let inner = scan::strip_outer_parens(clause.sql());
    if scan::split_top_level(inner, "OR").len() > 1 {
        Clause::raw(format!("{scope} AND ({inner})"))
    } else {
        Clause::raw(format!("{scope} AND {clause}"))
    }
}

/// Result of [`strip_storage_bucket_filter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedClause {
    /// Rule clause without the scope, empty when nothing else was there.
    pub clause: String,
    /// The clause was an `OR` composition, so the scope could not be
    /// removed from a single conjunction.
    pub mixed_or: bool,
}

/// Remove the bucket scope from a remote policy clause.
///
/// Each top-level `OR` branch loses its scope conjuncts; a branch left empty
/// becomes `TRUE`.
pub fn strip_storage_bucket_filter(clause: &str, bucket: &str) -> StrippedClause {
    let q = objects();
    let scope = normalize(bucket_scope(bucket).sql(), &q);
    let simplified = simplify(clause, &q);
    let branches = scan::split_top_level(&simplified, "OR");
    let mixed_or = branches.len() > 1;

    let rebuilt = branches
        .iter()
        .map(|branch| {
            let kept = scan::split_top_level(scan::strip_outer_parens(branch), "AND")
                .into_iter()
                .filter(|conjunct| {
                    !conjunct.is_empty() && !normalize(conjunct, &q).eq_ignore_ascii_case(&scope)
                })
                .collect::<Vec<_>>();
            match kept.len() {
                0 if mixed_or => "TRUE".to_string(),
                0 => String::new(),
                1 => kept[0].to_string(),
                _ if mixed_or => format!("({})", kept.join(" AND ")),
                _ => kept.join(" AND "),
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    StrippedClause {
        clause: if rebuilt.is_empty() {
            rebuilt
        } else {
            simplify(&rebuilt, &q)
        },
        mixed_or,
    }
}
