//! Remote state through pg-meta
//!
//! [`PgMetaApi`] is the seam between the reconciler and the network: the
//! production [`PgMetaClient`] speaks HTTP, tests substitute an in-memory
//! implementation. [`Introspector::snapshot`] reads everything concurrently
//! and folds the rows into a [`ResourceSet`].

pub mod client;
pub mod process;
pub mod queries;
pub mod wire;

use std::future::Future;

use supaform_types::Resource;
use tracing::{debug, info, info_span, Instrument};

use crate::context::Context;
use crate::error::Result;
use crate::set::ResourceSet;

pub use client::{DEFAULT_TIMEOUT, PgMetaClient, Target};
pub use process::{
    bucket_of, process_buckets, process_functions, process_policies, process_roles,
    process_tables, process_types,
};
pub use wire::{
    PgMetaBucket, PgMetaColumn, PgMetaFunction, PgMetaMembership, PgMetaPolicy,
    PgMetaPrimaryKey, PgMetaRelationship, PgMetaRole, PgMetaTable, PgMetaType,
    PgMetaTypeAttribute,
};

/// The pg-meta operations the reconciler needs.
pub trait PgMetaApi: Sync {
    fn tables(&self, schemas: &[String]) -> impl Future<Output = Result<Vec<PgMetaTable>>> + Send;

    fn policies(&self, schemas: &[String])
    -> impl Future<Output = Result<Vec<PgMetaPolicy>>> + Send;

    fn roles(&self) -> impl Future<Output = Result<Vec<PgMetaRole>>> + Send;

    fn role_memberships(&self) -> impl Future<Output = Result<Vec<PgMetaMembership>>> + Send;

    fn functions(
        &self,
        schemas: &[String],
    ) -> impl Future<Output = Result<Vec<PgMetaFunction>>> + Send;

    fn types(&self, schemas: &[String]) -> impl Future<Output = Result<Vec<PgMetaType>>> + Send;

    fn buckets(&self) -> impl Future<Output = Result<Vec<PgMetaBucket>>> + Send;

    /// Run one SQL statement.
    fn query(&self, sql: &str) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

/// Builds remote snapshots.
pub struct Introspector;

impl Introspector {
    /// Read every resource kind concurrently; the first failure cancels the
    /// other requests.
    pub async fn snapshot<A: PgMetaApi>(api: &A, ctx: &Context) -> Result<ResourceSet> {
        let schemas = &ctx.allowed_schemas;
        let storage = ctx.allows_schema("storage");

        async {
            let (tables, policies, roles, memberships, functions, types, buckets) =
                tokio::try_join!(
                    api.tables(schemas),
                    api.policies(schemas),
                    api.roles(),
                    api.role_memberships(),
                    api.functions(schemas),
                    api.types(schemas),
                    async {
                        if storage {
                            api.buckets().await
                        } else {
                            Ok(Vec::new())
                        }
                    },
                )?;
            debug!(
                tables = tables.len(),
                policies = policies.len(),
                roles = roles.len(),
                functions = functions.len(),
                types = types.len(),
                buckets = buckets.len(),
                "pg-meta rows fetched"
            );

            let mut set = ResourceSet::new();
            for t in process_types(&types) {
                set.insert(Resource::Type(t));
            }
            let (tables, relations) = process_tables(&tables);
            for t in tables {
                set.insert(Resource::Table(t));
            }
            for r in relations {
                set.insert(Resource::Relation(r));
            }
            for r in process_roles(&roles, &memberships) {
                set.insert(Resource::Role(r));
            }
            for f in process_functions(&functions) {
                set.insert(Resource::Function(f));
            }
            for b in process_buckets(&buckets) {
                set.insert(Resource::Bucket(b));
            }
            for p in process_policies(&policies) {
                set.insert(Resource::Policy(p));
            }

            info!(resources = set.len(), "remote snapshot ready");
            Ok(set)
        }
        .instrument(info_span!("introspect"))
        .await
    }
}
