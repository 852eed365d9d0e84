//! Keyed resource collections
//!
//! A [`ResourceSet`] is one side of a diff: everything declared locally, or
//! everything read back from pg-meta. Entities keep their insertion order,
//! which is the order changes are reported in.

use std::collections::HashMap;

use supaform_types::{Bucket, Function, PgType, Policy, Relation, Resource, Role, Table};

use crate::context::Context;

/// An entity stored in a [`Collection`], keyed by its identity.
pub trait Keyed: Clone {
    fn key(&self) -> String;
}

macro_rules! keyed_by_identity {
    ($($ty:ty),* $(,)?) => {
        $(impl Keyed for $ty {
            fn key(&self) -> String {
                self.identity()
            }
        })*
    };
}

keyed_by_identity!(Role, PgType, Table, Relation, Function, Bucket, Policy);

// =============================================================================
// Generic Collection
// =============================================================================

/// Insertion-ordered collection with lookup by key.
#[derive(Debug, Clone)]
pub struct Collection<E: Keyed> {
    entities: Vec<E>,
    index: HashMap<String, usize>,
}

impl<E: Keyed> Default for Collection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Keyed> Collection<E> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Push an entity, returns true if inserted, false if duplicate key
    pub fn push(&mut self, entity: E) -> bool {
        let key = entity.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entities.len());
        self.entities.push(entity);
        true
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.index.get(key).map(|&idx| &self.entities[idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut E> {
        self.index.get(key).map(|&idx| &mut self.entities[idx])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn list(&self) -> &[E] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Keep the entities matching a predicate
    pub fn retain(&mut self, predicate: impl Fn(&E) -> bool) {
        self.entities.retain(|e| predicate(e));
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (idx, entity) in self.entities.iter().enumerate() {
            self.index.insert(entity.key(), idx);
        }
    }
}

impl<E: Keyed> FromIterator<E> for Collection<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut out = Self::new();
        for entity in iter {
            out.push(entity);
        }
        out
    }
}

// =============================================================================
// Resource Set
// =============================================================================

/// All resources of one side, per kind. Columns live inside their tables.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    pub roles: Collection<Role>,
    pub types: Collection<PgType>,
    pub tables: Collection<Table>,
    pub relations: Collection<Relation>,
    pub functions: Collection<Function>,
    pub buckets: Collection<Bucket>,
    pub policies: Collection<Policy>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource, returns false if one with the same identity exists.
    ///
    /// A column is added to its table, which must already be present.
    pub fn insert(&mut self, resource: Resource) -> bool {
        match resource {
            Resource::Role(r) => self.roles.push(r),
            Resource::Type(t) => self.types.push(t),
            Resource::Table(t) => self.tables.push(t),
            Resource::Relation(r) => self.relations.push(r),
            Resource::Function(f) => self.functions.push(f),
            Resource::Bucket(b) => self.buckets.push(b),
            Resource::Policy(p) => self.policies.push(p),
            Resource::Column(c) => {
                let key = format!("{}.{}", c.schema, c.table);
                match self.tables.get_mut(&key) {
                    Some(table) if table.find_column(&c.column.name).is_none() => {
                        table.push_column(c.column);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables.get(&format!("{schema}.{name}"))
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }

    /// Every resource except columns, in planner kind order.
    pub fn resources(&self) -> impl Iterator<Item = Resource> + '_ {
        let roles = self.roles.iter().cloned().map(Resource::Role);
        let types = self.types.iter().cloned().map(Resource::Type);
        let tables = self.tables.iter().cloned().map(Resource::Table);
        let relations = self.relations.iter().cloned().map(Resource::Relation);
        let functions = self.functions.iter().cloned().map(Resource::Function);
        let buckets = self.buckets.iter().cloned().map(Resource::Bucket);
        let policies = self.policies.iter().cloned().map(Resource::Policy);
        roles
            .chain(types)
            .chain(tables)
            .chain(relations)
            .chain(functions)
            .chain(buckets)
            .chain(policies)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
            + self.types.len()
            + self.tables.len()
            + self.relations.len()
            + self.functions.len()
            + self.buckets.len()
            + self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restrict to the allowed schemas and the selected resource groups.
    #[must_use]
    pub fn filtered(&self, ctx: &Context) -> Self {
        let mut out = self.clone();
        out.roles.retain(|r| ctx.admits(&Resource::Role(r.clone())));
        out.types.retain(|t| ctx.admits(&Resource::Type(t.clone())));
        out.tables.retain(|t| ctx.admits(&Resource::Table(t.clone())));
        out.relations
            .retain(|r| ctx.admits(&Resource::Relation(r.clone())));
        out.functions
            .retain(|f| ctx.admits(&Resource::Function(f.clone())));
        out.buckets.retain(|b| ctx.admits(&Resource::Bucket(b.clone())));
        out.policies.retain(|p| ctx.admits(&Resource::Policy(p.clone())));
        out
    }
}
