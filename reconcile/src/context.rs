//! Run options injected into every pipeline stage.

use std::path::{Path, PathBuf};

use supaform_types::Resource;

/// Schemas reconciled when none are configured.
pub const DEFAULT_SCHEMAS: [&str; 3] = ["public", "storage", "auth"];

/// Directories under `internal/` holding declarations, one per resource group.
pub const SOURCE_DIRS: [&str; 5] = ["models", "roles", "rpc", "storages", "types"];

/// Resource groups a run is restricted to.
///
/// `models` covers tables, columns, relations, user types and table policies;
/// `storages` covers buckets and their policies on `storage.objects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub models: bool,
    pub roles: bool,
    pub rpc: bool,
    pub storages: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self::all()
    }
}

impl Selection {
    pub const fn all() -> Self {
        Self {
            models: true,
            roles: true,
            rpc: true,
            storages: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            models: false,
            roles: false,
            rpc: false,
            storages: false,
        }
    }

    /// Build from `--*-only` flags; no flag at all selects everything.
    pub fn only(models: bool, roles: bool, rpc: bool, storages: bool) -> Self {
        if !(models || roles || rpc || storages) {
            return Self::all();
        }
        Self {
            models,
            roles,
            rpc,
            storages,
        }
    }

    pub fn is_all(&self) -> bool {
        *self == Self::all()
    }

    pub fn includes(&self, resource: &Resource) -> bool {
        match resource {
            Resource::Table(_)
            | Resource::Column(_)
            | Resource::Relation(_)
            | Resource::Type(_) => self.models,
            Resource::Policy(p) if p.is_storage() => self.storages,
            Resource::Policy(_) => self.models,
            Resource::Role(_) => self.roles,
            Resource::Function(_) => self.rpc,
            Resource::Bucket(_) => self.storages,
        }
    }

    /// Whether declarations found under `internal/<dir>` take part in the run.
    pub fn includes_dir(&self, dir: &str) -> bool {
        match dir {
            "models" | "types" => self.models,
            "roles" => self.roles,
            "rpc" => self.rpc,
            "storages" => self.storages,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    pub project_root: PathBuf,
    pub allowed_schemas: Vec<String>,
    pub selection: Selection,
    /// Render the plan instead of applying it
    pub dry_run: bool,
    /// Never overwrite generated-file paths that lack the generated marker
    pub merge_safe: bool,
}

impl Context {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            allowed_schemas: DEFAULT_SCHEMAS.iter().map(|s| s.to_string()).collect(),
            selection: Selection::all(),
            dry_run: false,
            merge_safe: true,
        }
    }

    #[must_use]
    pub fn with_schemas(mut self, schemas: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let schemas: Vec<String> = schemas.into_iter().map(Into::into).collect();
        if !schemas.is_empty() {
            self.allowed_schemas = schemas;
        }
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn merge_safe(mut self, merge_safe: bool) -> Self {
        self.merge_safe = merge_safe;
        self
    }

    pub fn allows_schema(&self, schema: &str) -> bool {
        self.allowed_schemas.iter().any(|s| s == schema)
    }

    /// Whether the resource survives both the schema and the selection filter.
    pub fn admits(&self, resource: &Resource) -> bool {
        self.selection.includes(resource)
            && resource.schema().is_none_or(|schema| self.allows_schema(schema))
    }

    pub fn internal_dir(&self) -> PathBuf {
        self.project_root.join("internal")
    }

    pub fn root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supaform_types::{Bucket, Policy, PolicyCommand, Role, Table};

    #[test]
    fn no_flags_selects_everything() {
        assert!(Selection::only(false, false, false, false).is_all());
        let roles = Selection::only(false, true, false, false);
        assert!(roles.includes(&Resource::Role(Role::new("editor"))));
        assert!(!roles.includes(&Resource::Table(Table::new("public", "courses"))));
    }

    #[test]
    fn storage_policies_follow_storages() {
        let storages = Selection::only(false, false, false, true);
        let bucket_rule = Policy::new("storage", "objects", "avatars_read", PolicyCommand::Select);
        let table_rule = Policy::new("public", "courses", "courses_read", PolicyCommand::Select);
        assert!(storages.includes(&Resource::Policy(bucket_rule)));
        assert!(!storages.includes(&Resource::Policy(table_rule)));
        assert!(storages.includes(&Resource::Bucket(Bucket::new("avatars"))));
    }

    #[test]
    fn schema_filter() {
        let ctx = Context::new(".").with_schemas(["public"]);
        assert!(ctx.admits(&Resource::Table(Table::new("public", "courses"))));
        assert!(!ctx.admits(&Resource::Table(Table::new("auth", "users"))));
        assert!(!ctx.admits(&Resource::Bucket(Bucket::new("avatars"))));
        assert!(ctx.admits(&Resource::Role(Role::new("editor"))));

        let defaults = Context::new(".").with_schemas(Vec::<String>::new());
        assert_eq!(defaults.allowed_schemas, ["public", "storage", "auth"]);
    }
}
