//! Row-level security policies

use serde::{Deserialize, Serialize};

/// FOR clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
    #[default]
    All,
}

impl PolicyCommand {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::All => "ALL",
        }
    }

    /// Whether the command evaluates a USING expression.
    pub const fn has_using(self) -> bool {
        !matches!(self, Self::Insert)
    }

    /// Whether the command evaluates a WITH CHECK expression.
    pub const fn has_check(self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::All)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" | "R" => Some(Self::Select),
            "INSERT" | "A" => Some(Self::Insert),
            "UPDATE" | "W" => Some(Self::Update),
            "DELETE" | "D" => Some(Self::Delete),
            "ALL" | "*" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for PolicyCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AS clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyAction {
    #[default]
    Permissive,
    Restrictive,
}

impl PolicyAction {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "PERMISSIVE",
            Self::Restrictive => "RESTRICTIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERMISSIVE" => Some(Self::Permissive),
            "RESTRICTIVE" => Some(Self::Restrictive),
            _ => None,
        }
    }
}

impl std::fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime policy entity.
///
/// `using` and `check` hold SQL exactly as declared or as reported by pg-meta.
/// Comparison always goes through clause normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub command: PolicyCommand,
    #[serde(default)]
    pub action: PolicyAction,
    /// TO roles
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    /// Storage bucket scoping this policy, for policies on `storage.objects`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

impl Policy {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        command: PolicyCommand,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            command,
            action: PolicyAction::Permissive,
            roles: Vec::new(),
            using: None,
            check: None,
            bucket: None,
        }
    }

    #[must_use]
    pub fn to(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn using(mut self, clause: impl Into<String>) -> Self {
        self.using = Some(clause.into());
        self
    }

    #[must_use]
    pub fn with_check(mut self, clause: impl Into<String>) -> Self {
        self.check = Some(clause.into());
        self
    }

    #[must_use]
    pub fn for_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn is_storage(&self) -> bool {
        self.schema == "storage" && self.table == "objects"
    }

    pub fn table_identity(&self) -> String {
        super::qualified(&self.schema, &self.table)
    }

    pub fn identity(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_clause_sides() {
        assert!(!PolicyCommand::Insert.has_using());
        assert!(PolicyCommand::Insert.has_check());
        assert!(PolicyCommand::Select.has_using());
        assert!(!PolicyCommand::Select.has_check());
        assert!(!PolicyCommand::Delete.has_check());
        assert!(PolicyCommand::Update.has_using() && PolicyCommand::Update.has_check());
    }

    #[test]
    fn parses_pg_meta_spellings() {
        assert_eq!(PolicyCommand::parse("select"), Some(PolicyCommand::Select));
        assert_eq!(PolicyCommand::parse("*"), Some(PolicyCommand::All));
        assert_eq!(PolicyAction::parse("RESTRICTIVE"), Some(PolicyAction::Restrictive));
        assert_eq!(PolicyAction::parse("maybe"), None);
    }

    #[test]
    fn storage_policy_identity() {
        let policy = Policy::new("storage", "objects", "avatars_read", PolicyCommand::Select)
            .to(["authenticated"])
            .for_bucket("avatars");
        assert!(policy.is_storage());
        assert_eq!(policy.identity(), "storage.objects.avatars_read");
        assert_eq!(policy.roles, vec!["authenticated".to_string()]);
    }
}
