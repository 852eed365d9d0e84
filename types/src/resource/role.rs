use serde::{Deserialize, Serialize};

/// Role entity with its capability flags and inherited roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    pub connection_limit: i32,
    pub inherit: bool,
    /// Roles this role is a member of
    #[serde(default)]
    pub inherits: Vec<String>,
    #[serde(default)]
    pub replication: bool,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default)]
    pub bypass_rls: bool,
    #[serde(default)]
    pub can_create_db: bool,
    #[serde(default)]
    pub can_create_role: bool,
    #[serde(default)]
    pub can_login: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
}

impl Role {
    pub const DEFAULT_CONNECTION_LIMIT: i32 = 60;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_limit: Self::DEFAULT_CONNECTION_LIMIT,
            inherit: true,
            inherits: Vec::new(),
            replication: false,
            superuser: false,
            bypass_rls: false,
            can_create_db: false,
            can_create_role: false,
            can_login: false,
            valid_until: None,
        }
    }

    #[must_use]
    pub fn inheriting(mut self, parents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inherits = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn identity(&self) -> String {
        self.name.clone()
    }
}
