//! Error types for the CLI

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reconcile(#[from] supaform_reconcile::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),

    /// A delegated cargo invocation exited unsuccessfully
    #[error("`cargo {command}` exited with {status}")]
    Cargo { command: String, status: String },

    #[error("interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Category printed before the message: `Error: kind: cause`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Reconcile(e) => e.kind(),
            Self::Io { .. } => "io",
            Self::Prompt(_) => "prompt",
            Self::Cargo { .. } => "cargo",
            Self::Interrupted => "interrupted",
            Self::Other(_) => "error",
        }
    }
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_source() {
        let err = CliError::from(ConfigError::NotFound("supaform.yaml".into()));
        assert_eq!(err.kind(), "config");
        assert_eq!(err.to_string(), "supaform.yaml not found, run `supaform configure` first");

        let err = CliError::from(supaform_reconcile::Error::Protocol {
            status: 401,
            endpoint: "/tables".into(),
            body: "unauthorized".into(),
        });
        assert_eq!(err.kind(), "pg-meta");
    }
}
