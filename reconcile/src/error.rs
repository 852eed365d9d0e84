//! Error types for the reconciler

use std::path::PathBuf;

/// Errors raised while introspecting, extracting, validating or applying.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("pg-meta answered {status} for {endpoint}: {body}")]
    Protocol {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("{resource}: {message}")]
    Validation { resource: String, message: String },

    #[error("{action} failed on `{sql}`: {source}")]
    ApplyFailed {
        action: String,
        sql: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category name, printed before the message by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Protocol { .. } => "pg-meta",
            Self::Validation { .. } => "validation",
            Self::ApplyFailed { .. } => "apply",
            Self::Io { .. } => "io",
            Self::Decode { .. } => "decode",
            Self::Parse { .. } => "parse",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_failure_names_the_statement() {
        let err = Error::ApplyFailed {
            action: "create policy public.courses.courses_read".into(),
            sql: "CREATE POLICY ...".into(),
            source: Box::new(Error::Protocol {
                status: 400,
                endpoint: "/query".into(),
                body: "syntax error at or near \"USING\"".into(),
            }),
        };
        assert_eq!(err.kind(), "apply");
        let message = err.to_string();
        assert!(message.starts_with("create policy public.courses.courses_read failed"));
        assert!(message.contains("syntax error"));
    }
}
