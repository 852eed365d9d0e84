//! Configuration for the supaform CLI
//!
//! Handles loading `supaform.yaml`. String values written as `${VAR}` are
//! read from the environment, after `.env` has been loaded.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use supaform_reconcile::{DEFAULT_SCHEMAS, Target};

pub const CONFIG_FILE: &str = "supaform.yaml";

pub const DEFAULT_API_URL: &str = "https://api.supabase.com";

static VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable pattern is valid")
});

// ============================================================================
// Deployment Target
// ============================================================================

/// Where the project's database runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentTarget {
    /// Hosted project, pg-meta reached through the platform API
    #[default]
    Cloud,
    /// pg-meta served directly
    #[serde(alias = "self-hosted")]
    SelfHosted,
}

impl DeploymentTarget {
    pub const ALL: &'static [&'static str] = &["cloud", "self_hosted"];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::SelfHosted => "self_hosted",
        }
    }
}

impl std::fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(Self::Cloud),
            "self_hosted" | "self-hosted" => Ok(Self::SelfHosted),
            other => Err(format!(
                "unknown deployment target '{other}', expected one of: {}",
                Self::ALL.join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    On,
    #[default]
    Off,
}

// ============================================================================
// Configuration
// ============================================================================

/// Contents of `supaform.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub project_name: String,

    #[serde(default)]
    pub deployment_target: DeploymentTarget,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_api_url")]
    pub supabase_api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pg_meta_url: Option<String>,

    #[serde(default = "default_host")]
    pub server_host: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub trace_enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_collector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_collector_endpoint: Option<String>,

    #[serde(default)]
    pub breaker_enable: bool,

    #[serde(default)]
    pub schedule_status: ScheduleStatus,

    /// Empty means the default schemas
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_schemas: Vec<String>,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8002
}
fn default_timeout() -> u64 {
    20
}

impl Config {
    /// A cloud project with every other setting at its default.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            deployment_target: DeploymentTarget::default(),
            access_token: None,
            project_id: None,
            supabase_api_url: default_api_url(),
            pg_meta_url: None,
            server_host: default_host(),
            server_port: default_port(),
            trace_enable: false,
            trace_collector: None,
            trace_collector_endpoint: None,
            breaker_enable: false,
            schedule_status: ScheduleStatus::default(),
            allowed_schemas: Vec::new(),
            request_timeout_secs: default_timeout(),
        }
    }

    /// Load from the default config file
    pub fn load() -> Result<Self, Error> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from specific path
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.into())
            } else {
                Error::Io(path.into(), e)
            }
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, Error> {
        let mut value: Value =
            serde_yaml::from_str(content).map_err(|e| Error::Yaml(path.into(), e))?;
        expand(&mut value, "")?;
        let config: Self = serde_yaml::from_value(value).map_err(|e| Error::Yaml(path.into(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Write as YAML, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        self.validate()?;
        let content = serde_yaml::to_string(self).map_err(|e| Error::Yaml(path.into(), e))?;
        std::fs::write(path, content).map_err(|e| Error::Io(path.into(), e))
    }

    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |key: &'static str, message: &str| Error::Invalid {
            key,
            message: message.into(),
        };

        if self.project_name.trim().is_empty() {
            return Err(invalid("project_name", "must not be empty"));
        }
        if !is_http_url(&self.supabase_api_url) {
            return Err(invalid("supabase_api_url", "must be an http(s) URL"));
        }
        if self.server_port == 0 {
            return Err(invalid("server_port", "must be between 1 and 65535"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        if self.trace_enable && self.trace_collector_endpoint.is_none() {
            return Err(invalid(
                "trace_collector_endpoint",
                "required when trace_enable is true",
            ));
        }
        if self.allowed_schemas.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("allowed_schemas", "schema names must not be empty"));
        }
        self.target().map(|_| ())
    }

    /// pg-meta endpoint for the deployment target
    pub fn target(&self) -> Result<Target, Error> {
        match self.deployment_target {
            DeploymentTarget::Cloud => {
                let project_id = required(&self.project_id, "project_id", "cloud")?;
                let access_token = required(&self.access_token, "access_token", "cloud")?;
                Ok(Target::Cloud {
                    api_url: self.supabase_api_url.clone(),
                    project_id: project_id.to_string(),
                    access_token: access_token.to_string(),
                })
            }
            DeploymentTarget::SelfHosted => {
                let base_url = required(&self.pg_meta_url, "pg_meta_url", "self_hosted")?;
                if !is_http_url(base_url) {
                    return Err(Error::Invalid {
                        key: "pg_meta_url",
                        message: "must be an http(s) URL".into(),
                    });
                }
                Ok(Target::Local {
                    base_url: base_url.to_string(),
                })
            }
        }
    }

    /// Schemas the pipeline may touch
    pub fn schemas(&self) -> Vec<String> {
        if self.allowed_schemas.is_empty() {
            DEFAULT_SCHEMAS.iter().map(|s| s.to_string()).collect()
        } else {
            self.allowed_schemas.clone()
        }
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn required<'a>(
    value: &'a Option<String>,
    key: &'static str,
    target: &str,
) -> Result<&'a str, Error> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Invalid {
            key,
            message: format!("required when deployment_target is {target}"),
        }),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// ============================================================================
// Environment Variables
// ============================================================================

/// Resolve `${VAR}` in every string value. `key` is the dotted path of
/// `value`, used in errors.
fn expand(value: &mut Value, key: &str) -> Result<(), Error> {
    if let Value::String(text) = value {
        if let Some(expanded) = expand_str(text, key)? {
            *value = expanded;
        }
        return Ok(());
    }
    match value {
        Value::Mapping(map) => {
            for (k, v) in map.iter_mut() {
                let name = k.as_str().unwrap_or_default();
                let path = if key.is_empty() {
                    name.to_string()
                } else {
                    format!("{key}.{name}")
                };
                expand(v, &path)?;
            }
        }
        Value::Sequence(items) => {
            for (i, v) in items.iter_mut().enumerate() {
                expand(v, &format!("{key}[{i}]"))?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// A value standing alone as `${VAR}` takes the variable's YAML type, so
/// `server_port: ${PORT}` reads as a number.
fn expand_str(text: &str, key: &str) -> Result<Option<Value>, Error> {
    if !VAR.is_match(text) {
        return Ok(None);
    }
    let mut missing = None;
    let replaced = VAR.replace_all(text, |caps: &Captures<'_>| match std::env::var(&caps[1]) {
        Ok(v) => v,
        Err(_) => {
            missing.get_or_insert_with(|| caps[1].to_string());
            String::new()
        }
    });
    if let Some(var) = missing {
        return Err(Error::MissingVar {
            key: key.to_string(),
            var,
        });
    }
    let replaced = replaced.into_owned();

    let whole = VAR
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len());
    if whole {
        if let Ok(scalar @ (Value::Bool(_) | Value::Number(_))) = serde_yaml::from_str(&replaced) {
            return Ok(Some(scalar));
        }
    }
    Ok(Some(Value::String(replaced)))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{} not found, run `supaform configure` first", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Yaml(PathBuf, #[source] serde_yaml::Error),

    #[error("{key}: environment variable {var} is not set")]
    MissingVar { key: String, var: String },

    #[error("{key}: {message}")]
    Invalid { key: &'static str, message: String },
}

pub type ConfigError = Error;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config, Error> {
        Config::parse(content, Path::new(CONFIG_FILE))
    }

    #[test]
    fn defaults() {
        let cfg = parse(
            r#"
project_name: courses
deployment_target: self_hosted
pg_meta_url: http://localhost:8080
"#,
        )
        .unwrap();
        assert_eq!(cfg.server_host, "127.0.0.1");
        assert_eq!(cfg.server_port, 8002);
        assert_eq!(cfg.supabase_api_url, DEFAULT_API_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.schedule_status, ScheduleStatus::Off);
        assert!(!cfg.trace_enable && !cfg.breaker_enable);
        assert_eq!(cfg.schemas(), ["public", "storage", "auth"]);
        assert_eq!(
            cfg.target().unwrap(),
            Target::Local {
                base_url: "http://localhost:8080".into()
            }
        );
    }

    #[test]
    fn cloud_target() {
        let cfg = parse(
            r#"
project_name: courses
project_id: abcdefgh
access_token: sbp_token
allowed_schemas: [public]
"#,
        )
        .unwrap();
        assert_eq!(cfg.deployment_target, DeploymentTarget::Cloud);
        assert_eq!(cfg.schemas(), ["public"]);
        assert_eq!(
            cfg.target().unwrap(),
            Target::Cloud {
                api_url: DEFAULT_API_URL.into(),
                project_id: "abcdefgh".into(),
                access_token: "sbp_token".into(),
            }
        );
    }

    #[test]
    fn environment_variables() {
        // SAFETY: the variable names are unique to this test
        unsafe {
            std::env::set_var("SUPAFORM_TEST_TOKEN", "sbp_from_env");
            std::env::set_var("SUPAFORM_TEST_PORT", "9000");
        }
        let cfg = parse(
            r#"
project_name: courses
project_id: abcdefgh
access_token: ${SUPAFORM_TEST_TOKEN}
server_port: ${SUPAFORM_TEST_PORT}
server_host: host-${SUPAFORM_TEST_PORT}
"#,
        )
        .unwrap();
        assert_eq!(cfg.access_token.as_deref(), Some("sbp_from_env"));
        assert_eq!(cfg.server_port, 9000);
        assert_eq!(cfg.server_host, "host-9000");
    }

    #[test]
    fn missing_variable_names_the_key() {
        let err = parse(
            r#"
project_name: courses
access_token: ${SUPAFORM_TEST_NEVER_SET}
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "access_token: environment variable SUPAFORM_TEST_NEVER_SET is not set"
        );
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = parse("project_name: courses\n").unwrap_err();
        assert!(matches!(err, Error::Invalid { key: "project_id", .. }));

        let err = parse(
            "project_name: courses\ndeployment_target: self_hosted\npg_meta_url: localhost\n",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "pg_meta_url: must be an http(s) URL");

        let err = parse(
            "project_name: courses\ndeployment_target: self_hosted\npg_meta_url: http://pgmeta\ntrace_enable: true\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Invalid { key: "trace_collector_endpoint", .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("project_name: courses\nproject_idd: x\n").unwrap_err();
        assert!(matches!(err, Error::Yaml(..)));
        assert!(err.to_string().contains("project_idd"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = Config::new("courses");
        cfg.deployment_target = DeploymentTarget::SelfHosted;
        cfg.pg_meta_url = Some("http://localhost:8080".into());
        cfg.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("deployment_target: self_hosted"));
        assert!(!text.contains("access_token"));
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn target_from_str() {
        assert_eq!("self-hosted".parse(), Ok(DeploymentTarget::SelfHosted));
        assert_eq!("Cloud".parse(), Ok(DeploymentTarget::Cloud));
        assert!("lan".parse::<DeploymentTarget>().is_err());
    }
}
