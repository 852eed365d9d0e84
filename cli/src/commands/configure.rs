//! Configure command implementation
//!
//! Writes `supaform.yaml`, asking for each setting not given as a flag.
//! With `--non-interactive` the flags and defaults are used as they are.

use std::path::Path;

use inquire::validator::Validation;
use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};

use crate::config::{Config, DeploymentTarget};
use crate::error::{CliError, Result};
use crate::output;

const DEFAULT_PG_META_URL: &str = "http://localhost:8080";

/// Settings that can be given up front
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigureArgs {
    /// Use flags and defaults, never prompt
    #[arg(long)]
    pub non_interactive: bool,

    #[arg(long, value_name = "NAME")]
    pub project_name: Option<String>,

    /// cloud or self_hosted
    #[arg(long = "target", value_name = "TARGET")]
    pub deployment_target: Option<DeploymentTarget>,

    #[arg(long, value_name = "ID")]
    pub project_id: Option<String>,

    /// Platform access token; `${VAR}` is kept as written
    #[arg(long, value_name = "TOKEN")]
    pub access_token: Option<String>,

    #[arg(long, value_name = "URL")]
    pub pg_meta_url: Option<String>,

    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    #[arg(long, value_delimiter = ',', value_name = "SCHEMA")]
    pub schemas: Vec<String>,

    #[arg(long, value_name = "HOST")]
    pub server_host: Option<String>,

    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,
}

/// Write the config file at `path`, refusing to replace one unless `force`.
pub fn run(path: &Path, args: &ConfigureArgs, force: bool) -> Result<()> {
    if path.exists() && !force {
        let replace = !args.non_interactive
            && Confirm::new(&format!("{} already exists. Replace it?", path.display()))
                .with_default(false)
                .prompt()?;
        if !replace {
            return Err(CliError::Other(format!(
                "{} already exists, pass --force to replace it",
                path.display()
            )));
        }
    }

    let default_name = default_project_name(path);
    let config = resolve(args, &default_name)?;
    config.save(path)?;

    println!("{}", output::success(&format!("Created {}", path.display())));
    println!();
    println!("Next steps:");
    println!(
        "  Run {} to pull the remote resources into internal/",
        output::heading("supaform imports")
    );
    Ok(())
}

/// Config from flags, prompting for what is missing unless non-interactive.
pub fn resolve(args: &ConfigureArgs, default_name: &str) -> Result<Config> {
    let interactive = !args.non_interactive;

    let project_name = match &args.project_name {
        Some(name) => name.clone(),
        None if interactive => Text::new("Project name:")
            .with_default(default_name)
            .with_validator(required)
            .prompt()?,
        None => default_name.to_string(),
    };
    let mut config = Config::new(project_name);

    config.deployment_target = match args.deployment_target {
        Some(target) => target,
        None if interactive => Select::new(
            "Deployment target:",
            vec![DeploymentTarget::Cloud, DeploymentTarget::SelfHosted],
        )
        .prompt()?,
        None => DeploymentTarget::default(),
    };

    match config.deployment_target {
        DeploymentTarget::Cloud => {
            config.project_id = match &args.project_id {
                Some(id) => Some(id.clone()),
                None if interactive => Some(
                    Text::new("Project id:")
                        .with_help_message("the reference in your project's dashboard URL")
                        .with_validator(required)
                        .prompt()?,
                ),
                None => None,
            };
            config.access_token = match &args.access_token {
                Some(token) => Some(token.clone()),
                None if interactive => Some(
                    Password::new("Access token:")
                        .with_display_mode(PasswordDisplayMode::Masked)
                        .without_confirmation()
                        .with_help_message("write ${VAR} to read it from the environment")
                        .with_validator(required)
                        .prompt()?,
                ),
                None => None,
            };
            if let Some(url) = &args.api_url {
                config.supabase_api_url = url.clone();
            }
        }
        DeploymentTarget::SelfHosted => {
            config.pg_meta_url = Some(match &args.pg_meta_url {
                Some(url) => url.clone(),
                None if interactive => Text::new("pg-meta URL:")
                    .with_default(DEFAULT_PG_META_URL)
                    .with_validator(required)
                    .prompt()?,
                None => DEFAULT_PG_META_URL.to_string(),
            });
        }
    }

    config.allowed_schemas = if !args.schemas.is_empty() {
        args.schemas.clone()
    } else if interactive {
        let answer = Text::new("Schemas to manage:")
            .with_default(&config.schemas().join(","))
            .prompt()?;
        split_list(&answer)
    } else {
        Vec::new()
    };

    if let Some(host) = &args.server_host {
        config.server_host = host.clone();
    }
    if let Some(port) = args.server_port {
        config.server_port = port;
    }

    config.validate()?;
    Ok(config)
}

/// Name of the directory holding the config file.
fn default_project_name(path: &Path) -> String {
    std::path::absolute(path)
        .ok()
        .and_then(|p| p.parent()?.file_name()?.to_str().map(str::to_string))
        .unwrap_or_else(|| "supaform-app".to_string())
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn required(input: &str) -> std::result::Result<Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid("a value is required".into()))
    } else {
        Ok(Validation::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn flags_only() {
        let args = ConfigureArgs {
            non_interactive: true,
            deployment_target: Some(DeploymentTarget::SelfHosted),
            pg_meta_url: Some("http://pgmeta:8080".into()),
            schemas: vec!["public".into()],
            server_port: Some(9000),
            ..ConfigureArgs::default()
        };
        let config = resolve(&args, "courses").unwrap();
        assert_eq!(config.project_name, "courses");
        assert_eq!(config.pg_meta_url.as_deref(), Some("http://pgmeta:8080"));
        assert_eq!(config.allowed_schemas, ["public"]);
        assert_eq!(config.server_port, 9000);
    }

    #[test]
    fn cloud_needs_credentials() {
        let args = ConfigureArgs {
            non_interactive: true,
            project_id: Some("abcdefgh".into()),
            ..ConfigureArgs::default()
        };
        let err = resolve(&args, "courses").unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::Invalid { key: "access_token", .. })
        ));
    }

    #[test]
    fn lists() {
        assert_eq!(split_list(" public, storage ,,auth"), ["public", "storage", "auth"]);
    }
}
