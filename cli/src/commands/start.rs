//! Start command implementation
//!
//! Lays out a new project: a binary crate depending on `supaform`, the
//! `internal/` resource directories with their module files, and
//! `supaform.yaml`.

use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use supaform_reconcile::{Context, SOURCE_DIRS};

use super::configure::{self, ConfigureArgs};
use super::print_files;
use crate::config::CONFIG_FILE;
use crate::error::{CliError, Result};
use crate::output;

pub fn run(name: &str, dir: Option<&Path>, args: &ConfigureArgs) -> Result<()> {
    let root = dir.map_or_else(|| PathBuf::from(name), Path::to_path_buf);
    if is_occupied(&root)? {
        return Err(CliError::Other(format!(
            "{} already exists and is not empty",
            root.display()
        )));
    }

    let mut args = args.clone();
    args.project_name.get_or_insert_with(|| name.to_string());
    let config = configure::resolve(&args, name)?;

    let crate_name = name.to_snake_case();
    write(&root.join("Cargo.toml"), &cargo_toml(&crate_name))?;
    write(&root.join("src").join("main.rs"), MAIN_RS)?;
    write(&root.join(".gitignore"), GITIGNORE)?;
    for dir in SOURCE_DIRS {
        let path = root.join("internal").join(dir);
        std::fs::create_dir_all(&path).map_err(|e| CliError::io(&path, e))?;
    }
    config.save(&root.join(CONFIG_FILE))?;

    let outcome = supaform_reconcile::generate(&Context::new(&root))?;

    println!(
        "{}",
        output::success(&format!("Created project {} in {}", name, root.display()))
    );
    println!("  {:<12} Cargo.toml", output::success("written"));
    println!("  {:<12} src/main.rs", output::success("written"));
    println!("  {:<12} {CONFIG_FILE}", output::success("written"));
    print_files(&outcome.files, false);
    println!();
    println!("Next steps:");
    println!("  cd {}", root.display());
    println!(
        "  Run {} to pull the remote resources into internal/",
        output::heading("supaform imports")
    );
    Ok(())
}

fn is_occupied(root: &Path) -> Result<bool> {
    match std::fs::read_dir(root) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CliError::io(root, e)),
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CliError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| CliError::io(path, e))
}

fn cargo_toml(crate_name: &str) -> String {
    format!(
        r#"[package]
name = "{crate_name}"
version = "0.1.0"
edition = "2024"

[dependencies]
supaform = "{version}"
serde = {{ version = "1.0", features = ["derive"] }}
"#,
        version = env!("CARGO_PKG_VERSION")
    )
}

const MAIN_RS: &str = r#"#[path = "../internal/mod.rs"]
mod internal;

fn main() {
    let declarations = internal::bootstrap::declarations();
    println!("{} resources declared", declarations.len());
    for declaration in &declarations {
        println!("  {} {}", declaration.attribute(), declaration.struct_name());
    }
}
"#;

const GITIGNORE: &str = "/target\n.env\n";
