//! Log subscriber setup

use tracing_subscriber::EnvFilter;

/// Directives used with `--verbose`.
const VERBOSE: &str = "warn,supaform_reconcile=debug,supaform_cli=debug";

/// Directives used when `RUST_LOG` is unset.
const QUIET: &str = "warn";

/// Install the global subscriber. Logs go to stderr; stdout carries
/// command output only.
///
/// `--verbose` wins over `RUST_LOG`.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(QUIET))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
