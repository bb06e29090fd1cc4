//! Tracing bootstrap for the command-line client.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,docuintel=debug";
const QUIET_FILTER: &str = "warn";

/// Install the global subscriber, writing to stderr.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `DOCUINTEL_LOG`
/// 3) built-in default (`verbose` picks the chattier one)
pub fn init(verbose: bool) {
    let filter = filter_from_lookup(|key| env::var(key).ok(), verbose);
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn filter_from_lookup<F>(lookup: F, verbose: bool) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    for key in ["RUST_LOG", "DOCUINTEL_LOG"] {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            if let Ok(filter) = EnvFilter::try_new(value) {
                return filter;
            }
        }
    }
    EnvFilter::new(if verbose { DEFAULT_FILTER } else { QUIET_FILTER })
}
