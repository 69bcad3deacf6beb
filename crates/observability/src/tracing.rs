//! Tracing subscriber setup.
//!
//! JSON lines on stderr so that stdout stays free for command output.
//! The filter comes from `RUST_LOG`; when unset or unparsable the given
//! default directive applies.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber with `default_directive` as fallback filter.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_with(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
