//! Process-wide logging setup for the portal binaries.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{DEFAULT_DIRECTIVE, init_with};

/// Initialize tracing with the default `info` filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init_with(DEFAULT_DIRECTIVE);
}
