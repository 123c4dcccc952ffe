//! Process-wide tracing setup.

/// Initialize process-wide observability (tracing/logging).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = tracing::init();
}

/// Tracing subscriber configuration.
pub mod tracing;
