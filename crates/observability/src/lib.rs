//! Logging setup shared by the Code Camp binaries.

pub mod tracing;

pub use self::tracing::{LogFormat, DEFAULT_FILTER};

/// Install the global subscriber from `RUST_LOG` and `LOG_FORMAT`.
///
/// An unknown `LOG_FORMAT` falls back to JSON. Repeated calls are no-ops.
pub fn init() {
    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    tracing::init(format);
}
