//! Tracing initialization
//!
//! Structured logging setup for binaries embedding this crate. The env
//! filter wins over the configured level when `RUST_LOG` is set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops.
pub fn init(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("crewline_core={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
