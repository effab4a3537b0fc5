//! Tracing/logging initialization.
//!
//! Audit lines are emitted on the `allowgate::audit` target, so
//! `RUST_LOG=warn,allowgate::audit=info` keeps every decision while silencing
//! routine chatter.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // JSON lines with timestamps; the hosting runtime ships stdout to the log sink.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
        ::tracing::info!(target: "allowgate::audit", "still alive");
    }
}
