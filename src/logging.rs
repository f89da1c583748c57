//! Process-wide tracing setup
//!
//! The filter comes from `SPENDGUARD_LOG` when set, otherwise from
//! `Settings::log_filter`. Output goes to stderr so command output on stdout
//! stays machine-readable.

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "SPENDGUARD_LOG";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber once; later calls are no-ops.
pub fn init(default_filter: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("spendguard=info"));

        // A subscriber may already be installed by an embedding application
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("spendguard=debug");
        init("not a valid [filter");
        tracing::info!("still logging after repeated init");
    }
}
