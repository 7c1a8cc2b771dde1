//! Tracing subscriber setup for hosts that do not install their own.

use lineage_core::config::LineageConfig;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `general.log_level`; `telemetry.json_logs` switches
/// to JSON lines. Returns `false` if a global subscriber was already set.
pub fn init(config: &LineageConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.telemetry.json_logs {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!(
            level = %config.general.log_level,
            json = config.telemetry.json_logs,
            "telemetry initialised"
        );
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let config = LineageConfig::default();
        let _ = init(&config);
        assert!(!init(&config));
    }
}
