//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with human-readable or JSON output on stderr
//! (stdout is reserved for data output).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// `default_level` is used unless `RUST_LOG` is set.
pub fn init(default_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section, with CLI overrides.
pub fn init_from_config(config: &lumen_core::Config, verbose: bool, json_logs: bool) {
    let (level, json_format) = resolve(config, verbose, json_logs);
    init(level, json_format);
}

fn resolve(config: &lumen_core::Config, verbose: bool, json_logs: bool) -> (&str, bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    (level, json_logs || config.logging.format == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::Config;

    #[test]
    fn test_verbose_overrides_config_level() {
        let mut config = Config::default();
        config.logging.level = "warn".to_string();
        assert_eq!(resolve(&config, false, false), ("warn", false));
        assert_eq!(resolve(&config, true, false), ("debug", false));
    }

    #[test]
    fn test_json_from_config_or_flag() {
        let mut config = Config::default();
        assert!(resolve(&config, false, true).1);
        config.logging.format = "json".to_string();
        assert!(resolve(&config, false, false).1);
    }
}
