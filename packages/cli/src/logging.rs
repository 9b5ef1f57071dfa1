//! Logging setup.
//!
//! Library crates log through `tracing`; the binary installs a
//! `tracing-subscriber` formatter on stderr so stdout stays clean JSON.
//! `RUST_LOG` overrides the level chosen with `-v`/`-q`.

use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates whose logs the default filter lets through.
const CRATES: &[&str] = &[
    "appstate",
    "appstate_cli",
    "appstate_core",
    "appstate_kv",
    "appstate_element",
    "appstate_legacy",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// Include the module path in each line.
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            with_target: false,
        }
    }
}

impl LogConfig {
    /// Level from repeated `-v` and `-q` flags, starting at `warn`.
    pub fn from_flags(verbose: u8, quiet: u8) -> Self {
        let level = match i16::from(verbose) - i16::from(quiet) {
            i16::MIN..=-2 => LevelFilter::OFF,
            -1 => LevelFilter::ERROR,
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self {
            level,
            with_target: level >= LevelFilter::DEBUG,
        }
    }

    /// The filter used when `RUST_LOG` is unset.
    pub fn filter_directives(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        let mut directives = vec!["warn".to_string()];
        directives.extend(CRATES.iter().map(|c| format!("{}={}", c, level)));
        directives.join(",")
    }
}

/// Install the global subscriber. Does nothing if one is already set.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(config.with_target)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags() {
        assert_eq!(LogConfig::from_flags(0, 0), LogConfig::default());
        assert_eq!(LogConfig::from_flags(1, 0).level, LevelFilter::INFO);
        assert_eq!(LogConfig::from_flags(2, 0).level, LevelFilter::DEBUG);
        assert_eq!(LogConfig::from_flags(9, 0).level, LevelFilter::TRACE);
        assert_eq!(LogConfig::from_flags(0, 1).level, LevelFilter::ERROR);
        assert_eq!(LogConfig::from_flags(0, 4).level, LevelFilter::OFF);
        assert_eq!(LogConfig::from_flags(1, 1).level, LevelFilter::WARN);
    }

    #[test]
    fn directives_cover_every_crate() {
        let directives = LogConfig::from_flags(2, 0).filter_directives();
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("appstate_kv=debug"));
        assert!(directives.contains("appstate_legacy=debug"));
    }
}
