//! # Tracing Setup
//!
//! Installs the global `tracing` subscriber for binaries and services built
//! on the engine.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Installs a `fmt` subscriber filtered by `settings.filter`.
///
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated calls (tests, embedded use) harmless.
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_new(&settings.filter).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}. Falling back to 'info'.", settings.filter, e);
        EnvFilter::new("info")
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        let settings = LoggingSettings::default();
        init_tracing(&settings);
        assert!(!init_tracing(&settings));
    }

    #[test]
    fn test_bad_filter_does_not_panic() {
        let settings = LoggingSettings {
            filter: "confreg=[[[".to_string(),
            json: true,
        };
        init_tracing(&settings);
    }
}
