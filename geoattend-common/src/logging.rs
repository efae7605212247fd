//! Tracing subscriber initialization shared by the front-end binaries

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the level filter: `RUST_LOG` wins, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", config.level, e))),
    }
}

/// Install the global fmt subscriber
///
/// Logs go to stderr unless `logging.file` is set, in which case they are
/// appended to that file without ANSI colors.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;

    let installed = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Tracing already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_rejects_garbage_level() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "geoattend=verbose".to_string(),
            file: None,
        };
        assert!(env_filter(&config).is_err());
    }

    #[test]
    fn test_env_filter_accepts_directive() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "geoattend_kiosk=debug,info".to_string(),
            file: None,
        };
        assert!(env_filter(&config).is_ok());
    }
}
