use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::EngineError;

/// Installs the global fmt subscriber. Returns `Ok(false)` when one is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<bool, EngineError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| EngineError::Logging(e.to_string()))?,
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok();
    Ok(installed)
}
