//! Control unit configuration loading.

use rcc_common::config::{ConfigError, ConfigLoader};
use rcc_common::ride::config::RccConfig;
use std::path::Path;
use tracing::{info, warn};

/// Load and validate the RCC config file.
///
/// A missing file yields the built-in defaults so a bench setup runs without
/// any config; every other error is returned.
pub fn load_config(path: &Path) -> Result<RccConfig, ConfigError> {
    let config = match RccConfig::load(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(ConfigError::FileNotFound) => {
            warn!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            RccConfig::default()
        }
        Err(e) => return Err(e),
    };
    config.validate()?;
    Ok(config)
}
