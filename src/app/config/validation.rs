use super::{ClientConfig, ConfigError};
use url::Url;

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate collector address
        let url = Url::parse(&self.collector_address).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid collector address '{}': {}",
                self.collector_address, e
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "Invalid collector address '{}': cannot carry a path",
                self.collector_address
            )));
        }

        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Client name must not be empty".to_string(),
            ));
        }

        if self.reconnect_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Reconnect interval must be greater than 0".to_string(),
            ));
        }

        if self.metrics_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Metrics interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
