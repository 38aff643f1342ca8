use super::{types::Config, ConfigError, Transport};

/// Validate configuration
///
/// The selected delivery transport must have its section present and
/// usable; the unselected transport's section is ignored.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.store.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "store.path cannot be empty".to_string(),
        ));
    }

    match config.delivery.transport {
        Transport::Http => {
            let api = config.api.as_ref().ok_or_else(|| {
                ConfigError::ValidationError(
                    "delivery.transport = \"http\" requires an [api] section".to_string(),
                )
            })?;
            if api.token.is_empty() {
                return Err(ConfigError::ValidationError(
                    "api.token cannot be empty".to_string(),
                ));
            }
            if api.secure_url.is_empty() || api.public_url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "api.secure_url and api.public_url cannot be empty".to_string(),
                ));
            }
        }
        Transport::Queue => {
            let broker = config.broker.as_ref().ok_or_else(|| {
                ConfigError::ValidationError(
                    "delivery.transport = \"queue\" requires a [broker] section".to_string(),
                )
            })?;
            if broker.port == 0 {
                return Err(ConfigError::ValidationError(
                    "broker.port cannot be 0".to_string(),
                ));
            }
            if broker.destination.is_empty() {
                return Err(ConfigError::ValidationError(
                    "broker.destination cannot be empty".to_string(),
                ));
            }
        }
    }

    Ok(())
}
