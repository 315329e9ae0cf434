use crate::shared::config::{AppConfig, AppEnvironment};
use crate::shared::error::AppError;

/// Capability required to wipe the local store. Obtainable only in a
/// development environment with destructive resets explicitly allowed.
#[derive(Debug)]
pub struct DeveloperReset {
    _private: (),
}

impl DeveloperReset {
    pub fn authorize(config: &AppConfig) -> Result<Self, AppError> {
        if config.environment != AppEnvironment::Development {
            return Err(AppError::ConfigurationError(
                "Destructive reset is only available in development".to_string(),
            ));
        }
        if !config.allow_destructive_reset {
            return Err(AppError::ConfigurationError(
                "Destructive reset requires OFFLINE_FIRST_ALLOW_DESTRUCTIVE_RESET".to_string(),
            ));
        }
        Ok(Self { _private: () })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_development_and_explicit_opt_in() {
        let mut config = AppConfig::default();
        assert!(DeveloperReset::authorize(&config).is_err());

        config.environment = AppEnvironment::Development;
        assert!(DeveloperReset::authorize(&config).is_err());

        config.allow_destructive_reset = true;
        assert!(DeveloperReset::authorize(&config).is_ok());

        config.environment = AppEnvironment::Production;
        assert!(DeveloperReset::authorize(&config).is_err());
    }
}
