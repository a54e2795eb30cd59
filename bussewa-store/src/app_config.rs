use bussewa_core::config::{RetryConfig, SeatingConfig};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub seating: SeatingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub redis: Option<RedisConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Expiry for seat locks; 0 keeps them until released.
    #[serde(default)]
    pub lock_ttl_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `BUSSEWA__SEATING__PRIORITY_SEAT_BLOCK_SIZE=4`
            .add_source(
                config::Environment::with_prefix("BUSSEWA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document on its own, without files or environment.
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        let s = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.seating.validate().map_err(config::ConfigError::Message)
    }
}
