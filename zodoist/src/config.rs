//! Environment configuration.

use crate::error::ConfigError;

pub const DATABASE_URL_VAR: &str = "ZODOIST_DATABASE_URL";
pub const CHANNEL_CAPACITY_VAR: &str = "ZODOIST_CHANNEL_CAPACITY";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://zodoist.db?mode=rwc";
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// sea-orm connection URL of the task store.
    pub database_url: String,
    /// Capacity of the change-notification and notice broadcast channels.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup(DATABASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            config.database_url = url;
        }

        if let Some(raw) = lookup(CHANNEL_CAPACITY_VAR) {
            config.channel_capacity = match raw.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: CHANNEL_CAPACITY_VAR,
                        value: raw,
                        reason: "must be greater than zero".into(),
                    });
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: CHANNEL_CAPACITY_VAR,
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            };
        }

        Ok(config)
    }
}
