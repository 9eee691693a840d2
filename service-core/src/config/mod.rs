use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Where service settings are read from.
///
/// Services read their variables through this trait rather than calling
/// `std::env` directly, so tests can hand in a plain map.
pub trait EnvSource {
    /// Raw value for `key`. Blank values are reported as unset.
    fn var(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.var(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse `key` when set; a malformed value is a configuration error.
    fn parse<T>(&self, key: &str) -> Result<Option<T>, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.var(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
                })
            })
            .transpose()
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, AppError> {
        Ok(self.parse::<bool>(key)?.unwrap_or(default))
    }
}

/// The process environment (after `.env` has been loaded).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
