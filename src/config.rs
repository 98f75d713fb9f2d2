use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";
const DEFAULT_KEY_PREFIX: &str = "telemetry";

/// Where records are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend {
                value: other.to_string(),
            }),
        }
    }
}

/// Runtime settings, read once from the environment at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub redis_key_prefix: String,
    /// Registered credentials accepted in `x-api-key`
    pub api_keys: HashSet<String>,
    /// Number of demo records inserted at startup
    pub seed_records: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_keys = parse_api_keys(&lookup("API_KEYS").ok_or(ConfigError::MissingEnv {
            key: "API_KEYS".into(),
        })?)?;

        Ok(Self {
            bind_addr: parse_var(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR)?,
            store_backend: parse_var(&lookup, "STORE_BACKEND", "redis")?,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.into()),
            redis_key_prefix: lookup("REDIS_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.into()),
            api_keys,
            seed_records: parse_var(&lookup, "SEED_RECORDS", "0")?,
        })
    }
}

fn parse_api_keys(raw: &str) -> Result<HashSet<String>, ConfigError> {
    let keys: HashSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect();
    if keys.is_empty() {
        return Err(ConfigError::NoApiKeys);
    }
    Ok(keys)
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_owned());
    raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.clone(),
        reason: err.to_string(),
    })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {key}")]
    MissingEnv { key: String },
    #[error("API_KEYS must list at least one key")]
    NoApiKeys,
    #[error("unknown store backend '{value}' (expected 'redis' or 'memory')")]
    UnknownBackend { value: String },
    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
