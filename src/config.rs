//! Environment driven service configuration.
//!
//! # Environment Variables
//!
//! - `HOST`: bind address (default: `0.0.0.0`)
//! - `PORT`: bind port (default: `8080`)
//! - `UPLOAD_DIR`: where `/upload` stores files (default: `uploads`)
//! - `UPLOAD_MAX_BYTES`: largest `/upload` body, `0` for no cap (default: 1 GiB)
//! - `PROGRESS_CAPACITY`: lines buffered per progress subscriber (default: `16`)
//! - `REQUEST_TIMEOUT_SECS`: per-request timeout of the HTTP client (default: `30`)
//! - `WORKER_THREADS`: tokio worker threads (default: logical CPU count)
//! - `RUST_LOG`: log filter (default: `barrage=info,tower_http=info`)
//!
//! A `.env` file in the working directory is loaded first by the binary.

use std::{path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{client::DEFAULT_TIMEOUT, server::DEFAULT_UPLOAD_MAX_BYTES};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}='{value}' is not valid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub progress_capacity: usize,
    pub request_timeout: Duration,
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upload_dir: PathBuf::from("uploads"),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            progress_capacity: 16,
            request_timeout: DEFAULT_TIMEOUT,
            worker_threads: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let worker_threads = parse(&get, "WORKER_THREADS")?.unwrap_or(defaults.worker_threads);
        if worker_threads == 0 {
            return Err(ConfigError::Invalid {
                key: "WORKER_THREADS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            upload_max_bytes: parse(&get, "UPLOAD_MAX_BYTES")?
                .unwrap_or(defaults.upload_max_bytes),
            progress_capacity: parse(&get, "PROGRESS_CAPACITY")?
                .unwrap_or(defaults.progress_capacity),
            request_timeout: parse(&get, "REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            worker_threads,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            let value = raw.trim();
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: value.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
