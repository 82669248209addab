//! Client configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use clinica_auth::GuardConfig;

use crate::storage::FileStorage;

pub const API_URL_VAR: &str = "CLINICA_API_URL";
pub const STATE_DIR_VAR: &str = "CLINICA_STATE_DIR";
pub const SNAPSHOT_MAX_AGE_VAR: &str = "CLINICA_SNAPSHOT_MAX_AGE_SECS";
pub const HTTP_TIMEOUT_VAR: &str = "CLINICA_HTTP_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SNAPSHOT_MAX_AGE_SECS: u64 = 900;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("could not determine a session state directory: {0}")]
    StateDir(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST backend (endpoints are appended to it).
    pub api_url: String,
    /// Where the identity mirror is persisted.
    pub state_dir: PathBuf,
    /// Maximum age of the identity snapshot before the guard asks for a refresh.
    pub snapshot_max_age: Duration,
    pub http_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_url = non_blank(API_URL_VAR).unwrap_or_else(|| {
            tracing::debug!("{API_URL_VAR} not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });

        let state_dir = match non_blank(STATE_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => FileStorage::default_dir().map_err(|e| ConfigError::StateDir(format!("{e:#}")))?,
        };

        let seconds = |var: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match non_blank(var) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidNumber { var, value }),
            }
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            state_dir,
            snapshot_max_age: seconds(SNAPSHOT_MAX_AGE_VAR, DEFAULT_SNAPSHOT_MAX_AGE_SECS)?,
            http_timeout: seconds(HTTP_TIMEOUT_VAR, DEFAULT_HTTP_TIMEOUT_SECS)?,
        })
    }

    /// Guard settings derived from this config.
    pub fn guard_config(&self) -> GuardConfig {
        let max_age = chrono::Duration::from_std(self.snapshot_max_age)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_SNAPSHOT_MAX_AGE_SECS as i64));
        GuardConfig::default().with_max_snapshot_age(max_age)
    }

    /// Base URL used for photo links.
    pub fn photo_base(&self) -> &str {
        &self.api_url
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn explicit_values_are_used() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://hc.cau.org/api/"),
            (STATE_DIR_VAR, "/tmp/clinica-state"),
            (SNAPSHOT_MAX_AGE_VAR, "60"),
            (HTTP_TIMEOUT_VAR, "5"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://hc.cau.org/api");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/clinica-state"));
        assert_eq!(config.snapshot_max_age, Duration::from_secs(60));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.guard_config().max_snapshot_age, chrono::Duration::seconds(60));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[(STATE_DIR_VAR, "/tmp/x")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(
            config.snapshot_max_age,
            Duration::from_secs(DEFAULT_SNAPSHOT_MAX_AGE_SECS)
        );
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[
            (STATE_DIR_VAR, "/tmp/x"),
            (HTTP_TIMEOUT_VAR, "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: HTTP_TIMEOUT_VAR,
                value: "soon".to_string()
            }
        );
    }
}
