//! Server configuration read from environment variables.

use std::collections::HashMap;

use thiserror::Error;

use crate::aggregation::DEFAULT_RECENT_CAMPAIGNS;
use crate::ranking::DEFAULT_PAGE_SIZE;

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 3000;

/// Default dataset location.
pub const DEFAULT_DATASET_PATH: &str = "data/dataset.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub dataset_path: String,

    /// Groups per page of the campaign list.
    pub page_size: usize,

    /// Campaigns listed by the recent-campaigns view.
    pub recent_campaigns: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            dataset_path: DEFAULT_DATASET_PATH.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            recent_campaigns: DEFAULT_RECENT_CAMPAIGNS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "LENS_PORT", DEFAULT_PORT, "must be a valid u16")?;

        let dataset_path = env_map
            .get("LENS_DATASET_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DATASET_PATH.to_string());

        let page_size = parse_or(
            &env_map,
            "LENS_PAGE_SIZE",
            DEFAULT_PAGE_SIZE,
            "must be a positive integer",
        )?;
        if page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "LENS_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let recent_campaigns = parse_or(
            &env_map,
            "LENS_RECENT_CAMPAIGNS",
            DEFAULT_RECENT_CAMPAIGNS,
            "must be a non-negative integer",
        )?;

        Ok(Self {
            port,
            dataset_path,
            page_size,
            recent_campaigns,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.dataset_path, "data/dataset.json");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.recent_campaigns, 10);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_env_map(env(&[
            ("LENS_PORT", "8080"),
            ("LENS_DATASET_PATH", "/srv/lens.json"),
            ("LENS_PAGE_SIZE", "25"),
            ("LENS_RECENT_CAMPAIGNS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.dataset_path, "/srv/lens.json");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.recent_campaigns, 5);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_env_map(env(&[("LENS_PORT", "99999")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue("LENS_PORT".to_string(), "must be a valid u16".to_string())
        );
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = Config::from_env_map(env(&[("LENS_PAGE_SIZE", "0")])).unwrap_err();
        assert!(err.to_string().contains("LENS_PAGE_SIZE"));

        assert!(Config::from_env_map(env(&[("LENS_PAGE_SIZE", "ten")])).is_err());
    }
}
