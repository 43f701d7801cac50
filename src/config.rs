//! Configuration loader and validator for the marketplace feed client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub api: Api,
    pub feed: Feed,
}

/// GraphQL API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Api {
    pub endpoint: String,
    pub api_key: String,
}

/// Feed paging and radius settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feed {
    pub page_size: u32,
    pub default_radius_meters: u32,
    pub min_radius_meters: u32,
    pub max_radius_meters: u32,
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("api.endpoint must be non-empty"));
    }
    if cfg.api.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("api.api_key must be non-empty"));
    }

    if cfg.feed.page_size == 0 {
        return Err(ConfigError::Invalid("feed.page_size must be > 0"));
    }
    if cfg.feed.min_radius_meters == 0 {
        return Err(ConfigError::Invalid("feed.min_radius_meters must be > 0"));
    }
    if cfg.feed.min_radius_meters > cfg.feed.max_radius_meters {
        return Err(ConfigError::Invalid(
            "feed.min_radius_meters must not exceed feed.max_radius_meters",
        ));
    }
    if cfg.feed.default_radius_meters < cfg.feed.min_radius_meters
        || cfg.feed.default_radius_meters > cfg.feed.max_radius_meters
    {
        return Err(ConfigError::Invalid(
            "feed.default_radius_meters must lie within [min, max]",
        ));
    }

    Ok(())
}

/// Example YAML document matching the schema above.
pub fn example() -> &'static str {
    r#"api:
  endpoint: "https://example.appsync-api.eu-west-1.amazonaws.com/graphql"
  api_key: "da2-YOUR_API_KEY"

feed:
  page_size: 20
  default_radius_meters: 10000
  min_radius_meters: 5000
  max_radius_meters: 100000
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.feed.default_radius_meters, 10_000);
    }

    #[test]
    fn invalid_endpoint() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.endpoint = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("api.endpoint")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_api_key() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.api_key = "  ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_radius_bounds() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.min_radius_meters = 200_000;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("min_radius_meters")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.default_radius_meters = 1;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.feed.page_size = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.feed.page_size, 20);
    }
}
