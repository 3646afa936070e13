//! Client configuration.
//!
//! Settings come from an optional TOML file (`nwis.toml` by default), then
//! from environment variables, which win. A `.env` file in the working
//! directory is loaded first, so overrides can live there too:
//!
//! - `NWIS_DV_URL`: daily values endpoint
//! - `NWIS_IV_URL`: instantaneous values endpoint
//! - `NWIS_TIMEOUT_SECS`: per-request timeout

use crate::logging::{self, DataSource};
use crate::model::{ConfigurationError, OutputFormat};
use crate::variant::{ServiceVariant, DV_BASE_URL, IV_BASE_URL};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "nwis.toml";

pub const ENV_DV_URL: &str = "NWIS_DV_URL";
pub const ENV_IV_URL: &str = "NWIS_IV_URL";
pub const ENV_TIMEOUT_SECS: &str = "NWIS_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub daily_url: String,
    pub instantaneous_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// `json`, `waterml`, `waterml-2.0` or `rdb`.
    pub default_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            daily_url: DV_BASE_URL.to_string(),
            instantaneous_url: IV_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("nwis_acquire/", env!("CARGO_PKG_VERSION")).to_string(),
            default_format: OutputFormat::Json.to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads `.env`, the TOML file and the environment overrides.
    ///
    /// With `path` unset, a missing `nwis.toml` means defaults. An explicit
    /// path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                logging::debug(
                    DataSource::Config,
                    None,
                    &format!("{} not found, using defaults", DEFAULT_CONFIG_PATH),
                );
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::single("config", format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(text)
            .map_err(|e| ConfigurationError::single("config", format!("Failed to parse config: {}", e)))
    }

    /// Applies overrides from `lookup`, normally the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigurationError> {
        if let Some(url) = lookup(ENV_DV_URL) {
            self.daily_url = url;
        }
        if let Some(url) = lookup(ENV_IV_URL) {
            self.instantaneous_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = secs.trim().parse().map_err(|_| {
                ConfigurationError::single(ENV_TIMEOUT_SECS, format!("\"{}\" is not a number of seconds", secs))
            })?;
        }
        Ok(())
    }

    /// Checks every setting, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut errors = ConfigurationError::new();

        for (field, url) in [("daily_url", &self.daily_url), ("instantaneous_url", &self.instantaneous_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(field, None, format!("\"{}\" is not an http(s) URL", url));
            }
        }
        if self.timeout_secs == 0 {
            errors.push("timeout_secs", None, "must be greater than zero");
        }
        if let Err(e) = self.format() {
            errors.extend(e);
        }

        errors.into_result()
    }

    pub fn base_url(&self, variant: ServiceVariant) -> &str {
        match variant {
            ServiceVariant::Daily => &self.daily_url,
            ServiceVariant::Instantaneous => &self.instantaneous_url,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn format(&self) -> Result<OutputFormat, ConfigurationError> {
        self.default_format.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_point_at_usgs() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(ServiceVariant::Daily), "https://waterservices.usgs.gov/nwis/dv/");
        assert_eq!(config.base_url(ServiceVariant::Instantaneous), "https://waterservices.usgs.gov/nwis/iv/");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.format().unwrap(), OutputFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = ClientConfig::from_toml_str("timeout_secs = 15\n").unwrap();
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.daily_url, DV_BASE_URL);
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = ClientConfig::from_toml_str("timeout_secs = \"soon\"").unwrap_err();
        assert!(err.mentions("config"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let env: HashMap<&str, &str> = [(ENV_IV_URL, "http://localhost:8080/iv/"), (ENV_TIMEOUT_SECS, "5")]
            .into_iter()
            .collect();
        let mut config = ClientConfig::from_toml_str("instantaneous_url = \"https://example.org/iv/\"").unwrap();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.instantaneous_url, "http://localhost:8080/iv/");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.daily_url, DV_BASE_URL);
    }

    #[test]
    fn test_bad_timeout_override_is_rejected() {
        let mut config = ClientConfig::default();
        let err = config.apply_env(|k| (k == ENV_TIMEOUT_SECS).then(|| "ten".to_string())).unwrap_err();
        assert!(err.mentions(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let config = ClientConfig {
            daily_url: "ftp://example.org".to_string(),
            timeout_secs: 0,
            default_format: "csv".to_string(),
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.mentions("daily_url"));
        assert!(err.mentions("timeout_secs"));
        assert!(err.mentions("format"));
        assert!(!err.mentions("instantaneous_url"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.mentions("config"));
    }
}
