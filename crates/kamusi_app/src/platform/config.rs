//! `kamusi.ron` configuration file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use kamusi_client::{ClientSettings, DEFAULT_BASE_URL};
use kamusi_core::{Language, SearchForm, DEFAULT_TOP_K, TOP_K_CHOICES};
use kamusi_logging::{kamusi_debug, kamusi_info};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "kamusi.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("failed to write config {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config {0:?} already exists (use --force to overwrite)")]
    Exists(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub connect_timeout_secs: u64,
    /// Synchronous endpoints only; streams are bounded by the connect timeout.
    pub request_timeout_secs: u64,
    pub health_interval_secs: u64,
    pub default_k: u32,
    pub default_language: Language,
    pub show_pipeline_steps: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
            health_interval_secs: 30,
            default_k: DEFAULT_TOP_K,
            default_language: Language::Auto,
            show_pipeline_steps: true,
        }
    }
}

impl AppConfig {
    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                kamusi_debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        kamusi_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Applies the `--api-url` / `KAMUSI_API_URL` override, which wins over the file.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url must not be empty".to_string()));
        }
        if !TOP_K_CHOICES.contains(&self.default_k) {
            return Err(ConfigError::Invalid(format!(
                "default_k must be one of {TOP_K_CHOICES:?}, got {}",
                self.default_k
            )));
        }
        if self.health_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "health_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.api_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            health_interval: Duration::from_secs(self.health_interval_secs),
        }
    }

    pub fn search_form(&self) -> SearchForm {
        SearchForm {
            query: String::new(),
            k: self.default_k,
            language: self.default_language,
            show_pipeline_steps: self.show_pipeline_steps,
        }
    }

    /// Writes the defaults to `path` through a temp file in the same directory.
    pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::Exists(path.to_path_buf()));
        }

        let content = ron::ser::to_string_pretty(&Self::default(), PrettyConfig::new())?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(path).map_err(|err| write_err(err.error))?;

        kamusi_info!("Wrote default config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "(api_url: \"http://kamusi.local:9000\", default_k: 5)").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.api_url, "http://kamusi.local:9000");
        assert_eq!(config.default_k, 5);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.show_pipeline_steps);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "(api_url: ").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));

        fs::write(&path, "(default_k: 4)").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn override_wins_over_file() {
        let config = AppConfig::default().with_api_url(Some("http://example.org".to_string()));
        assert_eq!(config.client_settings().base_url, "http://example.org");

        let config = AppConfig::default().with_api_url(Some("  ".to_string()));
        assert_eq!(config.api_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn write_default_round_trips_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        AppConfig::write_default(&path, false).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());

        assert!(matches!(
            AppConfig::write_default(&path, false),
            Err(ConfigError::Exists(_))
        ));
        AppConfig::write_default(&path, true).unwrap();
    }
}
