use crate::domain::DEFAULT_PER_PAGE;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_PER_PAGE: u64 = 1000;

#[derive(Debug, Error)]
pub enum ResolveStateDirError {
    #[error("failed to resolve home directory")]
    HomeDirNotFound,
}

pub fn resolve_state_dir() -> Result<PathBuf, ResolveStateDirError> {
    if let Some(override_dir) = std::env::var_os("LOGSCOPE_HOME") {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = dirs::home_dir() else {
        return Err(ResolveStateDirError::HomeDirNotFound);
    };
    Ok(home.join(".logscope"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    StateDir(#[from] ResolveStateDirError),

    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub per_page: u64,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    per_page: Option<u64>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    log_dir: Option<PathBuf>,
}

fn config_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join("config.json")
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let state_dir = resolve_state_dir()?;
        Self::from_sources(&state_dir, |key| std::env::var(key).ok())
    }

    /// Defaults, then `config.json` in the state dir, then environment.
    pub fn from_sources(
        state_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = load_config_file(state_dir)?;

        let api_url = env("LOGSCOPE_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = validate_api_url("LOGSCOPE_API_URL", &api_url)?;

        let per_page = match env("LOGSCOPE_PER_PAGE") {
            Some(raw) => parse_u64("LOGSCOPE_PER_PAGE", &raw)?,
            None => file.per_page.unwrap_or(DEFAULT_PER_PAGE),
        };
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(ConfigError::Invalid {
                key: "LOGSCOPE_PER_PAGE".to_string(),
                message: format!("must be between 1 and {MAX_PER_PAGE}, got {per_page}"),
            });
        }

        let timeout_secs = match env("LOGSCOPE_TIMEOUT_SECS") {
            Some(raw) => parse_u64("LOGSCOPE_TIMEOUT_SECS", &raw)?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "LOGSCOPE_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let log_dir = env("LOGSCOPE_LOG_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .or(file.log_dir)
            .unwrap_or_else(|| state_dir.join("logs"));

        Ok(Self {
            api_base_url,
            per_page,
            request_timeout: Duration::from_secs(timeout_secs),
            log_dir,
        })
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = validate_api_url("--api", url)?;
        Ok(self)
    }
}

fn load_config_file(state_dir: &Path) -> Result<ConfigFile, ConfigError> {
    let path = config_file_path(state_dir);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(error) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: error,
            });
        }
    };

    serde_json::from_str(&raw).map_err(|error| ConfigError::Parse {
        path: path.display().to_string(),
        source: error,
    })
}

fn validate_api_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            message: format!("expected an http(s) URL, got {value:?}"),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|error| ConfigError::Invalid {
            key: key.to_string(),
            message: format!("{value:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::from_sources(dir.path(), env_from(&[])).expect("config");
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.log_dir, dir.path().join("logs"));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.json"),
            r#"{"version":1,"api_url":"http://logs.internal/api/","per_page":50,"timeout_secs":5}"#,
        )
        .expect("write config");

        let config = AppConfig::from_sources(dir.path(), env_from(&[("LOGSCOPE_PER_PAGE", "25")]))
            .expect("config");
        assert_eq!(config.api_base_url, "http://logs.internal/api");
        assert_eq!(config.per_page, 25);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_name_the_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = AppConfig::from_sources(dir.path(), env_from(&[("LOGSCOPE_PER_PAGE", "lots")]))
            .expect_err("invalid");
        assert!(error.to_string().contains("LOGSCOPE_PER_PAGE"));

        let error = AppConfig::from_sources(dir.path(), env_from(&[("LOGSCOPE_API_URL", "ftp://x")]))
            .expect_err("invalid");
        assert!(matches!(error, ConfigError::Invalid { .. }));

        let error =
            AppConfig::from_sources(dir.path(), env_from(&[("LOGSCOPE_TIMEOUT_SECS", "0")]))
                .expect_err("invalid");
        assert!(error.to_string().contains("LOGSCOPE_TIMEOUT_SECS"));
    }

    #[test]
    fn malformed_config_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("config.json"), "{not json").expect("write config");
        let error = AppConfig::from_sources(dir.path(), env_from(&[])).expect_err("parse error");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn cli_api_override_is_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::from_sources(dir.path(), env_from(&[])).expect("config");
        let config = config.with_api_url("https://example.test/api/").expect("override");
        assert_eq!(config.api_base_url, "https://example.test/api");
        assert!(config.with_api_url("localhost:5000").is_err());
    }
}
