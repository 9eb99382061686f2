//! Persistent CLI configuration.
//!
//! Stored as pretty JSON at `$CHOICEFORM_CONFIG_DIR/automation.json`
//! (default `~/.choiceform/automation.json`):
//!
//! ```json
//! { "auth": { "endpoint": "...", "access_token": "..." }, "hub": { "endpoint": "..." } }
//! ```


use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_DIR_ENV: &str = "CHOICEFORM_CONFIG_DIR";
pub const ENVIRONMENT_ENV: &str = "ATOMEMO_ENV";
pub const CONFIG_FILE_NAME: &str = "automation.json";

pub const DEV_AUTH_ENDPOINT: &str = "http://localhost:5001";
pub const PROD_AUTH_ENDPOINT: &str = "https://oneauth.choiceform.io";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {field} {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine home directory; set CHOICEFORM_CONFIG_DIR")]
    HomeDirNotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub: Option<HubConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Config {
    /// Config written on first use.
    pub fn default_for(production: bool) -> Self {
        let endpoint = if production {
            PROD_AUTH_ENDPOINT
        } else {
            DEV_AUTH_ENDPOINT
        };
        Self {
            auth: Some(AuthConfig {
                endpoint: Some(endpoint.to_string()),
                access_token: None,
            }),
            hub: None,
        }
    }

    pub fn auth_endpoint(&self) -> Option<&str> {
        self.auth.as_ref()?.endpoint.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.auth
            .as_ref()?
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    pub fn hub_endpoint(&self) -> Option<&str> {
        self.hub.as_ref()?.endpoint.as_deref()
    }

    /// Deep merge: fields set in `patch` win, nested sections merge field by field.
    pub fn merge(self, patch: Config) -> Config {
        Config {
            auth: merge_section(self.auth, patch.auth, |base, patch| AuthConfig {
                endpoint: patch.endpoint.or(base.endpoint),
                access_token: patch.access_token.or(base.access_token),
            }),
            hub: merge_section(self.hub, patch.hub, |base, patch| HubConfig {
                endpoint: patch.endpoint.or(base.endpoint),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = self.auth_endpoint() {
            validate_endpoint("auth.endpoint", endpoint)?;
        }
        if let Some(endpoint) = self.hub_endpoint() {
            validate_endpoint("hub.endpoint", endpoint)?;
        }
        Ok(())
    }
}

fn merge_section<T>(base: Option<T>, patch: Option<T>, merge: impl FnOnce(T, T) -> T) -> Option<T> {
    match (base, patch) {
        (Some(base), Some(patch)) => Some(merge(base, patch)),
        (base, None) => base,
        (None, patch) => patch,
    }
}

/// Endpoints must parse as absolute URLs. `field` names the setting in the message.
pub fn validate_endpoint(field: &'static str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation {
            field,
            reason: format!("must be a valid URL ({e}): {value}"),
        })
}

/// Location and environment of the config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    production: bool,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            production: false,
        }
    }

    /// Resolve from `CHOICEFORM_CONFIG_DIR` / home dir and `ATOMEMO_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or(ConfigError::HomeDirNotFound)?
                .join(".choiceform"),
        };
        let production = std::env::var(ENVIRONMENT_ENV).is_ok_and(|v| v == "production");
        Ok(Self::new(dir).with_production(production))
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Load the config, writing the default one if the file does not exist yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let path = self.file_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default_for(self.production);
                tracing::debug!(path = %path.display(), "config not found, writing defaults");
                self.save(&config)?;
                return Ok(config);
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;

        std::fs::create_dir_all(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.file_path();
        let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ConfigError::Io { path, source })
    }

    /// Merge `patch` into the stored config and persist the result.
    pub fn update(&self, patch: Config) -> Result<Config, ConfigError> {
        let merged = self.load()?.merge(patch);
        self.save(&merged)?;
        Ok(merged)
    }
}
