use crate::git::identity::{ConfigScope, Identity};
use crate::git::repository::{DEFAULT_REMOTE_HOST, IdentityOverride, RepositoryOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GitConfig {
    /// git executable, looked up on PATH unless absolute
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Hosting provider whose remote URLs yield `owner/repo` names
    #[serde(default = "default_remote_host")]
    pub remote_host: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            executable: default_executable(),
            remote_host: default_remote_host(),
        }
    }
}

fn default_executable() -> String {
    "git".to_string()
}

fn default_remote_host() -> String {
    DEFAULT_REMOTE_HOST.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<IdentityEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<IdentityEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committer: Option<IdentityEntry>,
}

/// One `[identity.*]` table
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct IdentityEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ConfigScope>,
    #[serde(default)]
    pub persistent: bool,
}

impl IdentityEntry {
    fn to_override(&self, default_scope: ConfigScope) -> IdentityOverride {
        IdentityOverride {
            identity: Identity {
                name: self.name.clone(),
                email: self.email.clone(),
            },
            scope: self.scope.unwrap_or(default_scope),
            persistent: self.persistent,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME")
            .map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gittidy"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from the default path, or defaults if there is no file
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default_config());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Config file not found",
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        // Validate config
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        // Validate before saving
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self)?;

        fs::write(&path, contents)?;

        // Set permissions to 600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            git: GitConfig::default(),
            identity: IdentityConfig::default(),
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.git.executable.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "git.executable must not be empty".to_string(),
            ));
        }

        if self.git.remote_host.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "git.remote_host must not be empty".to_string(),
            ));
        }

        if self.identity.user.as_ref().is_some_and(|user| user.persistent) {
            return Err(ConfigError::InvalidValue(
                "identity.user is always written permanently; drop 'persistent'".to_string(),
            ));
        }

        Ok(())
    }

    /// Construction options for a repository opened with this configuration
    ///
    /// The user identity defaults to the global scope, author and committer
    /// to the local one.
    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions {
            user: self
                .identity
                .user
                .as_ref()
                .map(|entry| entry.to_override(ConfigScope::Global)),
            author: self
                .identity
                .author
                .as_ref()
                .map(|entry| entry.to_override(ConfigScope::Local)),
            committer: self
                .identity
                .committer
                .as_ref()
                .map(|entry| entry.to_override(ConfigScope::Local)),
            remote_host: Some(self.git.remote_host.clone()),
        }
    }
}
