//! TOML settings for the CLI and the HTTP server.
//!
//! ```toml
//! data_dir = "/var/lib/vnest"
//!
//! [messages]
//! affirmation = "Oikein! Hyvä lause."
//!
//! [server]
//! port = 9000
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::graph::validate::Messages;

/// Environment variable naming the settings file read by the server.
pub const ENV_CONFIG: &str = "VNEST_CONFIG";
/// Settings file used when [`ENV_CONFIG`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "vnest.toml";
/// Environment variable overriding [`ServerSettings::bind`].
pub const ENV_SERVER_BIND: &str = "VNEST_SERVER_BIND";
/// Environment variable overriding [`ServerSettings::port`].
pub const ENV_SERVER_PORT: &str = "VNEST_SERVER_PORT";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// redb data directory. Absent means an in-memory store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub messages: Messages,
    #[serde(default)]
    pub server: ServerSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Apply `VNEST_SERVER_BIND` / `VNEST_SERVER_PORT` if set.
    ///
    /// An unparsable port is ignored with a warning.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_SERVER_BIND).ok(),
            std::env::var(ENV_SERVER_PORT).ok(),
        );
    }

    fn apply_overrides(&mut self, bind: Option<String>, port: Option<String>) {
        if let Some(bind) = bind.filter(|b| !b.trim().is_empty()) {
            self.bind = bind;
        }
        if let Some(raw) = port {
            match raw.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid {ENV_SERVER_PORT}"),
            }
        }
    }

    /// `bind:port`, ready for a listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Settings {
    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Read settings from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write settings as TOML, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            data_dir: self.data_dir.clone(),
            messages: self.messages.clone(),
        }
    }
}
