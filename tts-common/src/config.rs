//! Configuration loading and config file resolution
//!
//! Settings come from a TOML file with four sections (`[server]`,
//! `[conversion]`, `[identity]`, `[logging]`). Every field has a compiled
//! default, so a missing file only produces a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TTS_CONFIG";

/// Config file name looked up in the platform config directories
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Complete service configuration as read from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub conversion: ConversionConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}

/// Local HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5173,
        }
    }
}

/// Remote conversion service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Absolute URI the conversion request is POSTed to
    pub endpoint: String,
    /// Request timeout in seconds (connect + response)
    pub timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://35smzwnuoc.execute-api.us-east-1.amazonaws.com/dev/convert"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

/// Hosted identity provider (OpenID Connect) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Issuer URI; `/.well-known/openid-configuration` is appended for discovery
    pub authority: String,
    pub client_id: String,
    /// Where the provider sends the browser after sign-in
    pub redirect_uri: String,
    pub scope: String,
    /// Where the provider sends the browser after sign-out
    pub logout_uri: String,
    /// Hosted logout endpoint; discovery's `end_session_endpoint` is used when unset
    pub logout_endpoint: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            authority: "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_vHp0bCx5w"
                .to_string(),
            client_id: "22inucils8eqncdt65mrrra6q".to_string(),
            redirect_uri: "http://localhost:5173/dashboard".to_string(),
            scope: "openid profile email".to_string(),
            logout_uri: "http://localhost:5173/".to_string(),
            logout_endpoint: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    ///
    /// A file that exists but does not parse is an error; callers decide what
    /// to do about files that don't exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check values that would otherwise only fail at request time
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".to_string()));
        }
        if !is_absolute_http_uri(&self.conversion.endpoint) {
            return Err(Error::Config(format!(
                "conversion.endpoint must be an absolute http(s) URI: {:?}",
                self.conversion.endpoint
            )));
        }
        if self.conversion.timeout_secs == 0 {
            return Err(Error::Config(
                "conversion.timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.identity.client_id.trim().is_empty() {
            return Err(Error::Config("identity.client_id must be set".to_string()));
        }
        if !is_absolute_http_uri(&self.identity.authority) {
            return Err(Error::Config(format!(
                "identity.authority must be an absolute http(s) URI: {:?}",
                self.identity.authority
            )));
        }
        Ok(())
    }
}

/// True for an absolute `http`/`https` URI with a host
pub fn is_absolute_http_uri(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

/// Config file resolution following priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Per-user config directory
/// 4. System-wide config directory (Linux only)
///
/// When nothing is found the compiled defaults apply.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    app_name: String,
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            cli_path: None,
        }
    }

    /// Use a path given on the command line
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Find the config file to read, if any
    ///
    /// Explicit paths (CLI, environment) are returned even if they don't exist
    /// so the caller can report them; discovered paths must exist.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config directory
        if let Some(path) = dirs::config_dir().map(|d| d.join(&self.app_name).join(CONFIG_FILE_NAME)) {
            if path.exists() {
                return Some(path);
            }
        }

        // Priority 4: System-wide config directory
        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc").join(&self.app_name).join(CONFIG_FILE_NAME);
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration, degrading to defaults when no file exists
    ///
    /// Returns the config together with the file it came from.
    pub fn load(&self) -> Result<(TomlConfig, Option<PathBuf>)> {
        match self.resolve_path() {
            Some(path) if path.exists() => {
                let config = TomlConfig::load(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok((TomlConfig::default(), None))
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok((TomlConfig::default(), None))
            }
        }
    }
}
