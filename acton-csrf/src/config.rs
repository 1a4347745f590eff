//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: ACTON_)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/acton-csrf/{service_name}/config.toml
//! 4. System directory: /etc/acton-csrf/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "storefront"
//! log_level = "info"
//!
//! [session]
//! cookie_name = "session_id"
//! secure = true
//!
//! [csrf]
//! token_length = 20
//! error_message = "Invalid security token."
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::csrf::{DEFAULT_ERROR_MESSAGE, DEFAULT_TOKEN_LENGTH, MAX_TOKEN_LENGTH, MIN_TOKEN_LENGTH};
use crate::error::{Error, Result};

const CONFIG_DIR_PREFIX: &str = "acton-csrf";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// CSRF token configuration
    #[serde(default)]
    pub csrf: CsrfConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Session configuration.
///
/// Controls the cookie issued by the session layer that the CSRF middleware
/// relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session cookie name.
    ///
    /// Default: `"session_id"`
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session expiry in seconds.
    ///
    /// - `0`: Session cookie (expires when browser closes)
    /// - `> 0`: Expires after this many seconds of inactivity
    ///
    /// Default: `86400` (24 hours)
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,

    /// Cookie path.
    ///
    /// Default: `"/"`
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Cookie domain (optional).
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Secure cookie flag (HTTPS only).
    ///
    /// Default: `true`
    #[serde(default = "default_true")]
    pub secure: bool,

    /// HttpOnly cookie flag.
    ///
    /// Default: `true`
    #[serde(default = "default_true")]
    pub http_only: bool,

    /// SameSite cookie policy: `"strict"`, `"lax"` or `"none"`.
    ///
    /// Default: `"lax"`
    #[serde(default = "default_same_site")]
    pub same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            expiry_secs: default_expiry_secs(),
            cookie_path: default_cookie_path(),
            cookie_domain: None,
            secure: default_true(),
            http_only: default_true(),
            same_site: default_same_site(),
        }
    }
}

/// CSRF protection configuration.
///
/// # Example
///
/// ```toml
/// [csrf]
/// token_length = 20
/// error_message = "Invalid security token."
/// header_name = "X-CSRF-Token"
/// max_body_bytes = 2097152
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    /// Number of random bytes per token. The hex-encoded token is twice as long.
    ///
    /// Default: `20`
    #[serde(default = "default_token_length")]
    pub token_length: usize,

    /// Body of the default 400 response sent when validation fails.
    ///
    /// Default: `"Invalid security token."`
    #[serde(default = "default_error_message")]
    pub error_message: String,

    /// Header checked for the token when the request body carries none.
    ///
    /// Disabled unless set.
    #[serde(default)]
    pub header_name: Option<String>,

    /// Largest request body buffered while looking for the token.
    ///
    /// Default: `2097152` (2 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_length: default_token_length(),
            error_message: default_error_message(),
            header_name: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl CsrfConfig {
    /// Check that the configured values can produce secure tokens.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TOKEN_LENGTH..=MAX_TOKEN_LENGTH).contains(&self.token_length) {
            return Err(Error::InvalidConfig(format!(
                "csrf.token_length must be between {MIN_TOKEN_LENGTH} and {MAX_TOKEN_LENGTH} bytes, got {}",
                self.token_length
            )));
        }

        if let Some(header) = &self.header_name {
            http::HeaderName::try_from(header.as_str()).map_err(|e| {
                Error::InvalidConfig(format!("csrf.header_name {header:?} is not a valid header: {e}"))
            })?;
        }

        Ok(())
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_cookie_name() -> String {
    "session_id".to_string()
}

fn default_expiry_secs() -> u64 {
    86400 // 24 hours
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_same_site() -> String {
    "lax".to_string()
}

fn default_token_length() -> usize {
    DEFAULT_TOKEN_LENGTH
}

fn default_error_message() -> String {
    DEFAULT_ERROR_MESSAGE.to_string()
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found is used):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/acton-csrf/{service_name}/config.toml
    /// 3. System directory: /etc/acton-csrf/{service_name}/config.toml
    ///
    /// Environment variables (ACTON_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        // Try to infer service name from binary name or use default
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_DIR_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("ACTON_").split("__"));

        let config: Config = figment.extract()?;
        config.csrf.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses XDG directories and loads directly from the given path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ACTON_").split("__"))
            .extract()?;

        config.csrf.validate()?;
        Ok(config)
    }

    /// Find all possible config file paths for a service, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_DIR_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: CONFIG_DIR_PREFIX.to_string(),
                log_level: default_log_level(),
            },
            session: SessionConfig::default(),
            csrf: CsrfConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.session.cookie_name, "session_id");
        assert!(config.session.secure);
    }

    #[test]
    fn test_csrf_config_defaults() {
        let config = CsrfConfig::default();
        assert_eq!(config.token_length, 20);
        assert_eq!(config.error_message, "Invalid security token.");
        assert!(config.header_name.is_none());
        assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_csrf_config_rejects_short_tokens() {
        let config = CsrfConfig {
            token_length: 8,
            ..CsrfConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_csrf_config_rejects_bad_header() {
        let config = CsrfConfig {
            header_name: Some("not a header".to_string()),
            ..CsrfConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "storefront"

[csrf]
token_length = 16
error_message = "Form expired, please retry."
header_name = "X-CSRF-Token"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "storefront");
        assert_eq!(config.csrf.token_length, 16);
        assert_eq!(config.csrf.error_message, "Form expired, please retry.");
        assert_eq!(config.csrf.header_name.as_deref(), Some("X-CSRF-Token"));
        assert_eq!(config.session.cookie_name, "session_id");
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[csrf]\ntoken_length = 4").unwrap();

        assert!(matches!(
            Config::load_from(file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
