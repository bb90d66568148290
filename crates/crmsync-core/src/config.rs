//! Configuration module for CRMSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overlay, validation, defaults, and a builder
//! pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for CRMSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub salesforce: SalesforceConfig,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Salesforce connection and credential settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesforceConfig {
    pub username: String,
    pub password: String,
    /// Appended to the password on the token exchange.
    pub security_token: String,
    /// Org base URL, e.g. `https://example.my.salesforce.com`.
    pub instance_url: String,
    /// OAuth2 token endpoint.
    pub login_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// REST API version segment, e.g. `v60.0`.
    pub api_version: String,
    /// Per-request transport timeout in seconds.
    pub request_timeout_secs: u64,
    pub field_mapping: FieldMapping,
}

/// Optional mapping of record attributes to Account field API names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub email: Option<String>,
    pub birth_date: Option<String>,
}

/// Sync cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between sync cycles.
    pub interval_secs: u64,
    /// How far back each cycle looks for modified records. Defaults to the interval.
    pub lookback_secs: Option<u64>,
}

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

/// Errors that can occur while reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl std::fmt::Debug for SalesforceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("login_url", &self.login_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("field_mapping", &self.field_mapping)
            .finish()
    }
}

impl SyncConfig {
    /// Effective lookback window in seconds.
    pub fn lookback(&self) -> u64 {
        self.lookback_secs.unwrap_or(self.interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/crmsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("crmsync")
            .join("config.yaml")
    }

    /// Overlay `CRMSYNC_*` variables from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values returned by `lookup` for each known variable name.
    ///
    /// Empty values are ignored.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let overlay = |key: &str, target: &mut String| {
            if let Some(value) = get(key) {
                *target = value;
            }
        };

        let sf = &mut self.salesforce;
        overlay("CRMSYNC_SALESFORCE_USERNAME", &mut sf.username);
        overlay("CRMSYNC_SALESFORCE_PASSWORD", &mut sf.password);
        overlay("CRMSYNC_SALESFORCE_SECURITY_TOKEN", &mut sf.security_token);
        overlay("CRMSYNC_SALESFORCE_INSTANCE_URL", &mut sf.instance_url);
        overlay("CRMSYNC_SALESFORCE_LOGIN_URL", &mut sf.login_url);
        overlay("CRMSYNC_SALESFORCE_CLIENT_ID", &mut sf.client_id);
        overlay("CRMSYNC_SALESFORCE_CLIENT_SECRET", &mut sf.client_secret);
        overlay("CRMSYNC_LOG_LEVEL", &mut self.logging.level);

        if let Some(path) = get("CRMSYNC_DATABASE") {
            self.database.path = PathBuf::from(path);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "v60.0";

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            security_token: String::new(),
            instance_url: String::new(),
            login_url: "https://login.salesforce.com/services/oauth2/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_secs: 30,
            field_mapping: FieldMapping::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            lookback_secs: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("crmsync")
                .join("crmsync.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"salesforce.login_url"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn check_http_url(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.is_empty() {
        return;
    }
    match url::Url::parse(value) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        Ok(u) => errors.push(ValidationError {
            field: field.into(),
            message: format!("unsupported scheme '{}'; expected http or https", u.scheme()),
        }),
        Err(e) => errors.push(ValidationError {
            field: field.into(),
            message: format!("invalid URL '{value}': {e}"),
        }),
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let sf = &self.salesforce;

        // --- salesforce ---
        let required = [
            ("salesforce.username", &sf.username),
            ("salesforce.password", &sf.password),
            ("salesforce.security_token", &sf.security_token),
            ("salesforce.instance_url", &sf.instance_url),
            ("salesforce.login_url", &sf.login_url),
            ("salesforce.client_id", &sf.client_id),
            ("salesforce.client_secret", &sf.client_secret),
            ("salesforce.api_version", &sf.api_version),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "is required".into(),
                });
            }
        }

        check_http_url("salesforce.instance_url", &sf.instance_url, &mut errors);
        check_http_url("salesforce.login_url", &sf.login_url, &mut errors);

        if sf.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "salesforce.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- sync ---
        if self.sync.interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.lookback_secs == Some(0) {
            errors.push(ValidationError {
                field: "sync.lookback_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "is required".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use crmsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .salesforce_instance_url("https://example.my.salesforce.com")
///     .sync_interval_secs(600)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- salesforce ---

    /// Set username, password and security token in one call.
    pub fn salesforce_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        self.config.salesforce.username = username.into();
        self.config.salesforce.password = password.into();
        self.config.salesforce.security_token = security_token.into();
        self
    }

    /// Set the OAuth2 connected-app client id and secret.
    pub fn salesforce_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.config.salesforce.client_id = client_id.into();
        self.config.salesforce.client_secret = client_secret.into();
        self
    }

    pub fn salesforce_instance_url(mut self, url: impl Into<String>) -> Self {
        self.config.salesforce.instance_url = url.into();
        self
    }

    pub fn salesforce_login_url(mut self, url: impl Into<String>) -> Self {
        self.config.salesforce.login_url = url.into();
        self
    }

    pub fn salesforce_api_version(mut self, version: impl Into<String>) -> Self {
        self.config.salesforce.api_version = version.into();
        self
    }

    pub fn salesforce_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.salesforce.request_timeout_secs = seconds;
        self
    }

    pub fn salesforce_field_mapping(mut self, mapping: FieldMapping) -> Self {
        self.config.salesforce.field_mapping = mapping;
        self
    }

    // --- sync ---

    pub fn sync_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.interval_secs = seconds;
        self
    }

    pub fn sync_lookback_secs(mut self, seconds: u64) -> Self {
        self.config.sync.lookback_secs = Some(seconds);
        self
    }

    // --- database ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
