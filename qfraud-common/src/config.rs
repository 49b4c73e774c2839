//! Bootstrap configuration and root folder resolution
//!
//! Resolution order for the root folder (highest priority first):
//! 1. Command-line argument
//! 2. Environment variable (`QFRAUD_ROOT_FOLDER`, then `QFRAUD_ROOT`)
//! 3. TOML config file
//! 4. OS-dependent compiled default
//!
//! A missing or unreadable TOML file never stops startup; the resolver logs a
//! warning and falls through to the compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary environment variable for the root folder
pub const ROOT_FOLDER_ENV: &str = "QFRAUD_ROOT_FOLDER";
/// Alternate (shorter) environment variable for the root folder
pub const ROOT_ENV: &str = "QFRAUD_ROOT";
/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "qfraud.db";

/// Built-in defaults used when nothing else is configured
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/qfraud (or /var/lib/qfraud for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("qfraud"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/qfraud"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("qfraud"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/qfraud"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("qfraud"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\qfraud"))
    } else {
        PathBuf::from("./qfraud_data")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

// ========================================
// TOML configuration
// ========================================

/// Contents of `<module>.toml`
///
/// Every section is optional. Unknown keys are ignored so older files keep
/// loading after new settings are added.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

/// HTTP listener and notification channel settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Events buffered per subscriber before the oldest are dropped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Training worker pool, optimizer and result store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of background training workers
    pub workers: usize,
    /// Jobs that may wait for a worker before new requests are refused
    pub queue_capacity: usize,
    pub epochs: usize,
    pub max_batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
    pub include_confusion_matrix: bool,
    /// Seconds a finished job result stays retrievable (0 = forever)
    pub result_ttl_secs: u64,
    /// Maximum number of stored job results
    pub max_results: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 16,
            epochs: 10,
            max_batch_size: 64,
            learning_rate: 0.1,
            seed: 42,
            include_confusion_matrix: true,
            result_ttl_secs: 24 * 60 * 60,
            max_results: 1024,
        }
    }
}

/// CSV ingestion settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows parsed, validated and committed together
    pub chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { chunk_size: 5000 }
    }
}

/// Outbound mail settings for password reset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub sendgrid_api_key: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
}

impl MailConfig {
    /// Apply `SENDGRID_API_KEY` / `SENDGRID_FROM_EMAIL` on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = non_empty_env("SENDGRID_API_KEY") {
            self.sendgrid_api_key = Some(key);
        }
        if let Some(from) = non_empty_env("SENDGRID_FROM_EMAIL") {
            self.from_email = Some(from);
        }
        self
    }

    /// True when both the API key and the sender address are present
    pub fn is_configured(&self) -> bool {
        matches!(
            (&self.sendgrid_api_key, &self.from_email),
            (Some(key), Some(from)) if !key.is_empty() && !from.is_empty()
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
    }
}

// ========================================
// Root folder resolution
// ========================================

/// Resolves the root folder (and the TOML file it may come from) for one module
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_root_folder: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_root_folder: None,
            config_file: None,
        }
    }

    /// Root folder given on the command line (highest priority)
    pub fn with_cli_root_folder(mut self, root_folder: Option<PathBuf>) -> Self {
        self.cli_root_folder = root_folder;
        self
    }

    /// Explicit TOML file, replacing the platform lookup
    pub fn with_config_file(mut self, config_file: Option<PathBuf>) -> Self {
        self.config_file = config_file;
        self
    }

    /// Resolve the root folder following the documented priority order
    pub fn resolve(&self) -> PathBuf {
        self.resolve_from(|| self.load_toml().and_then(|config| config.root_folder))
    }

    /// Resolve the root folder using an already loaded TOML file
    pub fn resolve_with(&self, toml: Option<&TomlConfig>) -> PathBuf {
        self.resolve_from(|| toml.and_then(|config| config.root_folder.clone()))
    }

    fn resolve_from(&self, toml_root_folder: impl FnOnce() -> Option<PathBuf>) -> PathBuf {
        if let Some(path) = &self.cli_root_folder {
            return path.clone();
        }

        if let Some(path) = non_empty_env(ROOT_FOLDER_ENV) {
            return PathBuf::from(path);
        }
        if let Some(path) = non_empty_env(ROOT_ENV) {
            return PathBuf::from(path);
        }

        if let Some(root_folder) = toml_root_folder() {
            return root_folder;
        }

        CompiledDefaults::for_current_platform().root_folder
    }

    /// Load the module's TOML file, or `None` if there is no usable file
    ///
    /// Problems with the file are logged and otherwise ignored.
    pub fn load_toml(&self) -> Option<TomlConfig> {
        match self.try_load_toml() {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring configuration file: {}", e);
                None
            }
        }
    }

    /// Load the module's TOML file without logging anything
    ///
    /// `Ok(None)` when no file exists at the platform locations. An explicit
    /// file that is missing, unreadable or malformed is an error, so a caller
    /// can report it once logging is up.
    pub fn try_load_toml(&self) -> Result<Option<TomlConfig>> {
        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
        }

        match self.config_file_path() {
            Some(path) => {
                let config = TomlConfig::from_file(&path)?;
                debug!("Loaded configuration from {}", path.display());
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    /// Location of the TOML file that would be used, if one exists
    pub fn config_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_file {
            return path.exists().then(|| path.clone());
        }

        let file_name = format!("{}.toml", self.module_name);
        let user_config = dirs::config_dir().map(|d| d.join("qfraud").join(&file_name));
        if let Some(path) = user_config.filter(|p| p.exists()) {
            return Some(path);
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/qfraud").join(&file_name);
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Creates the root folder and locates the database inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if missing; safe to call repeatedly
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
        } else if !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
