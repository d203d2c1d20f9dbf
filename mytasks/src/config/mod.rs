//! Configuration system for the `MyTasks` shell.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/mytasks/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;

use crate::auth::DEFAULT_MIN_PASSWORD_LENGTH;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    auth: AuthFileConfig,
    shell: ShellFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    settings_path: Option<PathBuf>,
}

/// `[auth]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AuthFileConfig {
    min_password_length: Option<usize>,
}

/// `[shell]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ShellFileConfig {
    date_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where the login settings blob is kept. `None` keeps it in memory.
    pub settings_path: Option<PathBuf>,
    /// Minimum password length enforced at registration.
    pub min_password_length: usize,
    /// Due-date display format string (chrono).
    pub date_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve an `AppConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        let settings_path = if cli.ephemeral {
            None
        } else {
            cli.settings_file
                .clone()
                .or_else(|| file.storage.settings_path.clone())
                .or(defaults.settings_path)
        };

        Self {
            settings_path,
            min_password_length: file
                .auth
                .min_password_length
                .unwrap_or(defaults.min_password_length),
            date_format: cli
                .date_format
                .clone()
                .or_else(|| file.shell.date_format.clone())
                .unwrap_or(defaults.date_format),
        }
    }
}

/// Default location of the settings blob (`<data dir>/mytasks/settings.bin`).
fn default_settings_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("mytasks").join("settings.bin"))
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task manager with authenticated sessions")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/mytasks/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to keep the login settings file.
    #[arg(long, env = "MYTASKS_SETTINGS_FILE")]
    pub settings_file: Option<PathBuf>,

    /// Keep login settings in memory only.
    #[arg(long)]
    pub ephemeral: bool,

    /// Due-date display format (chrono format string).
    #[arg(long)]
    pub date_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "MYTASKS_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/mytasks.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("mytasks").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
