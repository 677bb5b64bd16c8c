use crate::auth::password::{DEFAULT_ROUNDS, MIN_ROUNDS};
use crate::auth::policy::DEFAULT_MIN_PASSWORD_LEN;
use crate::auth::{PasswordHashing, PasswordPolicy, StoreOptions};
use anyhow::{bail, Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the user's home holding config and database.
pub const APP_DIR: &str = ".userdesk";

pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_DB_FILE: &str = "users.db";

// ── Top-level config ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Path the config was loaded from. Not serialized.
    #[serde(skip)]
    #[schemars(skip)]
    pub config_path: PathBuf,

    pub database: DatabaseConfig,

    pub password: PasswordConfig,

    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_FILE),
            database: DatabaseConfig::default(),
            password: PasswordConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Relative paths resolve against the config file's
    /// directory. Empty means `users.db` next to the config file.
    pub path: PathBuf,
    /// How long to wait on another process's write lock.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE),
            busy_timeout_ms: 5_000,
        }
    }
}

/// `[password]` section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct PasswordConfig {
    /// Minimum password length in characters.
    pub min_length: usize,
    /// PBKDF2-HMAC-SHA256 iterations for newly hashed passwords.
    pub pbkdf2_rounds: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LEN,
            pbkdf2_rounds: DEFAULT_ROUNDS,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// `~/.userdesk`, or `.userdesk` in the working directory when no home
/// directory can be resolved.
pub fn default_app_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|u| u.home_dir().join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(APP_DIR))
}

impl Config {
    /// Load from `path`, or from `~/.userdesk/config.toml` when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_app_dir().join(CONFIG_FILE));

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config {}", config_path.display()))?
        } else {
            Config::default()
        };
        config.config_path = config_path;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.password.min_length == 0 {
            bail!("password.min_length must be at least 1");
        }
        if self.password.pbkdf2_rounds < MIN_ROUNDS {
            bail!(
                "password.pbkdf2_rounds must be at least {MIN_ROUNDS}, got {}",
                self.password.pbkdf2_rounds
            );
        }
        if self.database.path.as_os_str().is_empty() {
            bail!("database.path cannot be empty");
        }
        Ok(())
    }

    /// Whether `config_path` points at an existing file.
    pub fn has_file(&self) -> bool {
        self.config_path.is_file()
    }

    /// Directory the config file lives in.
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Database path with relative paths resolved against the config dir.
    pub fn database_path(&self) -> PathBuf {
        if self.database.path.is_absolute() {
            self.database.path.clone()
        } else {
            self.config_dir().join(&self.database.path)
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
            hashing: PasswordHashing::new(self.password.pbkdf2_rounds),
            policy: PasswordPolicy {
                min_length: self.password.min_length,
            },
        }
    }

    /// Write this config to `config_path`, creating the parent directory.
    /// Refuses to overwrite an existing file.
    pub fn save_new(&self) -> Result<()> {
        if self.config_path.exists() {
            bail!("Config already exists at {}", self.config_path.display());
        }
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;
        Ok(())
    }

    /// JSON Schema for the config file.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        serde_json::to_string_pretty(&schema).context("Failed to render config schema")
    }
}
