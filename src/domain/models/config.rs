use serde::{Deserialize, Serialize};

/// Main configuration structure for tgcontacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Migration engine configuration
    #[serde(default)]
    pub migrations: MigrationsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Seconds allowed for opening the database
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,

    /// Seconds a statement waits on a locked database before failing
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> String {
    "./data/contacts.db".to_string()
}

const fn default_open_timeout_secs() -> u64 {
    30
}

const fn default_busy_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            open_timeout_secs: default_open_timeout_secs(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// What to do when the migration ledger exists but cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReadPolicy {
    /// Surface the read error.
    #[default]
    Strict,
    /// Log a warning and treat the ledger as empty.
    Lenient,
}

/// Migration engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MigrationsConfig {
    #[serde(default)]
    pub ledger_read_policy: LedgerReadPolicy,
}
