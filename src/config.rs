//! Persistent application configuration model and defaults.

use std::time::Duration;

const MIN_DEBOUNCE_MS: u64 = 50;
const MAX_DEBOUNCE_MS: u64 = 10_000;
const MIN_FETCH_TIMEOUT_MS: u64 = 1_000;
const MAX_FETCH_TIMEOUT_MS: u64 = 120_000;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Suggestion lookup preferences.
    pub search: SearchConfig,
    #[serde(default)]
    /// Work queue behavior.
    pub queue: QueueConfig,
    #[serde(default)]
    /// Console log verbosity.
    pub logging: LoggingConfig,
}

/// Suggestion lookup preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SearchConfig {
    /// Quiet period a typed query must stay unchanged before it is searched.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Time the search command may run before it is killed.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// External command that prints the raw search page for a query.
    /// Every `{query}` occurrence is replaced with the URL-encoded query.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Work queue behavior.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub skip_query_source: SkipQuerySource,
}

/// Query text used when the queue advances to its next file.
#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SkipQuerySource {
    /// Re-key the search off the next file's name.
    #[default]
    FileName,
    /// Keep searching with whatever the user last typed.
    LiveQuery,
}

/// Console log verbosity.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl SearchConfig {
    pub fn debounce_period(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            timeout_ms: default_timeout_ms(),
            command: Vec::new(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    15_000
}

/// Clamps user-editable values into their supported ranges.
pub fn sanitize_config(config: Config) -> Config {
    let command = config
        .search
        .command
        .into_iter()
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect();

    Config {
        search: SearchConfig {
            debounce_ms: config
                .search
                .debounce_ms
                .clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS),
            timeout_ms: config
                .search
                .timeout_ms
                .clamp(MIN_FETCH_TIMEOUT_MS, MAX_FETCH_TIMEOUT_MS),
            command,
        },
        queue: config.queue,
        logging: config.logging,
    }
}
