//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use domain::{OrderPolicy, StockPolicy, TransitionTable};
use notify::DispatcherConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Which status transitions `PUT /orders/{id}` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionMode {
    /// Any status may move to any other.
    #[default]
    Permissive,
    /// Only forward lifecycle moves.
    Lifecycle,
}

impl FromStr for TransitionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionMode::Permissive),
            "lifecycle" | "strict" => Ok(TransitionMode::Lifecycle),
            other => Err(format!("unknown transition mode: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: Postgres URL; unset runs on the in-memory store
/// - `RETURN_WINDOW_DAYS`: days after the order date a return is honored; must be
///   positive (default: `7`)
/// - `STOCK_RESERVE_MARGIN`: extra units taken per stock decrement (default: `0`)
/// - `ORDER_TRANSITIONS`: `permissive` or `lifecycle` (default: `permissive`)
/// - `NOTIFY_MAX_ATTEMPTS`: email delivery attempts (default: `3`)
/// - `NOTIFY_QUEUE_CAPACITY`: pending notifications before events are dropped
///   (default: `1024`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub return_window_days: u32,
    pub stock_reserve_margin: u32,
    pub transitions: TransitionMode,
    pub notify_max_attempts: u32,
    pub notify_queue_capacity: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Unparseable values fall back to the default as well.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: env_or("LOG_FORMAT", defaults.log_format),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            return_window_days: parse_positive_or(
                std::env::var("RETURN_WINDOW_DAYS").ok().as_deref(),
                defaults.return_window_days,
            ),
            stock_reserve_margin: env_or("STOCK_RESERVE_MARGIN", defaults.stock_reserve_margin),
            transitions: env_or("ORDER_TRANSITIONS", defaults.transitions),
            notify_max_attempts: env_or("NOTIFY_MAX_ATTEMPTS", defaults.notify_max_attempts),
            notify_queue_capacity: env_or("NOTIFY_QUEUE_CAPACITY", defaults.notify_queue_capacity),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn order_policy(&self) -> OrderPolicy {
        OrderPolicy::with_return_window_days(self.return_window_days)
    }

    pub fn stock_policy(&self) -> StockPolicy {
        StockPolicy::with_reserve_margin(self.stock_reserve_margin)
    }

    pub fn transition_table(&self) -> TransitionTable {
        match self.transitions {
            TransitionMode::Permissive => TransitionTable::permissive(),
            TransitionMode::Lifecycle => TransitionTable::lifecycle(),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_attempts: self.notify_max_attempts,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            return_window_days: 7,
            stock_reserve_margin: 0,
            transitions: TransitionMode::Permissive,
            notify_max_attempts: 3,
            notify_queue_capacity: 1024,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Zero, negative and unparseable values all yield `default`.
fn parse_positive_or(raw: Option<&str>, default: u32) -> u32 {
    match parse_or(raw, default) {
        0 => default,
        n => n,
    }
}
