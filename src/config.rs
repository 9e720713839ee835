//! Runtime configuration
//!
//! Read once from the environment (after `.env` has been loaded).

use crate::error::DraftingError;
use crate::Result;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REPLY_DELAY_MS: u64 = 400;
const DEFAULT_MENU_DELAY_MS: u64 = 1200;
const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres URL for the transcript store; in-memory when absent
    pub database_url: Option<String>,
    /// Dashboard record API; in-memory records when absent
    pub records_base_url: Option<String>,
    pub reply_delay: Duration,
    pub menu_delay: Duration,
    /// HTTP sessions idle this long are dropped from memory
    pub session_idle: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            records_base_url: None,
            reply_delay: Duration::from_millis(DEFAULT_REPLY_DELAY_MS),
            menu_delay: Duration::from_millis(DEFAULT_MENU_DELAY_MS),
            session_idle: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| DraftingError::ConfigError(format!("Invalid port {:?}: {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            database_url: non_empty("POSTGRES_URL").or_else(|| non_empty("DATABASE_URL")),
            records_base_url: non_empty("DASHBOARD_API_BASE_URL"),
            reply_delay: Duration::from_millis(number(
                non_empty("REPLY_DELAY_MS"),
                "REPLY_DELAY_MS",
                DEFAULT_REPLY_DELAY_MS,
            )?),
            menu_delay: Duration::from_millis(number(
                non_empty("MENU_DELAY_MS"),
                "MENU_DELAY_MS",
                DEFAULT_MENU_DELAY_MS,
            )?),
            session_idle: Duration::from_secs(number(
                non_empty("SESSION_IDLE_SECS"),
                "SESSION_IDLE_SECS",
                DEFAULT_SESSION_IDLE_SECS,
            )?),
        })
    }
}

fn number(raw: Option<String>, key: &str, default: u64) -> Result<u64> {
    match raw {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
            DraftingError::ConfigError(format!("Invalid {} {:?}: {}", key, raw, e))
        }),
        None => Ok(default),
    }
}
