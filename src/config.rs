use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Runtime settings, read once from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub gemini: GeminiConfig,
    pub discord_webhook_url: Option<String>,
    pub bot_prefix: String,
    /// Shared secret the bot relay must send as `X-Bot-Token`; open when unset.
    pub bot_token: Option<String>,
    pub cycle_start_day: u32,
    pub daily_check_hour: u32,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub daily_limit: i64,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            daily_limit: 20,
            timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Defaults for everything except the database location.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_max_connections: 5,
            gemini: GeminiConfig::default(),
            discord_webhook_url: None,
            bot_prefix: "!".to_string(),
            bot_token: None,
            cycle_start_day: crate::cycle::DEFAULT_START_DAY,
            daily_check_hour: 9,
        }
    }

    pub fn from_env() -> AppResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL must be set".into()))?;

        let defaults = Self::with_database_url(database_url);

        let cycle_start_day: u32 = parse_var("CYCLE_START_DAY", defaults.cycle_start_day)?;
        if !(1..=28).contains(&cycle_start_day) {
            return Err(AppError::Config(format!(
                "CYCLE_START_DAY must be between 1 and 28, got {cycle_start_day}"
            )));
        }
        let daily_check_hour: u32 = parse_var("DAILY_CHECK_HOUR", defaults.daily_check_hour)?;
        if daily_check_hour > 23 {
            return Err(AppError::Config(format!(
                "DAILY_CHECK_HOUR must be between 0 and 23, got {daily_check_hour}"
            )));
        }

        let gemini_defaults = defaults.gemini.clone();
        let gemini = GeminiConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            model: non_empty_var("GEMINI_MODEL").unwrap_or(gemini_defaults.model),
            base_url: non_empty_var("GEMINI_BASE_URL").unwrap_or(gemini_defaults.base_url),
            daily_limit: parse_var("GEMINI_DAILY_LIMIT", gemini_defaults.daily_limit)?,
            timeout_secs: parse_var("GEMINI_TIMEOUT_SECS", gemini_defaults.timeout_secs)?,
        };

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            gemini,
            discord_webhook_url: non_empty_var("DISCORD_WEBHOOK_URL"),
            bot_prefix: non_empty_var("BOT_PREFIX").unwrap_or(defaults.bot_prefix.clone()),
            bot_token: non_empty_var("BOT_API_TOKEN"),
            cycle_start_day,
            daily_check_hour,
            ..defaults
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        None => Ok(default),
        Some(raw) => parse_value(key, &raw),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::Config(format!("invalid value for {key} ({raw:?}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_reports_the_key() {
        let err = parse_value::<u32>("DAILY_CHECK_HOUR", "nine").unwrap_err();
        assert!(err.to_string().contains("DAILY_CHECK_HOUR"));
    }

    #[test]
    fn parse_value_accepts_socket_addr() {
        let addr: SocketAddr = parse_value("BIND_ADDR", "0.0.0.0:8080").unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn defaults_follow_a_26th_cycle() {
        let cfg = AppConfig::with_database_url("mysql://localhost/finance");
        assert_eq!(cfg.cycle_start_day, 26);
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.bot_prefix, "!");
    }

    #[test]
    fn gemini_defaults() {
        let cfg = GeminiConfig::default();
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(cfg.daily_limit, 20);
    }
}
