//! Configuration module for the practice engine backend.

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Provider category TTL defaults (spec §4.3).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_time_ms: u64,
    pub ttl_market_ms: u64,
    pub ttl_crypto_ms: u64,
    pub ttl_weather_ms: u64,
    pub ttl_fx_ms: u64,
    pub stale_grace_ms: u64,
    pub stale_while_revalidate: bool,
    pub cleanup_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_time_ms: 1_000,
            ttl_market_ms: 30_000,
            ttl_crypto_ms: 30_000,
            ttl_weather_ms: 5 * 60_000,
            ttl_fx_ms: 60 * 60_000,
            stale_grace_ms: 30_000,
            stale_while_revalidate: true,
            cleanup_interval_ms: 60_000,
        }
    }
}

/// Reminder schedule defaults (spec §4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub first_hour: u32,
    pub last_hour: u32,
    pub interval_hours: u32,
    pub max_per_day: u32,
    pub quiet_days: Vec<chrono::Weekday>,
    pub shrink_on_escalation: bool,
    pub dispatch_tick_ms: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            first_hour: 9,
            last_hour: 19,
            interval_hours: 4,
            max_per_day: 4,
            quiet_days: Vec::new(),
            shrink_on_escalation: true,
            dispatch_tick_ms: 60_000,
        }
    }
}

/// LLM curriculum structurer defaults (spec §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "curriculum-structurer-default".to_string(),
            temperature: 0.4,
            timeout_ms: 60_000,
            max_retries: 2,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to bind the HTTP server to.
    pub bind_address: String,
    /// JWT secret for bearer-token verification.
    pub jwt_secret: String,
    /// Base64-encoded AES-256 key. Absent ⇒ plaintext envelope mode
    /// (spec §9 design note; resolved as an explicit valid mode in
    /// SPEC_FULL.md §6).
    pub encryption_key_base64: Option<String>,
    /// Redis connection string, only consulted when built with the
    /// `redis-backend` feature.
    pub redis_url: Option<String>,
    /// Default timezone used when a user has no active Goal to derive one
    /// from (spec §4.4 step 2).
    pub default_timezone: String,
    /// Consecutive passes required before a Skill is mastered (spec §3).
    pub mastery_threshold: u32,
    pub cache: CacheConfig,
    pub reminder: ReminderConfig,
    pub llm: LlmConfig,
    /// Per-provider-fetch timeout (spec §5: providers ≤ 5s default).
    pub provider_timeout_ms: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bind_address: env_var_or("BIND_ADDRESS", "0.0.0.0:8080"),
            jwt_secret: env_var("JWT_SECRET")?,
            encryption_key_base64: env::var("ENCRYPTION_KEY_BASE64").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            default_timezone: env_var_or("DEFAULT_TIMEZONE", "UTC"),
            mastery_threshold: env_var_parsed_or("MASTERY_THRESHOLD", 3)?,
            cache: CacheConfig::default(),
            reminder: ReminderConfig::default(),
            llm: LlmConfig::default(),
            provider_timeout_ms: env_var_parsed_or("PROVIDER_TIMEOUT_MS", 5_000)?,
        })
    }
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_var_parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), val)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_or_uses_default() {
        let val = env_var_or("NON_EXISTENT_VAR_12345", "default_value");
        assert_eq!(val, "default_value");
    }

    #[test]
    fn cache_config_defaults_match_spec() {
        let c = CacheConfig::default();
        assert_eq!(c.max_entries, 10_000);
        assert_eq!(c.ttl_fx_ms, 60 * 60_000);
    }

    #[test]
    fn reminder_config_defaults_match_spec() {
        let r = ReminderConfig::default();
        assert_eq!(
            (r.first_hour, r.last_hour, r.interval_hours, r.max_per_day),
            (9, 19, 4, 4)
        );
    }
}
