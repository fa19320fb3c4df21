use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// How `averageTime` is derived when metrics are recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AverageTimeMode {
    #[default]
    Elapsed,
    Timestamp,
}

impl FromStr for AverageTimeMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "elapsed" => Ok(Self::Elapsed),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(format!("unknown average time mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub request_timeout_ms: u64,
    pub store_lock_timeout_ms: u64,
    pub max_partner_load: u32,
    pub average_time_mode: AverageTimeMode,
    pub event_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            request_timeout_ms: 5_000,
            store_lock_timeout_ms: 2_000,
            max_partner_load: 3,
            average_time_mode: AverageTimeMode::Elapsed,
            event_buffer_size: 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_or_default("LOG_FORMAT", defaults.log_format)?,
            request_timeout_ms: parse_or_default("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?,
            store_lock_timeout_ms: parse_or_default(
                "STORE_LOCK_TIMEOUT_MS",
                defaults.store_lock_timeout_ms,
            )?,
            max_partner_load: parse_or_default("MAX_PARTNER_LOAD", defaults.max_partner_load)?,
            average_time_mode: parse_or_default("AVERAGE_TIME_MODE", defaults.average_time_mode)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("REQUEST_TIMEOUT_MS", self.request_timeout_ms),
            ("STORE_LOCK_TIMEOUT_MS", self.store_lock_timeout_ms),
            ("MAX_PARTNER_LOAD", u64::from(self.max_partner_load)),
            ("EVENT_BUFFER_SIZE", self.event_buffer_size as u64),
        ];

        for (key, value) in positive {
            if value == 0 {
                return Err(AppError::Internal(format!("invalid {key}: must be > 0")));
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn store_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.store_lock_timeout_ms)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{AverageTimeMode, Config, LogFormat};

    #[test]
    fn average_time_mode_parses_case_insensitively() {
        assert_eq!("Elapsed".parse::<AverageTimeMode>(), Ok(AverageTimeMode::Elapsed));
        assert_eq!(" timestamp ".parse::<AverageTimeMode>(), Ok(AverageTimeMode::Timestamp));
        assert!("median".parse::<AverageTimeMode>().is_err());
    }

    #[test]
    fn log_format_rejects_unknown_values() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("pretty".parse::<LogFormat>().is_err());
    }

    #[test]
    fn defaults_cap_partner_load_at_three() {
        let config = Config::default();
        assert_eq!(config.max_partner_load, 3);
        assert_eq!(config.average_time_mode, AverageTimeMode::Elapsed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config = Config {
            request_timeout_ms: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_MS"));

        let config = Config {
            store_lock_timeout_ms: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("STORE_LOCK_TIMEOUT_MS"));
    }

    #[test]
    fn zero_capacity_settings_are_rejected() {
        for config in [
            Config {
                max_partner_load: 0,
                ..Config::default()
            },
            Config {
                event_buffer_size: 0,
                ..Config::default()
            },
        ] {
            assert!(config.validate().is_err());
        }
    }
}
