use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

#[derive(Debug, Clone)]
pub struct HumidityConfig {
    pub common: core_config::Config,
    pub sensor: SensorConfig,
    pub expo: ExpoConfig,
    pub alert: AlertConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Endpoint returning `{"humidity": <number>}`.
    pub api_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl SensorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ExpoConfig {
    pub api_url: String,
    /// Device push token every alert is addressed to.
    pub token: Secret<String>,
    pub timeout_secs: u64,
    pub enabled: bool,
}

impl ExpoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Alerts fire when humidity is strictly below this value.
    pub threshold: f64,
    pub title: String,
    pub check_interval_secs: u64,
}

impl AlertConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl HumidityConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let expo_token = get_env("EXPO_TOKEN", Some(""), is_prod)?;
        let upstream_timeout = parse_env("UPSTREAM_TIMEOUT_SECS", Some("10"), is_prod)?;
        let check_interval_secs: u64 =
            parse_env("HUMIDITY_CHECK_INTERVAL_SECS", Some("300"), is_prod)?;
        if check_interval_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "HUMIDITY_CHECK_INTERVAL_SECS must be greater than zero"
            )));
        }
        check_duration_secs("HUMIDITY_CHECK_INTERVAL_SECS", check_interval_secs)?;
        let cache_ttl_secs: u64 = parse_env("HUMIDITY_CACHE_TTL_SECS", Some("600"), is_prod)?;
        check_duration_secs("HUMIDITY_CACHE_TTL_SECS", cache_ttl_secs)?;

        Ok(HumidityConfig {
            common: common_config,
            sensor: SensorConfig {
                api_url: get_env("EXTERNAL_API_URL", None, is_prod)?,
                timeout_secs: upstream_timeout,
                cache_ttl_secs,
            },
            expo: ExpoConfig {
                api_url: get_env("EXPO_API_NOTIFICATION", Some(DEFAULT_EXPO_PUSH_URL), is_prod)?,
                enabled: !expo_token.is_empty(),
                token: Secret::new(expo_token),
                timeout_secs: upstream_timeout,
            },
            alert: AlertConfig {
                threshold: parse_env("HUMIDITY_ALERT_THRESHOLD", Some("30"), is_prod)?,
                title: get_env("HUMIDITY_ALERT_TITLE", Some("Alerta de Umidade"), is_prod)?,
                check_interval_secs,
            },
            observability: ObservabilityConfig {
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, default, is_prod)?;
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

/// Largest accepted TTL or interval, in seconds (about 136 years).
pub const MAX_DURATION_SECS: u64 = u32::MAX as u64;

/// Durations are added to `Instant::now()`; reject values that cannot be.
fn check_duration_secs(key: &str, secs: u64) -> Result<(), AppError> {
    let fits = secs <= MAX_DURATION_SECS
        && Instant::now()
            .checked_add(Duration::from_secs(secs))
            .is_some();

    if fits {
        Ok(())
    } else {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be at most {} seconds, got {}",
            key,
            MAX_DURATION_SECS,
            secs
        )))
    }
}
