use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_TRIAL_PERIOD_DAYS: u32 = 30;
const DEFAULT_OUTBOUND_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_WEBHOOK_TOLERANCE_SECONDS: i64 = 300;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
// 200ms/token (~5 req/sec) with short bursts
const DEFAULT_RATE_LIMIT_MS: u64 = 200;
const DEFAULT_RATE_LIMIT_BURST: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub webhook_tolerance_seconds: i64,
}

#[derive(Clone)]
pub struct CoreApiSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub per_millisecond: u64,
    pub burst: u32,
}

#[derive(Clone)]
pub struct Config {
    pub frontend_origin: String,
    pub stripe: StripeSettings,
    pub core_api: CoreApiSettings,
    pub trial_period_days: u32,
    pub outbound_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub rate_limit: RateLimitSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Every credential is
    /// mandatory; there is no degraded mode without them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let stripe = StripeSettings {
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            webhook_tolerance_seconds: parse_or(
                &lookup,
                "WEBHOOK_TOLERANCE_SECONDS",
                DEFAULT_WEBHOOK_TOLERANCE_SECONDS,
            )?,
        };
        let core_api = CoreApiSettings {
            base_url: required("CORE_API_BASE_URL")?,
            api_key: required("CORE_API_KEY")?,
        };
        let frontend_origin = required("FRONTEND_ORIGIN")?
            .trim_end_matches('/')
            .to_string();

        let log_format = match lookup("LOG_FORMAT").map(|v| v.trim().to_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v.is_empty() || v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: v,
                })
            }
        };

        Ok(Config {
            frontend_origin,
            stripe,
            core_api,
            trial_period_days: parse_or(&lookup, "TRIAL_PERIOD_DAYS", DEFAULT_TRIAL_PERIOD_DAYS)?,
            outbound_timeout: Duration::from_secs(parse_or(
                &lookup,
                "OUTBOUND_TIMEOUT_SECONDS",
                DEFAULT_OUTBOUND_TIMEOUT_SECONDS,
            )?),
            bind_addr: parse_or(
                &lookup,
                "BIND_ADDR",
                DEFAULT_BIND_ADDR
                    .parse::<SocketAddr>()
                    .map_err(|_| ConfigError::Invalid {
                        key: "BIND_ADDR",
                        value: DEFAULT_BIND_ADDR.to_string(),
                    })?,
            )?,
            log_format,
            rate_limit: RateLimitSettings {
                per_millisecond: parse_or(
                    &lookup,
                    "RATE_LIMITER_MILLISECONDS",
                    DEFAULT_RATE_LIMIT_MS,
                )?,
                burst: parse_or(&lookup, "RATE_LIMITER_BURST", DEFAULT_RATE_LIMIT_BURST)?,
            },
        })
    }

    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/signup/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_origin
        )
    }

    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/signup/cancel", self.frontend_origin)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_1"),
            ("CORE_API_BASE_URL", "https://core.test/api"),
            ("CORE_API_KEY", "core-key"),
            ("FRONTEND_ORIGIN", "https://app.example.com/"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.frontend_origin, "https://app.example.com");
        assert_eq!(config.trial_period_days, 30);
        assert_eq!(config.outbound_timeout, Duration::from_secs(10));
        assert_eq!(config.stripe.webhook_tolerance_seconds, 300);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(
            config.checkout_success_url(),
            "https://app.example.com/signup/success?session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn every_credential_is_required() {
        for key in [
            "STRIPE_SECRET_KEY",
            "STRIPE_WEBHOOK_SECRET",
            "CORE_API_BASE_URL",
            "CORE_API_KEY",
            "FRONTEND_ORIGIN",
        ] {
            let mut env = base_env();
            env.remove(key);
            assert_eq!(load(&env).err(), Some(ConfigError::Missing(key)));

            let mut env = base_env();
            env.insert(key, "   ");
            assert_eq!(load(&env).err(), Some(ConfigError::Missing(key)));
        }
    }

    #[test]
    fn malformed_optional_values_are_fatal() {
        let mut env = base_env();
        env.insert("TRIAL_PERIOD_DAYS", "two weeks");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                key: "TRIAL_PERIOD_DAYS",
                ..
            })
        ));

        let mut env = base_env();
        env.insert("LOG_FORMAT", "xml");
        assert!(load(&env).is_err());
    }

    #[test]
    fn optional_overrides_are_applied() {
        let mut env = base_env();
        env.insert("TRIAL_PERIOD_DAYS", "14");
        env.insert("OUTBOUND_TIMEOUT_SECONDS", "3");
        env.insert("LOG_FORMAT", "JSON");
        env.insert("BIND_ADDR", "0.0.0.0:8080");
        let config = load(&env).unwrap();
        assert_eq!(config.trial_period_days, 14);
        assert_eq!(config.outbound_timeout, Duration::from_secs(3));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_addr.port(), 8080);
    }
}
