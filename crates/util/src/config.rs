use std::{env, fmt, net::SocketAddr};

use super::{database_url, server_bind_address};

const DEVELOPMENT_TOKEN_SECRET: &str = "placement-development-secret";
const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;
const DEFAULT_MAILER_FROM: &str = "placement-cell@localhost";

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Connection settings for the outbound mail relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub from_address: String,
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    pub token_secret: Vec<u8>,
    pub token_ttl_secs: u64,
    /// `None` keeps outgoing mail in the in-process outbox.
    pub mailer: Option<MailerConfig>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let token_secret = match non_empty_var("AUTH_TOKEN_SECRET") {
            Some(secret) => secret.into_bytes(),
            None if environment == Environment::Production => {
                return Err(ConfigError::MissingVar("AUTH_TOKEN_SECRET"));
            }
            None => DEVELOPMENT_TOKEN_SECRET.as_bytes().to_vec(),
        };

        let token_ttl_secs = match non_empty_var("AUTH_TOKEN_TTL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidTokenTtl(raw)),
            },
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        let mailer = non_empty_var("MAILER_URL").map(|base_url| MailerConfig {
            base_url,
            api_key: non_empty_var("MAILER_API_KEY"),
            from_address: non_empty_var("MAILER_FROM")
                .unwrap_or_else(|| DEFAULT_MAILER_FROM.to_string()),
        });

        Ok(Self {
            bind_addr,
            environment,
            database_url: database_url(),
            token_secret,
            token_ttl_secs,
            mailer,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingVar(&'static str),
    InvalidTokenTtl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingVar(key) => write!(f, "{key} must be set in production"),
            Self::InvalidTokenTtl(value) => write!(
                f,
                "AUTH_TOKEN_TTL_SECS must be a positive integer (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::ENV_GUARD;
    use crate::{DEFAULT_BIND_ADDR, DEFAULT_DATABASE_URL};

    fn clear_env() {
        for key in [
            "APP_ENV",
            "APP_BIND_ADDR",
            "DATABASE_URL",
            "AUTH_TOKEN_SECRET",
            "AUTH_TOKEN_TTL_SECS",
            "MAILER_URL",
            "MAILER_API_KEY",
            "MAILER_FROM",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.token_secret, DEVELOPMENT_TOKEN_SECRET.as_bytes());
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert!(config.mailer.is_none());
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        clear_env();
    }

    #[test]
    fn production_requires_token_secret() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("APP_ENV", "production");

        let err = AppConfig::from_env().expect_err("missing secret should error");
        assert!(matches!(err, ConfigError::MissingVar("AUTH_TOKEN_SECRET")));

        env::set_var("AUTH_TOKEN_SECRET", "s3cret");
        env::set_var("APP_BIND_ADDR", "0.0.0.0:9000");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.token_secret, b"s3cret");

        clear_env();
    }

    #[test]
    fn rejects_zero_token_ttl() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("AUTH_TOKEN_TTL_SECS", "0");

        let err = AppConfig::from_env().expect_err("zero ttl should error");
        assert!(matches!(err, ConfigError::InvalidTokenTtl(value) if value == "0"));

        clear_env();
    }

    #[test]
    fn mailer_settings_are_grouped() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear_env();
        env::set_var("MAILER_URL", "https://mail.example.edu/api/");
        env::set_var("MAILER_API_KEY", "key-1");

        let config = AppConfig::from_env().expect("config should load");
        let mailer = config.mailer.expect("mailer configured");
        assert_eq!(mailer.base_url, "https://mail.example.edu/api/");
        assert_eq!(mailer.api_key.as_deref(), Some("key-1"));
        assert_eq!(mailer.from_address, DEFAULT_MAILER_FROM);

        clear_env();
    }
}
