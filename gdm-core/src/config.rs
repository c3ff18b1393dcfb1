use std::env;

use tracing::warn;

use crate::errors::ConfigError;

/// Upper bound for `PRICE_DECIMALS`.
pub const MAX_PRICE_DECIMALS: u32 = 6;

/// Runtime environment used by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

/// Global configuration shared by the admin service, the scheduler and the CLI.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub environment: Environment,
    pub http_bind: String,
    pub rules_path: Option<String>,
    pub fields_path: Option<String>,
    pub admin_token: Option<String>,
    pub cron_interval_secs: u64,
    pub currency_symbol: String,
    pub price_decimals: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            http_bind: "0.0.0.0:8081".to_string(),
            rules_path: None,
            fields_path: None,
            admin_token: None,
            cron_interval_secs: 3600,
            currency_symbol: "$".to_string(),
            price_decimals: 2,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment using the `GDM_` prefix.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix("GDM_")
    }

    /// Loads configuration from env vars prefixed with the provided value (e.g. `GDM_`).
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |suffix: &str| format!("{}{}", prefix, suffix);
        let defaults = CoreConfig::default();

        let environment = lookup(&key("ENV"))
            .map(|raw| Environment::from_str(&raw))
            .unwrap_or_default();

        let http_bind = lookup(&key("HTTP_BIND")).unwrap_or(defaults.http_bind);
        let rules_path = lookup(&key("RULES_PATH")).filter(|value| !value.is_empty());
        let fields_path = lookup(&key("FIELDS_PATH")).filter(|value| !value.is_empty());
        let admin_token = lookup(&key("ADMIN_TOKEN")).filter(|value| !value.is_empty());

        let interval_key = key("CRON_INTERVAL_SECS");
        let cron_interval_secs = match lookup(&interval_key) {
            Some(raw) => parse_number(&interval_key, &raw)?,
            None => defaults.cron_interval_secs,
        };

        let currency_symbol = lookup(&key("CURRENCY_SYMBOL")).unwrap_or(defaults.currency_symbol);

        let decimals_key = key("PRICE_DECIMALS");
        let price_decimals = match lookup(&decimals_key) {
            Some(raw) => parse_number::<u32>(&decimals_key, &raw)?,
            None => defaults.price_decimals,
        };
        if price_decimals > MAX_PRICE_DECIMALS {
            warn!(key = %decimals_key, value = price_decimals, max = MAX_PRICE_DECIMALS, "price decimals clamped");
        }
        let price_decimals = price_decimals.min(MAX_PRICE_DECIMALS);

        Ok(Self {
            environment,
            http_bind,
            rules_path,
            fields_path,
            admin_token,
            cron_interval_secs,
            currency_symbol,
            price_decimals,
        })
    }

    /// Whether the service is running in production.
    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidEnvVar {
            key: key.to_string(),
            value: raw.to_string(),
        })
}
