//! Server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable | Default |
//! |---|---|
//! | `STOCKROOM_BIND_ADDR` | `127.0.0.1:8000` |
//! | `STOCKROOM_DB_PATH` | `./stockroom.db` |
//! | `STOCKROOM_SESSION_SECRET` | development secret (warned about) |
//! | `STOCKROOM_SESSION_LIFETIME_SECS` | `43200` (12 hours) |
//! | `STOCKROOM_LOW_STOCK_THRESHOLD` | `5` |
//! | `STOCKROOM_CURRENCY_SYMBOL` | `$` |
//! | `STOCKROOM_SECURE_COOKIES` | `false` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use stockroom_core::{Money, DEFAULT_LOW_STOCK_THRESHOLD};

/// Secret used when `STOCKROOM_SESSION_SECRET` is unset. Never deploy with it.
pub const DEV_SESSION_SECRET: &str = "stockroom-dev-secret-change-in-production";

/// Server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    /// HS256 key for session tokens
    #[serde(skip_serializing)]
    pub session_secret: String,

    /// Session token lifetime in seconds
    pub session_lifetime_secs: i64,

    /// Products at or below this quantity are listed as low stock
    pub low_stock_threshold: i64,

    /// Prefix for formatted amounts in views
    pub currency_symbol: String,

    /// Adds `Secure` to cookies (serve over HTTPS)
    pub secure_cookies: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ServerConfig {
            bind_addr: parse_var(&lookup, "STOCKROOM_BIND_ADDR", "127.0.0.1:8000")?,

            database_path: lookup("STOCKROOM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./stockroom.db")),

            session_secret: lookup("STOCKROOM_SESSION_SECRET")
                .unwrap_or_else(|| DEV_SESSION_SECRET.to_string()),

            session_lifetime_secs: parse_var(&lookup, "STOCKROOM_SESSION_LIFETIME_SECS", "43200")?,

            low_stock_threshold: match lookup("STOCKROOM_LOW_STOCK_THRESHOLD") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidValue("STOCKROOM_LOW_STOCK_THRESHOLD".to_string())
                })?,
                None => DEFAULT_LOW_STOCK_THRESHOLD,
            },

            currency_symbol: lookup("STOCKROOM_CURRENCY_SYMBOL").unwrap_or_else(|| "$".to_string()),

            secure_cookies: parse_var(&lookup, "STOCKROOM_SECURE_COOKIES", "false")?,
        };

        if config.session_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKROOM_SESSION_LIFETIME_SECS".to_string(),
            ));
        }
        if config.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKROOM_LOW_STOCK_THRESHOLD".to_string(),
            ));
        }
        if config.session_secret.is_empty() {
            return Err(ConfigError::MissingRequired(
                "STOCKROOM_SESSION_SECRET".to_string(),
            ));
        }

        Ok(config)
    }

    /// Configuration for tests: in-memory friendly, fixed secret.
    pub fn for_tests() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_path: PathBuf::from(":memory:"),
            session_secret: "test-secret".to_string(),
            session_lifetime_secs: 3600,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            currency_symbol: "$".to_string(),
            secure_cookies: false,
        }
    }

    /// True when running with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }

    /// Formats an amount for display, e.g. `$1,250.00`.
    pub fn format_currency(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let cents = amount.cents().unsigned_abs();
        let whole = group_thousands(cents / 100);
        format!("{sign}{}{whole}.{:02}", self.currency_symbol, cents % 100)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.database_path, PathBuf::from("./stockroom.db"));
        assert_eq!(config.session_lifetime_secs, 43200);
        assert_eq!(config.low_stock_threshold, 5);
        assert_eq!(config.currency_symbol, "$");
        assert!(!config.secure_cookies);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STOCKROOM_BIND_ADDR", "0.0.0.0:9000"),
            ("STOCKROOM_LOW_STOCK_THRESHOLD", "2"),
            ("STOCKROOM_SESSION_SECRET", "s3cret"),
            ("STOCKROOM_SECURE_COOKIES", "true"),
            ("STOCKROOM_CURRENCY_SYMBOL", "₦"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.low_stock_threshold, 2);
        assert!(config.secure_cookies);
        assert!(!config.uses_dev_secret());
        assert_eq!(config.currency_symbol, "₦");
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("STOCKROOM_LOW_STOCK_THRESHOLD", "lots")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for STOCKROOM_LOW_STOCK_THRESHOLD");

        let err = load(&[("STOCKROOM_SESSION_LIFETIME_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));

        assert!(load(&[("STOCKROOM_BIND_ADDR", "nowhere")]).is_err());
        assert!(load(&[("STOCKROOM_SESSION_SECRET", "")]).is_err());
    }

    #[test]
    fn test_format_currency() {
        let config = ServerConfig::for_tests();
        assert_eq!(config.format_currency(Money::from_cents(0)), "$0.00");
        assert_eq!(config.format_currency(Money::from_cents(1099)), "$10.99");
        assert_eq!(config.format_currency(Money::from_cents(125_000)), "$1,250.00");
        assert_eq!(config.format_currency(Money::from_cents(123_456_789)), "$1,234,567.89");
        assert_eq!(config.format_currency(Money::from_cents(-505)), "-$5.05");
    }
}
