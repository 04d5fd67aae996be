//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `RUN_MIGRATIONS`: apply migrations at startup (default: `false`)
/// - `AUTH_SECRET`: bearer token for staff routes; they always answer 401 when unset
/// - `IS_PROD`: hide internal error details (default: `false`)
/// - `REQUEST_TIMEOUT_SECS`: per-request timeout (default: `10`)
/// - `TELEGRAM_BOT_TOKEN`: enables chat notifications and login codes
/// - `TELEGRAM_API_URL`: Bot API base (default: `"https://api.telegram.org"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub auth_secret: Option<String>,
    pub is_prod: bool,
    pub request_timeout: Duration,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match get("LOG_FORMAT").as_deref() {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: get("DATABASE_URL"),
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            run_migrations: get("RUN_MIGRATIONS")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.run_migrations),
            auth_secret: get("AUTH_SECRET"),
            is_prod: get("IS_PROD")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.is_prod),
            request_timeout: get("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api_url),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            run_migrations: false,
            auth_secret: None,
            is_prod: false,
            request_timeout: Duration::from_secs(10),
            telegram_bot_token: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = config_from(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 10);
        assert!(!config.run_migrations);
        assert!(config.auth_secret.is_none());
        assert!(!config.is_prod);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.telegram_api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_values_from_environment() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/caviar"),
            ("RUN_MIGRATIONS", "true"),
            ("AUTH_SECRET", "s3cret"),
            ("IS_PROD", "1"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/caviar"));
        assert!(config.run_migrations);
        assert_eq!(config.auth_secret.as_deref(), Some("s3cret"));
        assert!(config.is_prod);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.telegram_bot_token.as_deref(), Some("123:abc"));
    }

    #[test]
    fn test_blank_and_invalid_values_fall_back() {
        let config = config_from(&[("PORT", "http"), ("AUTH_SECRET", "  "), ("IS_PROD", "maybe")]);
        assert_eq!(config.port, 8080);
        assert!(config.auth_secret.is_none());
        assert!(!config.is_prod);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:3000");
    }
}
