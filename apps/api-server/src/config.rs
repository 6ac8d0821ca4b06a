//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
    /// Load the fixed seed dataset into both stores
    pub seed_data: bool,
    /// Serve the GraphiQL page on `GET /graphql`
    pub graphiql: bool,
}

fn parse_flag(field: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError {
            field,
            message: format!("Expected true or false, got '{}'", raw),
        }),
    }
}

fn parse_port(raw: Option<String>) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(8080),
        Some(s) => s.parse().map_err(|e| ConfigError {
            field: "PORT",
            message: format!("Invalid port '{}': {}", s, e),
        }),
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port(env::var("PORT").ok())?;

        // CORS allow origin
        let cors_origin_str = env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Log format
        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        let seed_data = parse_flag("SEED_DATA", env::var("SEED_DATA").ok(), true)?;
        let graphiql = parse_flag("GRAPHIQL", env::var("GRAPHIQL").ok(), true)?;

        Ok(Self {
            port,
            cors_allow_origin,
            log_format,
            seed_data,
            graphiql,
        })
    }

    /// Log warnings about configuration that is unsuitable outside development.
    pub fn warn_if_insecure(&self) {
        if self.cors_allow_origin == HeaderValue::from_static("*") {
            tracing::warn!("CORS_ALLOW_ORIGIN=*: any origin may call the API.");
        }
        if self.graphiql {
            tracing::warn!("GRAPHIQL is enabled: the GraphiQL IDE is served on GET /graphql.");
        }
    }
}
