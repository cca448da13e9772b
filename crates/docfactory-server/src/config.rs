//! Server configuration management

use crate::error::{ApiError, Result};
use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Page size used when a listing request does not ask for one
    pub default_page_limit: usize,

    /// CORS allowed origins, `*` allows any
    pub cors_origins: Vec<String>,

    /// Upper bound on request body size
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: lookup("HOST")
                .map(|host| host.trim().to_string())
                .filter(|host| !host.is_empty())
                .unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            default_page_limit: parse_var(&lookup, "DEFAULT_PAGE_LIMIT", defaults.default_page_limit)?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes)?,
        };

        if config.default_page_limit == 0 {
            return Err(ApiError::Config(
                "DEFAULT_PAGE_LIMIT must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    /// CORS policy for the configured origins
    pub fn cors_layer(&self) -> CorsLayer {
        if self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*") {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ApiError::Config(format!("Invalid {name} value"))),
        None => Ok(default),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            default_page_limit: 50,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 1024 * 1024,
        }
    }
}
