//! Configuration module for the admin core.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin; API paths are resolved under `{server_base_url}/api`
    pub server_base_url: String,
    /// Bearer token sent with every request when present
    pub api_token: Option<String>,
    /// Path to the SQLite file holding the schema cache
    pub cache_path: PathBuf,
    /// Default page size for listings
    pub per_page: u32,
    /// Value of the client identity header
    pub client_identity: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_base_url: "http://127.0.0.1:8000".to_string(),
            api_token: None,
            cache_path: PathBuf::from("./data/admin-cache.sqlite"),
            per_page: 10,
            client_identity: "Schema-Admin".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let server_base_url = env::var("ADMIN_SERVER_BASE_URL")
            .unwrap_or(defaults.server_base_url)
            .trim_end_matches('/')
            .to_string();

        let api_token = env::var("ADMIN_API_TOKEN").ok().filter(|t| !t.is_empty());

        let cache_path = env::var("ADMIN_CACHE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_path);

        let per_page = match env::var("ADMIN_PER_PAGE") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid ADMIN_PER_PAGE: {}", raw)))?,
            Err(_) => defaults.per_page,
        };

        let client_identity = env::var("ADMIN_CLIENT_IDENTITY").unwrap_or(defaults.client_identity);

        let log_level = env::var("ADMIN_LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            server_base_url,
            api_token,
            cache_path,
            per_page,
            client_identity,
            log_level,
        })
    }

    /// Defaults pointed at another backend.
    pub fn for_server(server_base_url: &str) -> Self {
        Self {
            server_base_url: server_base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Root of all API paths.
    pub fn api_base_url(&self) -> String {
        format!("{}/api", self.server_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share process env, so they run in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("ADMIN_SERVER_BASE_URL");
        env::remove_var("ADMIN_API_TOKEN");
        env::remove_var("ADMIN_CACHE_PATH");
        env::remove_var("ADMIN_PER_PAGE");
        env::remove_var("ADMIN_CLIENT_IDENTITY");
        env::remove_var("ADMIN_LOG_LEVEL");

        let config = Config::from_env().unwrap();

        assert!(config.api_token.is_none());
        assert_eq!(config.server_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api_base_url(), "http://127.0.0.1:8000/api");
        assert_eq!(config.cache_path, PathBuf::from("./data/admin-cache.sqlite"));
        assert_eq!(config.per_page, 10);
        assert_eq!(config.client_identity, "Schema-Admin");
        assert_eq!(config.log_level, "info");

        env::set_var("ADMIN_PER_PAGE", "many");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        env::remove_var("ADMIN_PER_PAGE");
    }
}
