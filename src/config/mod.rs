//! Configuration module for the college records service and its client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use reqwest::Url;

/// Base address used by development builds.
pub const DEV_API_BASE_URL: &str = "http://localhost:8000/api";
/// Base address used by release builds served from the same domain as the API.
pub const PROD_API_BASE_URL: &str = "/api";

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// A setting that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.key, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Origins allowed to call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// CORS origins
    pub allowed_origins: AllowedOrigins,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("COLLEGE_DB_PATH")
            .unwrap_or_else(|| "./data/students.sqlite".to_string())
            .into();

        let raw_addr = lookup("COLLEGE_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string());
        let bind_addr = raw_addr.parse().map_err(|e| ConfigError {
            key: "COLLEGE_BIND_ADDR",
            message: format!("'{}': {}", raw_addr, e),
        })?;

        let log_level = lookup("COLLEGE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let allowed_origins = AllowedOrigins::parse(
            &lookup("COLLEGE_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            allowed_origins,
        })
    }
}

/// Where the students collection resource lives, from the client's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute URL or a path relative to `public_origin`
    pub api_base_url: String,
    pub public_origin: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url().to_string(),
            public_origin: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_base_url: lookup("COLLEGE_API_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_api_base_url().to_string()),
            public_origin: lookup("COLLEGE_PUBLIC_ORIGIN").filter(|v| !v.trim().is_empty()),
        }
    }

    /// Resolve the configured base into an absolute URL ending in `/`.
    pub fn resolve_base_url(&self) -> Result<Url, ConfigError> {
        let mut url = if self.api_base_url.starts_with('/') {
            let origin = self.public_origin.as_deref().ok_or_else(|| ConfigError {
                key: "COLLEGE_PUBLIC_ORIGIN",
                message: format!("required to resolve relative base '{}'", self.api_base_url),
            })?;
            let origin = Url::parse(origin).map_err(|e| ConfigError {
                key: "COLLEGE_PUBLIC_ORIGIN",
                message: e.to_string(),
            })?;
            origin.join(&self.api_base_url).map_err(|e| ConfigError {
                key: "COLLEGE_API_BASE_URL",
                message: e.to_string(),
            })?
        } else {
            Url::parse(&self.api_base_url).map_err(|e| ConfigError {
                key: "COLLEGE_API_BASE_URL",
                message: e.to_string(),
            })?
        };

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

fn default_api_base_url() -> &'static str {
    if cfg!(debug_assertions) {
        DEV_API_BASE_URL
    } else {
        PROD_API_BASE_URL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/students.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.allowed_origins,
            AllowedOrigins::List(vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string()
            ])
        );
    }

    #[test]
    fn test_invalid_bind_addr() {
        let err = Config::from_lookup(lookup_from(&[("COLLEGE_BIND_ADDR", "nope")])).unwrap_err();
        assert_eq!(err.key, "COLLEGE_BIND_ADDR");
    }

    #[test]
    fn test_wildcard_origin() {
        let config =
            Config::from_lookup(lookup_from(&[("COLLEGE_ALLOWED_ORIGINS", "https://a.edu, *")]))
                .unwrap();
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_client_default_base_is_dev_address_in_debug() {
        let client = ClientConfig::from_lookup(lookup_from(&[]));
        assert_eq!(client.api_base_url, DEV_API_BASE_URL);
        assert_eq!(
            client.resolve_base_url().unwrap().as_str(),
            "http://localhost:8000/api/"
        );
    }

    #[test]
    fn test_relative_base_needs_origin() {
        let client = ClientConfig::from_lookup(lookup_from(&[("COLLEGE_API_BASE_URL", "/api")]));
        assert_eq!(
            client.resolve_base_url().unwrap_err().key,
            "COLLEGE_PUBLIC_ORIGIN"
        );

        let client = ClientConfig::from_lookup(lookup_from(&[
            ("COLLEGE_API_BASE_URL", "/api"),
            ("COLLEGE_PUBLIC_ORIGIN", "https://admin.college.edu"),
        ]));
        assert_eq!(
            client.resolve_base_url().unwrap().as_str(),
            "https://admin.college.edu/api/"
        );
    }

    #[test]
    fn test_client_from_env_matches_lookup() {
        // Only this test touches the client keys in the process environment
        env::set_var("COLLEGE_API_BASE_URL", "/api");
        env::set_var("COLLEGE_PUBLIC_ORIGIN", "https://admin.college.edu");

        let from_env = ClientConfig::from_env();
        let from_lookup = ClientConfig::from_lookup(lookup_from(&[
            ("COLLEGE_API_BASE_URL", "/api"),
            ("COLLEGE_PUBLIC_ORIGIN", "https://admin.college.edu"),
        ]));

        env::remove_var("COLLEGE_API_BASE_URL");
        env::remove_var("COLLEGE_PUBLIC_ORIGIN");

        assert_eq!(from_env, from_lookup);
        assert_eq!(
            from_env.resolve_base_url().unwrap().as_str(),
            "https://admin.college.edu/api/"
        );
    }
}
