//! API Configuration Module
//!
//! Configuration is loaded from environment variables with defaults suited
//! to local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use knights_core::ConfigError;

// ============================================================================
// ENUMS
// ============================================================================

/// Which primary store and hero archive the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local maps. Data is lost on restart.
    #[default]
    Memory,
    /// LMDB environment on disk.
    Lmdb,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "lmdb" => Ok(StorageBackend::Lmdb),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Server, storage and logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Primary store and hero archive implementation.
    pub storage_backend: StorageBackend,

    /// Directory of the LMDB environment (LMDB backend only).
    pub lmdb_path: PathBuf,

    /// LMDB map size in megabytes (LMDB backend only).
    pub lmdb_max_size_mb: usize,

    /// Log line format.
    pub log_format: LogFormat,

    /// Allowed CORS origins. Empty means allow all origins.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            storage_backend: StorageBackend::Memory,
            lmdb_path: PathBuf::from("./data/knights"),
            lmdb_max_size_mb: 256,
            log_format: LogFormat::Pretty,
            cors_origins: Vec::new(),
        }
    }
}

fn parse_var<T: FromStr>(field: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: ToString,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        }),
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KNIGHTS_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `KNIGHTS_API_PORT`: Listen port (default: 3000)
    /// - `KNIGHTS_STORAGE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `KNIGHTS_LMDB_PATH`: LMDB directory (default: ./data/knights)
    /// - `KNIGHTS_LMDB_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `KNIGHTS_LOG_FORMAT`: "pretty" or "json" (default: pretty)
    /// - `KNIGHTS_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_host = lookup("KNIGHTS_API_BIND").unwrap_or(defaults.bind_host);

        let port_field = if lookup("PORT").is_some() {
            "PORT"
        } else {
            "KNIGHTS_API_PORT"
        };
        let port = parse_var(port_field, lookup(port_field), defaults.port)?;

        let storage_backend = parse_var(
            "KNIGHTS_STORAGE_BACKEND",
            lookup("KNIGHTS_STORAGE_BACKEND"),
            defaults.storage_backend,
        )?;

        let lmdb_path = lookup("KNIGHTS_LMDB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.lmdb_path);

        let lmdb_max_size_mb = parse_var(
            "KNIGHTS_LMDB_MAX_SIZE_MB",
            lookup("KNIGHTS_LMDB_MAX_SIZE_MB"),
            defaults.lmdb_max_size_mb,
        )?;
        if lmdb_max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "KNIGHTS_LMDB_MAX_SIZE_MB".to_string(),
                value: "0".to_string(),
                reason: "map size must be positive".to_string(),
            });
        }

        let log_format = parse_var(
            "KNIGHTS_LOG_FORMAT",
            lookup("KNIGHTS_LOG_FORMAT"),
            defaults.log_format,
        )?;

        let cors_origins = lookup("KNIGHTS_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_host,
            port,
            storage_backend,
            lmdb_path,
            lmdb_max_size_mb,
            log_format,
            cors_origins,
        })
    }

    /// Resolve the socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "KNIGHTS_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.bind_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_port_prefers_platform_variable() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("KNIGHTS_API_PORT", "9090"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);

        let config =
            ApiConfig::from_lookup(lookup_from(&[("KNIGHTS_API_PORT", "9090")])).unwrap();
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_lmdb_backend() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("KNIGHTS_STORAGE_BACKEND", "LMDB"),
            ("KNIGHTS_LMDB_PATH", "/var/lib/knights"),
            ("KNIGHTS_LMDB_MAX_SIZE_MB", "64"),
        ]))
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Lmdb);
        assert_eq!(config.lmdb_path, PathBuf::from("/var/lib/knights"));
        assert_eq!(config.lmdb_max_size_mb, 64);
    }

    #[test]
    fn test_cors_origins_split() {
        let config = ApiConfig::from_lookup(lookup_from(&[(
            "KNIGHTS_CORS_ORIGINS",
            "https://a.example, ,https://b.example",
        )]))
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = ApiConfig::from_lookup(lookup_from(&[("PORT", "abc")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, ref value, .. } if field == "PORT" && value == "abc"
        ));

        let err = ApiConfig::from_lookup(lookup_from(&[("KNIGHTS_STORAGE_BACKEND", "redis")]))
            .unwrap_err();
        assert!(format!("{}", err).contains("KNIGHTS_STORAGE_BACKEND"));

        let err = ApiConfig::from_lookup(lookup_from(&[("KNIGHTS_LMDB_MAX_SIZE_MB", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err =
            ApiConfig::from_lookup(lookup_from(&[("KNIGHTS_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_bad_bind_host() {
        let config =
            ApiConfig::from_lookup(lookup_from(&[("KNIGHTS_API_BIND", "not a host")])).unwrap();
        assert!(config.bind_addr().is_err());
    }
}
