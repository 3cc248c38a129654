//! Configuration loading and parsing.
//!
//! Settings come from an optional TOML file, overridden by CLI flags
//! (which themselves fall back to environment variables).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_DB_PATH: &str = "songs.sqlite";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081";
const DEFAULT_DB_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DB_POOL_SIZE: u32 = 8;
const DEFAULT_METADATA_TIMEOUT_MS: u64 = 10_000;

/// Server configuration as read from TOML. Every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Bind address (host:port). Takes precedence over `port`.
    pub bind: Option<String>,
    /// Port to listen on when `bind` is not set.
    pub port: Option<u16>,
    /// Path of the SQLite database file.
    pub db_path: Option<String>,
    /// Base URL of the external song metadata provider.
    pub api_base_url: Option<String>,
    /// Upper bound for a single database call, in milliseconds.
    pub db_timeout_ms: Option<u64>,
    /// Max pooled database connections.
    pub db_pool_size: Option<u32>,
    /// Total timeout for one metadata provider request, in milliseconds.
    pub metadata_timeout_ms: Option<u64>,
    /// Browser origins allowed by CORS.
    pub cors_origins: Option<Vec<String>>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
}

/// Fully resolved settings used to build the server.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub api_base_url: String,
    pub db_timeout: Duration,
    pub db_pool_size: u32,
    pub metadata_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<ServerConfig>(raw)?)
    }

    /// Merge overrides on top of this config and fill in defaults.
    ///
    /// Bind order: `--bind`, then `--port` on all interfaces, then the
    /// file's `bind`, then the file's `port`, then port 8081.
    pub fn resolve(&self, overrides: Overrides) -> Result<Settings> {
        let bind = match (overrides.bind, overrides.port) {
            (Some(addr), _) => addr,
            (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], port)),
            (None, None) => match bind_from_config(self)? {
                Some(addr) => addr,
                None => SocketAddr::from(([0, 0, 0, 0], self.port.unwrap_or(DEFAULT_PORT))),
            },
        };
        let db_path = overrides
            .db_path
            .or_else(|| non_blank(self.db_path.as_deref()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let api_base_url = overrides
            .api_base_url
            .or_else(|| non_blank(self.api_base_url.as_deref()).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let db_pool_size = self.db_pool_size.unwrap_or(DEFAULT_DB_POOL_SIZE).max(1);

        Ok(Settings {
            bind,
            db_path,
            api_base_url,
            db_timeout: Duration::from_millis(
                self.db_timeout_ms.unwrap_or(DEFAULT_DB_TIMEOUT_MS),
            ),
            db_pool_size,
            metadata_timeout: Duration::from_millis(
                self.metadata_timeout_ms
                    .unwrap_or(DEFAULT_METADATA_TIMEOUT_MS),
            ),
            cors_origins: self.cors_origins.clone().unwrap_or_default(),
        })
    }
}

/// Parse an optional bind address from config.
pub fn bind_from_config(cfg: &ServerConfig) -> Result<Option<SocketAddr>> {
    let Some(bind) = non_blank(cfg.bind.as_deref()) else {
        return Ok(None);
    };
    let addr = bind.parse().with_context(|| format!("parse bind {bind}"))?;
    Ok(Some(addr))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let settings = ServerConfig::default()
            .resolve(Overrides::default())
            .expect("resolve");
        assert_eq!(settings.bind, "0.0.0.0:8081".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.db_path, PathBuf::from("songs.sqlite"));
        assert_eq!(settings.api_base_url, "http://localhost:8081");
        assert_eq!(settings.db_timeout, Duration::from_secs(5));
        assert_eq!(settings.db_pool_size, 8);
        assert_eq!(settings.metadata_timeout, Duration::from_secs(10));
        assert!(settings.cors_origins.is_empty());
    }

    #[test]
    fn toml_values_are_used() {
        let cfg = ServerConfig::parse(
            r#"
            port = 9000
            db_path = "/var/lib/songs.db"
            api_base_url = "http://provider:7000/"
            db_timeout_ms = 250
            db_pool_size = 2
            metadata_timeout_ms = 1500
            cors_origins = ["http://localhost:5173"]
            "#,
        )
        .expect("parse");
        let settings = cfg.resolve(Overrides::default()).expect("resolve");
        assert_eq!(settings.bind.port(), 9000);
        assert_eq!(settings.db_path, PathBuf::from("/var/lib/songs.db"));
        assert_eq!(settings.api_base_url, "http://provider:7000");
        assert_eq!(settings.db_timeout, Duration::from_millis(250));
        assert_eq!(settings.db_pool_size, 2);
        assert_eq!(settings.metadata_timeout, Duration::from_millis(1500));
        assert_eq!(settings.cors_origins, vec!["http://localhost:5173".to_string()]);
    }

    #[test]
    fn overrides_win_over_file() {
        let cfg = ServerConfig::parse(
            r#"
            bind = "127.0.0.1:7000"
            db_path = "file.db"
            api_base_url = "http://file"
            "#,
        )
        .expect("parse");
        let settings = cfg
            .resolve(Overrides {
                bind: Some("127.0.0.1:7100".parse::<SocketAddr>().unwrap()),
                port: None,
                db_path: Some(PathBuf::from("cli.db")),
                api_base_url: Some("http://cli".to_string()),
            })
            .expect("resolve");
        assert_eq!(settings.bind, "127.0.0.1:7100".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.db_path, PathBuf::from("cli.db"));
        assert_eq!(settings.api_base_url, "http://cli");
    }

    #[test]
    fn port_override_applies_when_bind_is_unset() {
        let settings = ServerConfig::default()
            .resolve(Overrides {
                port: Some(9123),
                ..Overrides::default()
            })
            .expect("resolve");
        assert_eq!(settings.bind, "0.0.0.0:9123".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn port_override_beats_file_bind() {
        let cfg = ServerConfig {
            bind: Some("127.0.0.1:7000".to_string()),
            ..ServerConfig::default()
        };
        let settings = cfg
            .resolve(Overrides {
                port: Some(9124),
                ..Overrides::default()
            })
            .expect("resolve");
        assert_eq!(settings.bind, "0.0.0.0:9124".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn invalid_bind_is_an_error() {
        let cfg = ServerConfig {
            bind: Some("not-an-addr".to_string()),
            ..ServerConfig::default()
        };
        assert!(cfg.resolve(Overrides::default()).is_err());
    }

    #[test]
    fn pool_size_is_at_least_one() {
        let cfg = ServerConfig {
            db_pool_size: Some(0),
            ..ServerConfig::default()
        };
        let settings = cfg.resolve(Overrides::default()).expect("resolve");
        assert_eq!(settings.db_pool_size, 1);
    }
}
