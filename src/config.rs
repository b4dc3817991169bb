//! Service configuration loaded from environment variables.
//!
//! Loaded once at startup, validated before any network call, then passed by
//! value into the adapters.
//!
//! ## Record Store endpoints
//!
//! Resolved in this order:
//!
//! 1. `DB_CONFIG_JSON` - a JSON document naming both endpoints:
//!
//!    ```json
//!    {
//!      "reader_endpoint": "db-ro.internal",
//!      "writer_endpoint": "db.internal",
//!      "username": "app",
//!      "password": "secret",
//!      "database": "users",
//!      "port": 5432
//!    }
//!    ```
//!
//! 2. `READER_DATABASE_URL` and `WRITER_DATABASE_URL`
//! 3. `DATABASE_URL`, used for both endpoints (single-node development)
//!
//! Records live in an unqualified `users` table, created by the migrations on
//! the primary. Point `search_path` at another schema (e.g. `wsi`) through the
//! connection string if the table lives there.
//!
//! ## Cache Store
//!
//! - `REDIS_URL` - full connection string, or
//! - `REDIS_ENDPOINT` - `host:port`, reached over TLS (`rediss://`) unless
//!   `REDIS_TLS=false`; `REDIS_PASSWORD` / `REDIS_DB` optional
//!
//! Without either, caching is disabled and every read goes to the replica.
//!
//! ## Optional Variables
//!
//! - `CACHE_TTL_SECONDS` - Entry lifetime (default: 60)
//! - `CACHE_KEY_PREFIX` - Namespace for cache keys (default: empty)
//! - `CACHE_SINGLE_FLIGHT` - Collapse concurrent misses per key (default: false)
//! - `LISTEN` - Bind address (default: `0.0.0.0:8080`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - `text` or `json` (default: `text`)
//! - `DB_MAX_CONNECTIONS`, `DB_CONNECT_TIMEOUT`, `DB_IDLE_TIMEOUT`, `DB_MAX_LIFETIME` - Pool settings

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::application::services::AccessorConfig;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        }
    }
}

/// Connection pool settings, applied to both the reader and the writer pool.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// `DB_MAX_CONNECTIONS`, default 10.
    pub max_connections: u32,
    /// Seconds to wait for a connection, `DB_CONNECT_TIMEOUT`, default 30.
    pub connect_timeout: u64,
    /// `DB_IDLE_TIMEOUT` seconds, default 600.
    pub idle_timeout: u64,
    /// `DB_MAX_LIFETIME` seconds, default 1800.
    pub max_lifetime: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: 30,
            idle_timeout: 600,
            max_lifetime: 1800,
        }
    }
}

/// Shape of `DB_CONFIG_JSON`.
#[derive(Debug, Clone, Deserialize)]
pub struct DbEndpoints {
    pub reader_endpoint: String,
    pub writer_endpoint: String,
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
}

fn default_pg_port() -> u16 {
    5432
}

impl DbEndpoints {
    pub fn reader_url(&self) -> Result<String> {
        self.url_for(&self.reader_endpoint)
    }

    pub fn writer_url(&self) -> Result<String> {
        self.url_for(&self.writer_endpoint)
    }

    /// Builds a connection URL, percent-encoding the credentials.
    fn url_for(&self, host: &str) -> Result<String> {
        let mut url = Url::parse("postgres://localhost").context("base URL")?;
        url.set_host(Some(host))
            .with_context(|| format!("invalid database host '{}'", host))?;
        url.set_port(Some(self.port))
            .map_err(|()| anyhow::anyhow!("cannot set database port"))?;
        url.set_username(&self.username)
            .map_err(|()| anyhow::anyhow!("cannot set database username"))?;
        url.set_password(Some(&self.password))
            .map_err(|()| anyhow::anyhow!("cannot set database password"))?;
        url.set_path(&self.database);
        Ok(url.into())
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Replica endpoint, used for every point read.
    pub reader_database_url: String,
    /// Primary endpoint, used for every mutation and for migrations.
    pub writer_database_url: String,
    pub redis_url: Option<String>,
    pub cache_ttl_seconds: u64,
    pub cache_key_prefix: String,
    pub cache_single_flight: bool,
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub pool: PoolSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no database endpoint is configured or a variable
    /// holds a value of the wrong type.
    pub fn from_env() -> Result<Self> {
        let (reader_database_url, writer_database_url) =
            Self::load_database_urls().context("Failed to load database configuration")?;

        let defaults = PoolSettings::default();

        Ok(Self {
            reader_database_url,
            writer_database_url,
            redis_url: Self::load_redis_url().context("Failed to load Redis configuration")?,
            cache_ttl_seconds: env_parse("CACHE_TTL_SECONDS", 60)?,
            cache_key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or_default(),
            cache_single_flight: env_flag("CACHE_SINGLE_FLIGHT"),
            listen_addr: env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: env_parse("LOG_FORMAT", LogFormat::Text)?,
            pool: PoolSettings {
                max_connections: env_parse("DB_MAX_CONNECTIONS", defaults.max_connections)?,
                connect_timeout: env_parse("DB_CONNECT_TIMEOUT", defaults.connect_timeout)?,
                idle_timeout: env_parse("DB_IDLE_TIMEOUT", defaults.idle_timeout)?,
                max_lifetime: env_parse("DB_MAX_LIFETIME", defaults.max_lifetime)?,
            },
        })
    }

    /// Resolves the `(reader, writer)` URLs.
    fn load_database_urls() -> Result<(String, String)> {
        if let Ok(raw) = env::var("DB_CONFIG_JSON") {
            let endpoints: DbEndpoints =
                serde_json::from_str(&raw).context("DB_CONFIG_JSON is not valid JSON config")?;
            return Ok((endpoints.reader_url()?, endpoints.writer_url()?));
        }

        match (
            env::var("READER_DATABASE_URL").ok(),
            env::var("WRITER_DATABASE_URL").ok(),
        ) {
            (Some(reader), Some(writer)) => return Ok((reader, writer)),
            (Some(_), None) | (None, Some(_)) => anyhow::bail!(
                "READER_DATABASE_URL and WRITER_DATABASE_URL must be set together"
            ),
            (None, None) => {}
        }

        let url = env::var("DATABASE_URL").context(
            "one of DB_CONFIG_JSON, READER_DATABASE_URL/WRITER_DATABASE_URL or DATABASE_URL must be set",
        )?;
        Ok((url.clone(), url))
    }

    /// Returns `None` if Redis is not configured.
    ///
    /// An endpoint given as `REDIS_ENDPOINT` is reached over TLS unless
    /// `REDIS_TLS=false`. The password is percent-encoded into the URL.
    fn load_redis_url() -> Result<Option<String>> {
        if let Ok(url) = env::var("REDIS_URL") {
            return Ok(Some(url));
        }

        let Ok(endpoint) = env::var("REDIS_ENDPOINT") else {
            return Ok(None);
        };
        let scheme = if env_flag_or("REDIS_TLS", true) {
            "rediss"
        } else {
            "redis"
        };
        let db = env::var("REDIS_DB").unwrap_or_else(|_| "0".to_string());

        let mut url = Url::parse(&format!("{}://{}/{}", scheme, endpoint, db))
            .with_context(|| format!("invalid REDIS_ENDPOINT '{}'", endpoint))?;
        if let Ok(pwd) = env::var("REDIS_PASSWORD")
            && !pwd.is_empty()
        {
            url.set_password(Some(&pwd))
                .map_err(|()| anyhow::anyhow!("cannot set Redis password"))?;
        }

        Ok(Some(url.into()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL has the wrong scheme, the listen address does
    /// not parse, or a numeric setting is zero.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("reader", &self.reader_database_url),
            ("writer", &self.writer_database_url),
        ] {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!(
                    "{} database URL must start with 'postgres://' or 'postgresql://', got '{}'",
                    name,
                    mask_connection_string(url)
                );
            }
        }

        if let Some(ref redis_url) = self.redis_url
            && !redis_url.starts_with("redis://")
            && !redis_url.starts_with("rediss://")
        {
            anyhow::bail!(
                "Redis URL must start with 'redis://' or 'rediss://', got '{}'",
                mask_connection_string(redis_url)
            );
        }

        self.listen_addr.parse::<SocketAddr>().with_context(|| {
            format!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            )
        })?;

        if self.cache_ttl_seconds == 0 {
            anyhow::bail!("CACHE_TTL_SECONDS must be greater than 0");
        }

        if self.cache_key_prefix.chars().any(char::is_whitespace) {
            anyhow::bail!("CACHE_KEY_PREFIX must not contain whitespace");
        }

        if self.pool.max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.pool.connect_timeout == 0 {
            anyhow::bail!("DB_CONNECT_TIMEOUT must be greater than 0");
        }

        Ok(())
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.redis_url.is_some()
    }

    /// Returns true when reads and writes share one endpoint.
    pub fn is_single_endpoint(&self) -> bool {
        self.reader_database_url == self.writer_database_url
    }

    pub fn accessor_config(&self) -> AccessorConfig {
        AccessorConfig {
            ttl: Duration::from_secs(self.cache_ttl_seconds),
            single_flight: self.cache_single_flight,
        }
    }

    /// Logs the configuration with credentials masked.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!(
            "  Reader: {}",
            mask_connection_string(&self.reader_database_url)
        );
        tracing::info!(
            "  Writer: {}",
            mask_connection_string(&self.writer_database_url)
        );
        if self.is_single_endpoint() {
            tracing::warn!("  Reader and writer share one endpoint");
        }

        match self.redis_url {
            Some(ref redis_url) => tracing::info!(
                "  Redis: {} (TTL {}s, prefix '{}', single-flight {})",
                mask_connection_string(redis_url),
                self.cache_ttl_seconds,
                self.cache_key_prefix,
                self.cache_single_flight
            ),
            None => tracing::info!("  Redis: disabled"),
        }

        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {:?}", self.log_format);
    }
}

/// Replaces the password of a connection URL with `***`.
fn mask_connection_string(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            // Only fails for cannot-be-a-base URLs, which have no password.
            let _ = url.set_password(Some("***"));
            url.into()
        }
        _ => raw.to_string(),
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str) -> bool {
    env_flag_or(name, false)
}

fn env_flag_or(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("true") || v == "1",
        Err(_) => default,
    }
}

/// Loads and validates configuration from environment variables.
///
/// Expects `.env` to be already loaded (see `dotenvy::dotenv()` in `main.rs`).
///
/// # Errors
///
/// Returns an error if required variables are missing or validation fails.
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
