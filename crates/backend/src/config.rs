//! Process configuration loaded from the environment.

use std::time::Duration;

use thiserror::Error;

/// Minimum length accepted for `SESSION_SECRET`; the cookie signing key is
/// derived from it.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Where users and sessions are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String, pool_size: usize },
    /// Process-local maps; everything is lost on restart.
    Memory,
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub session_cookie_name: String,
    pub cookie_secure: bool,
    pub provider_timeout: Duration,
    pub session_prune_interval: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("store", &self.store_kind())
            .field("google_client_id", &self.google_client_id)
            .field("google_redirect_uri", &self.google_redirect_uri)
            .field("session_ttl", &self.session_ttl)
            .field("session_cookie_name", &self.session_cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .field("provider_timeout", &self.provider_timeout)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    ///
    /// Required env vars:
    /// - `DATABASE_URL`: PostgreSQL connection string (unless `STORE_BACKEND=memory`)
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: OAuth client credentials
    /// - `SESSION_SECRET`: at least 32 bytes, used to sign session cookies
    /// - `PORT`: listening port
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let port: u16 = parse_var("PORT", required("PORT")?)?;

        let store = match lookup("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres {
                database_url: required("DATABASE_URL")?,
                pool_size: optional_parsed(&lookup, "DATABASE_POOL_SIZE", 10)?,
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    reason: format!("unknown backend '{}', expected postgres or memory", other),
                })
            }
        };

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "SESSION_SECRET",
                reason: format!("must be at least {} bytes", MIN_SESSION_SECRET_LEN),
            });
        }

        let google_redirect_uri = lookup("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|| format!("http://localhost:{}/auth/google/callback", port));

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(value) => parse_var("COOKIE_SECURE", value)?,
            None => lookup("RUST_ENV").unwrap_or_default() == "production",
        };

        let ttl_hours: u64 = positive(&lookup, "SESSION_TTL_HOURS", 14 * 24)?;
        let ttl_secs = ttl_hours
            .checked_mul(60 * 60)
            .ok_or_else(|| ConfigError::Invalid {
                var: "SESSION_TTL_HOURS",
                reason: "too large".to_string(),
            })?;

        Ok(Self {
            port,
            store,
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            google_redirect_uri,
            session_secret,
            session_ttl: Duration::from_secs(ttl_secs),
            session_cookie_name: lookup("SESSION_COOKIE_NAME").unwrap_or_else(|| "sid".to_string()),
            cookie_secure,
            provider_timeout: Duration::from_secs(positive(
                &lookup,
                "PROVIDER_TIMEOUT_SECS",
                10,
            )?),
            session_prune_interval: Duration::from_secs(positive(
                &lookup,
                "SESSION_PRUNE_INTERVAL_SECS",
                60 * 60,
            )?),
        })
    }

    fn store_kind(&self) -> &'static str {
        match self.store {
            StoreBackend::Postgres { .. } => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

fn parse_var<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn optional_parsed<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => parse_var(var, value),
        None => Ok(default),
    }
}

/// Like `optional_parsed`, but zero is rejected.
fn positive<F>(lookup: &F, var: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_parsed(lookup, var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        }),
        value => Ok(value),
    }
}
