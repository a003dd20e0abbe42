// src/config.rs
use crate::errors::ServerError;
use chrono::Duration;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file path (or `file:` URI).
    pub db_path: String,
    pub bind_addr: SocketAddr,
    pub max_workers: usize,
    /// How long an issued session token stays valid.
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "dealer_scans.sqlite3".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_workers: 8,
            session_ttl: Duration::days(7),
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ServerError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup("DEALER_SCANS_DB").filter(|s| !s.trim().is_empty()) {
            cfg.db_path = path;
        }
        if let Some(addr) = parse_var(&lookup, "DEALER_SCANS_ADDR")? {
            cfg.bind_addr = addr;
        }
        if let Some(workers) = parse_var::<usize, _>(&lookup, "DEALER_SCANS_WORKERS")? {
            if workers == 0 {
                return Err(ServerError::Config(
                    "DEALER_SCANS_WORKERS must be at least 1".into(),
                ));
            }
            cfg.max_workers = workers;
        }
        if let Some(days) = parse_var::<i64, _>(&lookup, "DEALER_SCANS_SESSION_DAYS")? {
            if days <= 0 {
                return Err(ServerError::Config(
                    "DEALER_SCANS_SESSION_DAYS must be positive".into(),
                ));
            }
            cfg.session_ttl = Duration::days(days);
        }

        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ServerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ServerError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
