use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;
use crate::remote::RemoteConfig;
use crate::spillover::{DEFAULT_GC_GRACE, DEFAULT_THRESHOLD};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://eduflow.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LOCAL_STORAGE_QUOTA: usize = 50_000_000;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `None` runs against the no-op remote, so the mirror serves seed data.
    pub remote: Option<RemoteConfig>,
    pub spillover_threshold: usize,
    pub local_storage_quota: usize,
    pub spillover_gc_grace: Duration,
    pub sync_interval: Duration,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::BadRequest(format!("BIND_ADDR is invalid: {}", e)))?;

        let remote = match RemoteConfig::new_from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("remote store disabled: {}", e);
                None
            }
        };

        Ok(Self {
            database_url,
            bind_addr,
            remote,
            spillover_threshold: parse_var("SPILLOVER_THRESHOLD", DEFAULT_THRESHOLD)?,
            local_storage_quota: parse_var("LOCAL_STORAGE_QUOTA", DEFAULT_LOCAL_STORAGE_QUOTA)?,
            spillover_gc_grace: Duration::from_secs(parse_var(
                "SPILLOVER_GC_GRACE_SECS",
                DEFAULT_GC_GRACE.as_secs(),
            )?),
            sync_interval: sync_interval(parse_var(
                "SYNC_INTERVAL_SECS",
                DEFAULT_SYNC_INTERVAL_SECS,
            )?)?,
        })
    }
}

fn sync_interval(secs: u64) -> Result<Duration, AppError> {
    if secs == 0 {
        return Err(AppError::BadRequest(
            "SYNC_INTERVAL_SECS must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_var<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| AppError::BadRequest(format!("{} is invalid: {}", key, e))),
        Err(_) => Ok(default),
    }
}
