//! Runtime configuration, read from `TASKPAD_*` environment variables

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use taskpad_core::application::constants::DEFAULT_GRACE_PERIOD;
use taskpad_core::port::NetworkProfile;

pub const DEFAULT_DB_PATH: &str = "~/.taskpad/tasks.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store: StoreKind,
    pub db_path: PathBuf,
    pub network: NetworkProfile,
    pub seed: Option<u64>,
    pub grace_period: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source (the environment in
    /// production, a map in tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = match lookup("TASKPAD_STORE").as_deref() {
            None | Some("sqlite") => StoreKind::Sqlite,
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("TASKPAD_STORE must be 'sqlite' or 'memory', got '{}'", other),
        };

        let db_path = lookup("TASKPAD_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = PathBuf::from(shellexpand::tilde(&db_path).into_owned());

        let defaults = NetworkProfile::default();
        let network = NetworkProfile {
            min_latency: parse_millis(&lookup, "TASKPAD_MIN_LATENCY_MS")?
                .unwrap_or(defaults.min_latency),
            max_latency: parse_millis(&lookup, "TASKPAD_MAX_LATENCY_MS")?
                .unwrap_or(defaults.max_latency),
            success_rate: parse(&lookup, "TASKPAD_SUCCESS_RATE")?.unwrap_or(defaults.success_rate),
        };
        network.validate().context("invalid network simulation settings")?;

        let log_format = match lookup("TASKPAD_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            store,
            db_path,
            network,
            seed: parse(&lookup, "TASKPAD_SEED")?,
            grace_period: parse_millis(&lookup, "TASKPAD_GRACE_MS")?.unwrap_or(DEFAULT_GRACE_PERIOD),
            log_format,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value '{}'", key, raw))
        })
        .transpose()
}

fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    Ok(parse::<u64>(lookup, key)?.map(Duration::from_millis))
}
