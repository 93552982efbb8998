use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub max_file_size: usize,
    /// Upper bound on datasets held by the store.
    pub max_datasets: u64,
    /// Datasets untouched for this long are evicted.
    pub dataset_idle: Duration,
    pub head_rows: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            max_file_size: default_max_file_size(),
            max_datasets: 64,
            dataset_idle: Duration::from_secs(3600),
            head_rows: 5,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Builds the config from a variable lookup, falling back to defaults
    /// for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            host: parse_var(&lookup, "TABLE_INSIGHTS_HOST", defaults.host)?,
            port: parse_var(&lookup, "TABLE_INSIGHTS_PORT", defaults.port)?,
            max_file_size: parse_var(&lookup, "TABLE_INSIGHTS_MAX_FILE_SIZE", defaults.max_file_size)?,
            max_datasets: parse_var(&lookup, "TABLE_INSIGHTS_MAX_DATASETS", defaults.max_datasets)?,
            dataset_idle: Duration::from_secs(parse_var(
                &lookup,
                "TABLE_INSIGHTS_DATASET_IDLE_SECS",
                defaults.dataset_idle.as_secs(),
            )?),
            head_rows: parse_var(&lookup, "TABLE_INSIGHTS_HEAD_ROWS", defaults.head_rows)?,
            log_filter: lookup("RUST_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    // Load .env file first
    dotenv().ok();

    Config::from_lookup(|key| std::env::var(key).ok())
}
