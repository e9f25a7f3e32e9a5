use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    pub workers: usize,
    pub max_cycles: u64,
    pub max_pulls: usize,
    pub max_arms: usize,
    pub deadline_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportStoreConfig {
    pub path: PathBuf,
    pub persist_every: u64,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub runner: RunnerConfig,
    pub report_store: ReportStoreConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        builder.try_deserialize()
    }
}
