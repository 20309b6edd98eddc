use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime mode, gates whether a missing pepper is fatal or merely logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    fn from_env_str(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            RunMode::Production
        } else {
            RunMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, RunMode::Production)
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub run_mode: RunMode,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub broker_name: String,
    pub data_dir: PathBuf,
    pub tenant_token_pepper: Option<String>,
    pub max_payload_size_bytes: usize,
    pub batch_max_size: usize,
    pub batch_flush_interval_ms: u64,
    pub batch_max_retries: u8,
    pub bootstrap_host: String,
    pub bootstrap_port: u16,
    pub bootstrap_rate_limit_per_minute: u32,
    pub log_level: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::Development,
            mqtt_host: "0.0.0.0".to_string(),
            mqtt_port: 1883,
            broker_name: "tenant-mqtt-broker".to_string(),
            data_dir: PathBuf::from("data/broker"),
            tenant_token_pepper: None,
            max_payload_size_bytes: 65_536,
            batch_max_size: 100,
            batch_flush_interval_ms: 2_000,
            batch_max_retries: 3,
            bootstrap_host: "127.0.0.1".to_string(),
            bootstrap_port: 8282,
            bootstrap_rate_limit_per_minute: 5,
            log_level: "info".to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(mode) = env::var("RUN_MODE") {
            cfg.run_mode = RunMode::from_env_str(&mode);
        }
        if let Ok(host) = env::var("MQTT_HOST") {
            cfg.mqtt_host = host;
        }
        if let Ok(port) = env::var("MQTT_PORT") {
            cfg.mqtt_port = port.parse().context("MQTT_PORT must be a valid u16")?;
        }
        if let Ok(name) = env::var("MQTT_BROKER_NAME") {
            cfg.broker_name = name;
        }
        if let Ok(dir) = env::var("BROKER_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        cfg.tenant_token_pepper = env::var("TENANT_TOKEN_PEPPER").ok();

        if let Ok(size) = env::var("MAX_PAYLOAD_SIZE_BYTES") {
            cfg.max_payload_size_bytes = size
                .parse()
                .context("MAX_PAYLOAD_SIZE_BYTES must be a positive integer")?;
        }
        if let Ok(n) = env::var("BATCH_MAX_SIZE") {
            cfg.batch_max_size = n.parse().context("BATCH_MAX_SIZE must be a positive integer")?;
        }
        if let Ok(t) = env::var("BATCH_FLUSH_INTERVAL_MS") {
            cfg.batch_flush_interval_ms = t
                .parse()
                .context("BATCH_FLUSH_INTERVAL_MS must be a positive integer")?;
        }
        if let Ok(r) = env::var("BATCH_MAX_RETRIES") {
            cfg.batch_max_retries = r.parse().context("BATCH_MAX_RETRIES must fit a u8")?;
        }
        if let Ok(host) = env::var("BOOTSTRAP_HOST") {
            cfg.bootstrap_host = host;
        }
        if let Ok(port) = env::var("BOOTSTRAP_PORT") {
            cfg.bootstrap_port = port.parse().context("BOOTSTRAP_PORT must be a valid u16")?;
        }
        if let Ok(n) = env::var("BOOTSTRAP_RATE_LIMIT_PER_MINUTE") {
            cfg.bootstrap_rate_limit_per_minute = n
                .parse()
                .context("BOOTSTRAP_RATE_LIMIT_PER_MINUTE must be a positive integer")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tenant_token_pepper.is_none() && self.run_mode.is_production() {
            anyhow::bail!("TENANT_TOKEN_PEPPER must be set when RUN_MODE=production");
        }
        if self.max_payload_size_bytes == 0 {
            anyhow::bail!("MAX_PAYLOAD_SIZE_BYTES must be greater than 0");
        }
        if self.batch_max_size == 0 {
            anyhow::bail!("BATCH_MAX_SIZE must be greater than 0");
        }
        if self.batch_flush_interval_ms == 0 {
            anyhow::bail!("BATCH_FLUSH_INTERVAL_MS must be greater than 0");
        }
        Ok(())
    }
}
