use crate::error::Result;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub renderer: RendererConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Unconditional delay between network-bearing items, in milliseconds.
    pub delay_ms: u64,
    /// Safety cap on pagination for listing-page sources.
    pub page_cap: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Settle delay after navigation before reading the DOM, in milliseconds.
    pub settle_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            page_cap: 10,
            timeout_seconds: 30,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2000,
            timeout_seconds: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory. All tunables have
    /// defaults, so a missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        match fs::read_to_string(config_path) {
            Ok(content) => {
                let config: Config = toml::from_str(&content)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }
}
