//! Server configuration
//!
//! Loaded from a JSON file with every field optional; anything missing takes
//! its default. The LLM API key is only ever read from the environment.

use anyhow::{Context, Result};
use pitwall_core::DriverProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_ENV: &str = "PITWALL_CONFIG";
pub const DATA_DIR_ENV: &str = "PITWALL_DATA_DIR";
pub const BIND_ENV: &str = "PITWALL_BIND";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const LOCAL_CONFIG_FILE: &str = "pitwall.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub telemetry_interval_ms: u64,
    pub strategy_interval_ms: u64,
    /// Most recent telemetry points kept for analysis and the history endpoint
    pub history_capacity: usize,
    pub fuel_capacity_kg: f32,
    /// Points required in the history before strategy is requested
    pub min_history_for_strategy: usize,
    pub llm: LlmConfig,
    /// Roster used when no precomputed metrics are available
    pub drivers: Vec<DriverProfile>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9100".to_string(),
            data_dir: PathBuf::from("data"),
            telemetry_interval_ms: 100,
            strategy_interval_ms: 4000,
            history_capacity: 100,
            fuel_capacity_kg: 35.0,
            min_history_for_strategy: 5,
            llm: LlmConfig::default(),
            drivers: default_drivers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 300,
            timeout_secs: 20,
            api_key: None,
        }
    }
}

pub fn default_drivers() -> Vec<DriverProfile> {
    [
        ("d1", "J. Edwards", 23, "TechSport Racing"),
        ("d2", "S. McAleer", 18, "Copeland Motorsports"),
        ("d3", "G. Boccanfuso", 66, "Smooge Racing"),
    ]
    .into_iter()
    .map(|(id, name, number, team)| DriverProfile {
        id: id.to_string(),
        name: name.to_string(),
        number,
        team: team.to_string(),
    })
    .collect()
}

impl ServerConfig {
    /// Resolve the config file, read it and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::locate() {
            Some(path) => Self::from_path(&path)?,
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("pitwall").join("config.json"))
            .filter(|path| path.exists())
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup(BIND_ENV) {
            self.bind_addr = addr;
        }
        self.llm.api_key = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty());

        if self.drivers.is_empty() {
            self.drivers = default_drivers();
        }
        self.history_capacity = self.history_capacity.max(1);
    }
}
