use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::recommender::ScanLimits;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_filtered_scan_cap")]
    pub filtered_scan_cap: usize,
    #[serde(default = "default_unfiltered_scan_cap")]
    pub unfiltered_scan_cap: usize,
    #[serde(default = "default_recommendations")]
    pub default_recommendations: usize,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/admission-oracle/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dataset_path) = overrides.dataset_path {
            self.dataset.path = dataset_path;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_dataset_path(&self) -> PathBuf {
        expand_tilde(&self.dataset.path)
    }

    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            filtered_cap: self.engine.filtered_scan_cap,
            unfiltered_cap: self.engine.unfiltered_scan_cap,
            max_results: self.engine.max_recommendations,
        }
    }

    pub fn default_template() -> String {
        let template = r#"[dataset]
path = "~/.local/share/admission-oracle/programmes.json"

[engine]
filtered_scan_cap = 100
unfiltered_scan_cap = 500
default_recommendations = 6
max_recommendations = 100

[server]
host = "127.0.0.1"
port = 8630
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            engine: EngineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filtered_scan_cap: default_filtered_scan_cap(),
            unfiltered_scan_cap: default_unfiltered_scan_cap(),
            default_recommendations: default_recommendations(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_dataset_path() -> String {
    "~/.local/share/admission-oracle/programmes.json".to_string()
}

fn default_filtered_scan_cap() -> usize {
    100
}

fn default_unfiltered_scan_cap() -> usize {
    500
}

fn default_recommendations() -> usize {
    6
}

fn default_max_recommendations() -> usize {
    100
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8630
}
