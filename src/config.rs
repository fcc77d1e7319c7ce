use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceSettings;
use crate::narrative::ComposerSettings;
use crate::severity::ThresholdTable;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub thresholds: ThresholdTable,
    #[serde(default)]
    pub evidence: EvidenceSettings,
    #[serde(default)]
    pub composer: ComposerSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_key_changes: Option<usize>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/climate-narrative/config.toml")
    }

    /// A missing file means defaults; a present one must parse and carry a
    /// usable threshold table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed = Self::from_toml(&data)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let parsed: Self = toml::from_str(data).context("failed parsing TOML config")?;
        parsed
            .thresholds
            .validate()
            .context("invalid [thresholds] table")?;
        parsed
            .evidence
            .validate()
            .context("invalid [evidence] table")?;
        parsed
            .composer
            .validate()
            .context("invalid [composer] table")?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(max) = overrides.max_key_changes {
            self.composer.max_key_changes = max;
            self.composer
                .validate()
                .context("invalid --max-key-changes")?;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        Ok(())
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

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn default_template() -> String {
        let template = r#"# Severity bands per metric family. A change is Moderate at or above
# `moderate` and High above `high`. Relative bands are in percent.

[thresholds.temperature]
absolute = { moderate = 1.0, high = 2.5 }

[thresholds.temperature_extreme]
absolute = { moderate = 1.5, high = 3.0 }

[thresholds.precipitation]
relative = { moderate = 10.0, high = 25.0 }

[thresholds.precipitation_intensity]
relative = { moderate = 15.0, high = 40.0 }

[thresholds.snowfall]
absolute = { moderate = 5.0, high = 20.0 }
relative = { moderate = 20.0, high = 50.0 }

[thresholds.humidity]
absolute = { moderate = 3.0, high = 8.0 }

[thresholds.cloud_cover]
absolute = { moderate = 3.0, high = 8.0 }

[thresholds.solar_radiation]
relative = { moderate = 3.0, high = 8.0 }

[thresholds.wind]
relative = { moderate = 5.0, high = 15.0 }

[thresholds.extreme_frequency]
absolute = { moderate = 2.0, high = 6.0 }
relative = { moderate = 25.0, high = 75.0 }

[evidence]
min_corroborations = 2
extreme_signal_min_support = "medium"

[composer]
max_key_changes = 8

[server]
host = "127.0.0.1"
port = 3002
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

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3002
}
