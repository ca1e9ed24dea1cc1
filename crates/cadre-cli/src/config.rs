use anyhow::Context;
use cadre_agent::ModelConfig;
use cadre_core::CadreResult;
use cadre_orchestrator::{default_roster, Agent, OrchestratorConfig, Roster};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Contents of `cadre.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct CadreConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Completion providers keyed by the name agents refer to.
    #[serde(default)]
    pub providers: BTreeMap<String, ModelConfig>,
    /// Custom roster; the built-in one is used when empty.
    #[serde(default)]
    pub agents: Vec<Agent>,
}

/// `[server]` table.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
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
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl CadreConfig {
    /// The configured roster, or the built-in one bound to the analyzer provider.
    pub fn roster(&self) -> CadreResult<Roster> {
        if self.agents.is_empty() {
            Roster::new(default_roster(&self.orchestrator.analyzer_provider))
        } else {
            Roster::new(self.agents.clone())
        }
    }

    /// Provider keys referenced by the engine or an agent but not configured.
    pub fn missing_providers(&self, roster: &Roster) -> Vec<String> {
        let mut wanted = vec![
            self.orchestrator.analyzer_provider.as_str(),
            self.orchestrator.collator_provider.as_str(),
        ];
        wanted.extend(roster.agents().iter().map(|a| a.provider.as_str()));
        let mut missing: Vec<String> = wanted
            .into_iter()
            .filter(|p| !self.providers.contains_key(*p))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

/// Read and parse a config file.
pub fn parse_config(path: &Path) -> anyhow::Result<CadreConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config '{}'", path.display()))
}

/// Parse `path` if it exists, otherwise fall back to defaults.
pub fn load_config(path: &Path) -> anyhow::Result<CadreConfig> {
    if path.exists() {
        parse_config(path)
    } else {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        Ok(CadreConfig::default())
    }
}
