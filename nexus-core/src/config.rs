use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{AssistantGateway, CommandProvider, DisabledProvider, TextProvider};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for the assistant gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Model identifier sent with every request
    pub model: String,
    /// Upper bound on a single call
    pub timeout_secs: u64,
    /// Provider command line; the prompt is appended as the last argument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            command: None,
        }
    }
}

impl AssistantConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Builds the gateway described by this configuration
    pub fn build_gateway(&self) -> AssistantGateway {
        let provider: Arc<dyn TextProvider> = match self
            .command
            .as_deref()
            .and_then(CommandProvider::from_argv)
        {
            Some(command) => Arc::new(command),
            None => Arc::new(DisabledProvider),
        };
        AssistantGateway::new(provider, self)
    }
}

/// Workbench configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NexusConfig {
    pub assistant: AssistantConfig,
}

impl NexusConfig {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the configuration if the file exists, otherwise returns defaults.
    /// `NEXUS_MODEL` overrides the model either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };

        if let Ok(model) = std::env::var("NEXUS_MODEL") {
            if !model.trim().is_empty() {
                config.assistant.model = model.trim().to_string();
            }
        }

        Ok(config)
    }

    /// Writes the configuration as YAML, creating missing directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).with_context(|| format!("Failed to write config to {:?}", path))
    }

    /// Writes the defaults unless a config file is already there.
    /// An existing file is never overwritten.
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if path.as_ref().exists() {
            return Ok(());
        }
        Self::default().save(path)
    }
}

/// `$NEXUS_CONFIG_PATH`, else `.nexus.config` in the home directory
pub fn get_config_path() -> Result<PathBuf> {
    match std::env::var_os("NEXUS_CONFIG_PATH") {
        Some(path) => Ok(PathBuf::from(path)),
        None => dirs::home_dir()
            .map(|home| home.join(".nexus.config"))
            .context("Failed to determine home directory"),
    }
}
