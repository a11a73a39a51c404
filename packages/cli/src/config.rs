use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use treebank_editor::EditorConfig;

pub const DEFAULT_CONFIG_NAME: &str = "treebank.config.json";

/// Treebank configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Settings handed to every editing session
    #[serde(default)]
    pub editor: EditorConfig,

    /// Reference annotation used for agreement scores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<String>,

    /// Overwrite the edited file instead of writing a backup next to it
    #[serde(default)]
    pub in_place: bool,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Resolve a path given on the command line or in the config
    pub fn resolve(&self, cwd: &str, path: &str) -> PathBuf {
        PathBuf::from(cwd).join(path)
    }
}
