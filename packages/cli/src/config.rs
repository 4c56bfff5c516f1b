use blockwright_editor::{AutosaveConfig, BuiltinRegistry, JsonFileRegistry, RegistrySource};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "blockwright.config.json";

/// Blockwright configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one JSON file per document
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// JSON block schemas; the built-in types are used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<String>,

    #[serde(default)]
    pub autosave: AutosaveConfig,
}

fn default_data_dir() -> String {
    ".blockwright".to_string()
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
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn get_data_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.data_dir)
    }

    pub fn registry_source(&self, cwd: &str) -> Box<dyn RegistrySource> {
        match &self.registry_path {
            Some(path) => Box::new(JsonFileRegistry::new(PathBuf::from(cwd).join(path))),
            None => Box::new(BuiltinRegistry),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            registry_path: None,
            autosave: AutosaveConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "dataDir": "pages",
            "registryPath": "blocks.json",
            "autosave": { "debounceMs": 500, "maxAttempts": 2 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.data_dir, "pages");
        assert_eq!(config.registry_path.as_deref(), Some("blocks.json"));
        assert_eq!(config.autosave.debounce_ms, 500);
        assert_eq!(config.autosave.max_attempts, 2);
        assert_eq!(config.autosave.max_backoff_ms, 30_000);
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.data_dir, ".blockwright");
        assert!(config.registry_path.is_none());
        assert_eq!(config.autosave, AutosaveConfig::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.get_data_dir(&cwd), dir.path().join(".blockwright"));
    }
}
