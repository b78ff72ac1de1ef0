//! Config Module - Configuration management

use std::time::Duration;
use tokio::sync::RwLock;
use serde::{Serialize, Deserialize};

pub const ENV_PORT: &str = "PATIENTDB_PORT";
pub const ENV_DATA_FILE: &str = "PATIENTDB_DATA_FILE";

/// Main configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_ms: 30000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding every patient record
    pub data_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: "patients.json".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn parse_config(path: &str, content: &str) -> Result<Config, String> {
    if path.ends_with(".toml") {
        toml::from_str(content).map_err(|e| format!("Invalid TOML: {}", e))
    } else if path.ends_with(".json") {
        serde_json::from_str(content).map_err(|e| format!("Invalid JSON: {}", e))
    } else {
        Err("Unsupported config format".to_string())
    }
}

/// Configuration manager with reload
pub struct ConfigManager {
    config: RwLock<Config>,
    config_path: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            config_path: None,
        }
    }

    /// Load from file
    pub async fn load(&mut self, path: &str) -> Result<(), String> {
        let content = tokio::fs::read_to_string(path).await
            .map_err(|e| format!("Failed to read config: {}", e))?;
        let config = parse_config(path, &content)?;

        *self.config.write().await = config;
        self.config_path = Some(path.to_string());
        Ok(())
    }

    /// Reload config from file
    pub async fn reload(&self) -> Result<(), String> {
        if let Some(path) = &self.config_path {
            let content = tokio::fs::read_to_string(path).await
                .map_err(|e| format!("Failed to read config: {}", e))?;
            let config = parse_config(path, &content)?;
            *self.config.write().await = config;
        }
        Ok(())
    }

    /// Get current config
    pub async fn get(&self) -> Config {
        self.config.read().await.clone()
    }

    /// Apply `PATIENTDB_*` environment overrides
    pub async fn apply_env(&self) -> Result<(), String> {
        let mut config = self.config.write().await;

        if let Ok(port) = std::env::var(ENV_PORT) {
            config.server.port = port
                .parse()
                .map_err(|_| format!("{} must be a port number, got '{}'", ENV_PORT, port))?;
        }
        if let Ok(data_file) = std::env::var(ENV_DATA_FILE) {
            config.storage.data_file = data_file;
        }
        Ok(())
    }

    /// Override the listening port
    pub async fn set_port(&self, port: u16) {
        self.config.write().await.server.port = port;
    }

    /// Override the data file location
    pub async fn set_data_file(&self, data_file: &str) {
        self.config.write().await.storage.data_file = data_file.to_string();
    }

    /// Validate config
    pub async fn validate(&self) -> Result<(), Vec<String>> {
        let config = self.config.read().await;
        let mut errors = Vec::new();

        if config.server.port == 0 {
            errors.push("Invalid server port".to_string());
        }

        if config.server.request_timeout_ms == 0 {
            errors.push("request_timeout_ms must be > 0".to_string());
        }

        if config.storage.data_file.trim().is_empty() {
            errors.push("storage.data_file must not be empty".to_string());
        }

        if !matches!(config.logging.format.as_str(), "pretty" | "json") {
            errors.push(format!("Unknown logging format '{}'", config.logging.format));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Export config as TOML
    pub async fn export_toml(&self) -> Result<String, String> {
        let config = self.config.read().await;
        toml::to_string_pretty(&*config)
            .map_err(|e| format!("Failed to serialize: {}", e))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_are_valid() {
        let manager = ConfigManager::new();
        assert!(manager.validate().await.is_ok());
        let config = manager.get().await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.data_file, "patients.json");
    }

    #[tokio::test]
    async fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patientdb.toml");
        std::fs::write(&path, "[storage]\ndata_file = \"/tmp/p.json\"\n").unwrap();

        let mut manager = ConfigManager::new();
        manager.load(path.to_str().unwrap()).await.unwrap();

        let config = manager.get().await;
        assert_eq!(config.storage.data_file, "/tmp/p.json");
        assert_eq!(config.server.port, 8080);
    }

    #[tokio::test]
    async fn test_export_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.toml");

        let manager = ConfigManager::new();
        manager.set_port(9090).await;
        std::fs::write(&path, manager.export_toml().await.unwrap()).unwrap();

        let mut loaded = ConfigManager::new();
        loaded.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(loaded.get().await, manager.get().await);
    }

    #[tokio::test]
    async fn test_validate_collects_problems() {
        let mut config = Config::default();
        config.server.port = 0;
        config.logging.format = "xml".to_string();

        let errors = ConfigManager::with_config(config).validate().await.unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let mut manager = ConfigManager::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: {}").unwrap();
        assert!(manager.load(path.to_str().unwrap()).await.is_err());
    }
}
