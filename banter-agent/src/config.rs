// ABOUTME: Backend section of the banter configuration file.
// ABOUTME: A `type` discriminator plus a free-form table handed to the backend factory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Backend configuration with type discriminator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type: "ollama", "mock"
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,

    /// Remaining fields passed to backend factory
    #[serde(flatten)]
    pub config: toml::Table,
}

fn default_backend_type() -> String {
    "ollama".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            config: toml::Table::new(),
        }
    }
}

impl BackendConfig {
    /// Parse a standalone `[backend]`-shaped TOML table
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse backend config TOML")
    }

    /// Get backend type name
    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }

    /// Set a string option, replacing any existing value
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.config
            .insert(key.to_string(), toml::Value::String(value.into()));
    }

    /// Read a string option
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Convert config table to serde_json::Value for registry
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_config() {
        let cfg = BackendConfig::parse(
            r#"
type = "ollama"
host = "http://gpu-box:11434"
"#,
        )
        .unwrap();
        assert_eq!(cfg.backend_type(), "ollama");
        assert_eq!(cfg.get_str("host"), Some("http://gpu-box:11434"));
    }

    #[test]
    fn test_default_type_is_ollama() {
        let cfg = BackendConfig::parse("").unwrap();
        assert_eq!(cfg.backend_type(), "ollama");
        assert!(cfg.config.is_empty());
    }

    #[test]
    fn test_to_json_value_carries_extra_keys() {
        let mut cfg = BackendConfig::default();
        cfg.set("host", "http://localhost:11434");
        let json = cfg.to_json_value();
        assert_eq!(json["host"], "http://localhost:11434");
        assert!(json.get("type").is_none());
    }
}
