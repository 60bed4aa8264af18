//! Configuration types for PizzaBox

use serde::{Deserialize, Serialize};

/// Default TonAPI endpoint
pub const DEFAULT_API_URL: &str = "https://tonapi.io";

/// TonAPI connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL (e.g., "https://tonapi.io")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for authenticated (higher rate limit) access (optional)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds. Unset means no client-side timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Base URL without a trailing slash
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "https://tonapi.io");
        assert!(config.api_key.is_none());
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = ApiConfig::new("https://testnet.tonapi.io/")
            .with_api_key("secret")
            .with_timeout_secs(10);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ApiConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.trimmed_base_url(), "https://testnet.tonapi.io");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let parsed: ApiConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, ApiConfig::default());
    }
}
