use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_outbound_buffer_size")]
    pub outbound_buffer_size: usize,
    pub auth: AuthConfig,
    #[serde(default)]
    pub rates: RatesConfig,
}

impl BrokerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize broker config")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RatesConfig {
    #[serde(default)]
    pub upstream_url: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_outbound_buffer_size() -> usize {
    64
}

fn default_token_ttl_secs() -> u64 {
    3_600
}

#[cfg(test)]
mod tests {
    use super::BrokerConfig;

    #[test]
    fn test_parse_config() {
        let raw = r#"
bind_addr = "127.0.0.1:9100"
outbound_buffer_size = 128

[auth]
secret = "test-secret"
token_ttl_secs = 600

[rates]
upstream_url = "https://rates.example.com/v1/quotes"
"#;

        let config = BrokerConfig::from_str(raw).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1:9100");
        assert_eq!(config.outbound_buffer_size, 128);
        assert_eq!(config.auth.secret, "test-secret");
        assert_eq!(config.auth.token_ttl_secs, 600);
        assert_eq!(
            config.rates.upstream_url.as_deref(),
            Some("https://rates.example.com/v1/quotes")
        );
    }

    #[test]
    fn test_parse_config_defaults() {
        let raw = r#"
[auth]
secret = "only-the-secret"
"#;

        let config = BrokerConfig::from_str(raw).expect("config should parse");
        assert_eq!(config.bind_addr, "0.0.0.0:8001");
        assert_eq!(config.outbound_buffer_size, 64);
        assert_eq!(config.auth.token_ttl_secs, 3_600);
        assert!(config.rates.upstream_url.is_none());
    }

    #[test]
    fn test_missing_auth_section_is_rejected() {
        let err = BrokerConfig::from_str("bind_addr = \"127.0.0.1:0\"\n")
            .expect_err("config without [auth] should fail");
        assert!(err.to_string().contains("failed to deserialize broker config"));
    }
}
