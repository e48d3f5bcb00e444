use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::proxy::ProxyConfig;

/// Settings file; flags and environment variables take precedence over it
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub webshare_proxy_username: Option<String>,
    pub webshare_proxy_password: Option<String>,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytmcp/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Fill unset fields from `other`
    pub fn or(self, other: Config) -> Config {
        Config {
            webshare_proxy_username: self.webshare_proxy_username.or(other.webshare_proxy_username),
            webshare_proxy_password: self.webshare_proxy_password.or(other.webshare_proxy_password),
            http_proxy: self.http_proxy.or(other.http_proxy),
            https_proxy: self.https_proxy.or(other.https_proxy),
        }
    }

    pub fn proxy(&self) -> Option<ProxyConfig> {
        ProxyConfig::select(
            self.webshare_proxy_username.as_deref(),
            self.webshare_proxy_password.as_deref(),
            self.http_proxy.as_deref(),
            self.https_proxy.as_deref(),
        )
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytmcp")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
webshare_proxy_username = "user"
webshare_proxy_password = "pass"
http_proxy = "http://localhost:8080"
https_proxy = "https://localhost:8443"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.webshare_proxy_username.as_deref(), Some("user"));
        assert_eq!(config.webshare_proxy_password.as_deref(), Some("pass"));
        assert_eq!(config.http_proxy.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.https_proxy.as_deref(), Some("https://localhost:8443"));
        assert!(matches!(config.proxy(), Some(ProxyConfig::Webshare { .. })));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.webshare_proxy_username.is_none());
        assert!(config.http_proxy.is_none());
        assert_eq!(config.proxy(), None);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"https_proxy = "https://localhost:8443""#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.proxy(),
            Some(ProxyConfig::Generic {
                http_url: None,
                https_url: Some("https://localhost:8443".to_string()),
            })
        );
    }

    #[test]
    fn test_or_prefers_self() {
        let flags = Config {
            http_proxy: Some("http://flag:8080".to_string()),
            ..Default::default()
        };
        let file = Config {
            http_proxy: Some("http://file:8080".to_string()),
            https_proxy: Some("https://file:8443".to_string()),
            ..Default::default()
        };
        let merged = flags.or(file);
        assert_eq!(merged.http_proxy.as_deref(), Some("http://flag:8080"));
        assert_eq!(merged.https_proxy.as_deref(), Some("https://file:8443"));
    }
}
