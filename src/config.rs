use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Backend endpoint configuration.
///
/// Two base URLs, mirroring the split on the server side: the web address
/// serves generation/orchestration (`/generate`, `/models`, `/upload`,
/// `/clear_history`, `/foundry_files`) and the api address fronts the
/// execution kernel (`/api`, `/restart`, `/interrupt`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web_url: String,
    pub api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let web_url = std::env::var("CODECHAT_WEB_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let api_url = std::env::var("CODECHAT_API_URL").unwrap_or_else(|_| web_url.clone());

        Ok(Self {
            web_url: web_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("CODECHAT_WEB_URL", &self.web_url),
            ("CODECHAT_API_URL", &self.api_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Invalid {name} '{url}': expected http:// or https:// URL");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_api_url_to_web_url() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var("CODECHAT_WEB_URL", "http://localhost:9999/");
        std::env::remove_var("CODECHAT_API_URL");

        let config = Config::load().expect("config should load");
        assert_eq!(config.web_url, "http://localhost:9999");
        assert_eq!(config.api_url, "http://localhost:9999");

        std::env::remove_var("CODECHAT_WEB_URL");
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let config = Config {
            web_url: "ftp://example.com".to_string(),
            api_url: "http://localhost:8080".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_https_urls() {
        let config = Config {
            web_url: "https://codechat.example.com".to_string(),
            api_url: "https://codechat.example.com/kernel".to_string(),
        };
        assert!(config.validate().is_ok());
    }
}
