use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_PORTAL_BASE: &str = "http://vitibrasil.cnpuv.embrapa.br/";
pub const DEFAULT_USER_AGENT: &str = "Vitibrasil-Ingest/1.0";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where the portal lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl PortalConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self> {
        let base = std::env::var("PORTAL_BASE_URL").unwrap_or_else(|_| DEFAULT_PORTAL_BASE.to_string());
        let base_url = Url::parse(&base).context("PORTAL_BASE_URL is not a valid URL")?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            user_agent: std::env::var("HTTP_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
        })
    }
}
