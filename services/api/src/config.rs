use anyhow::{Context, Result};
use collector::PortalConfig;
use std::str::FromStr;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Which store the api persists into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND '{}' (expected postgres or memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub portal: PortalConfig,
    pub backend: StoreBackend,
    pub db_url: Option<String>,
    pub db_max_connections: u32,
    pub bind: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let backend: StoreBackend = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let db_url = match backend {
            StoreBackend::Postgres => Some(std::env::var("DB_URL").context("DB_URL must be set")?),
            StoreBackend::Memory => None,
        };

        Ok(Self {
            portal: PortalConfig::from_env()?,
            backend,
            db_url,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DEFAULT_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            bind: std::env::var("API_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }
}
