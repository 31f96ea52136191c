use anyhow::{Context, Result};
use fleet_client::{ControlPlaneClient, RetryPolicy, SessionStore};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_IMAGE: &str = "corp/mcp-base:latest";
pub const LOG_FILE: &str = "console.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub home: PathBuf,
    pub gateway_host: String,
    pub default_image: String,
    pub http_timeout: Duration,
    pub fetch_retries: u32,
    pub retry_backoff: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = match var("FLEET_HOME") {
            Some(home) => PathBuf::from(home),
            None => PathBuf::from(var("HOME").unwrap_or_else(|| ".".to_string())).join(".fleet"),
        };

        Ok(Self {
            api_url: var("FLEET_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            home,
            gateway_host: var("FLEET_GATEWAY_HOST").unwrap_or_else(|| "localhost".to_string()),
            default_image: var("FLEET_DEFAULT_IMAGE").unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            http_timeout: Duration::from_secs(
                var("FLEET_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse()
                    .context("FLEET_HTTP_TIMEOUT_SECS must be a number of seconds")?,
            ),
            fetch_retries: var("FLEET_FETCH_RETRIES")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .context("FLEET_FETCH_RETRIES must be a non-negative integer")?,
            retry_backoff: Duration::from_millis(
                var("FLEET_RETRY_BACKOFF_MS")
                    .unwrap_or_else(|| "250".to_string())
                    .parse()
                    .context("FLEET_RETRY_BACKOFF_MS must be a number of milliseconds")?,
            ),
        })
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(&self.home)
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join(LOG_FILE)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.fetch_retries,
            backoff: self.retry_backoff,
        }
    }

    /// Client without credentials, for login and public endpoints
    pub fn client(&self) -> Result<ControlPlaneClient> {
        let client = ControlPlaneClient::with_timeout(&self.api_url, self.http_timeout)
            .with_context(|| format!("Invalid FLEET_API_URL '{}'", self.api_url))?;
        Ok(client.with_retry(self.retry_policy()))
    }
}
