use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::Url;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Egress proxy used for every upstream call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http_url: String,
    pub https_url: String,
    pub allowed_region_filters: Vec<String>,
}

impl ProxyConfig {
    pub fn new(http_url: String, https_url: Option<String>) -> Self {
        let https_url = https_url.unwrap_or_else(|| http_url.clone());
        Self {
            http_url,
            https_url,
            allowed_region_filters: Vec::new(),
        }
    }

    pub fn with_region_filters(mut self, regions: Vec<String>) -> Self {
        self.allowed_region_filters = regions
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        self
    }

    /// Proxy for plaintext upstream connections.
    pub fn http_proxy(&self) -> Result<reqwest::Proxy> {
        let url = self.effective_url(&self.http_url)?;
        reqwest::Proxy::http(url.as_str()).map_err(|e| anyhow!("Invalid HTTP proxy: {}", e))
    }

    /// Proxy for TLS upstream connections.
    pub fn https_proxy(&self) -> Result<reqwest::Proxy> {
        let url = self.effective_url(&self.https_url)?;
        reqwest::Proxy::https(url.as_str()).map_err(|e| anyhow!("Invalid HTTPS proxy: {}", e))
    }

    /// Applies region filters to the proxy username, e.g. `user` becomes
    /// `user-US-DE` for filters `["us", "de"]`.
    pub fn effective_url(&self, raw: &str) -> Result<Url> {
        let mut url = Url::parse(raw).map_err(|e| anyhow!("Invalid proxy URL: {}", e))?;
        if self.allowed_region_filters.is_empty() {
            return Ok(url);
        }

        if url.username().is_empty() {
            return Err(anyhow!(
                "Proxy region filters require a username in the proxy URL"
            ));
        }

        let suffix: String = self
            .allowed_region_filters
            .iter()
            .map(|r| format!("-{}", r.to_uppercase()))
            .collect();
        let username = format!("{}{}", url.username(), suffix);
        url.set_username(&username)
            .map_err(|_| anyhow!("Proxy URL cannot carry a username"))?;
        Ok(url)
    }
}

/// Settings for the upstream transcript client.
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    pub proxy: Option<ProxyConfig>,
    pub timeout: Duration,
}
