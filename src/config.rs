use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::transcript::default_languages;
use crate::youtube::config::{FetcherConfig, ProxyConfig};

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_ORDER_TOKEN: &str = "unknown";

#[derive(Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_dir: PathBuf,
    pub languages: Vec<String>,
    pub proxy: Option<ProxyConfig>,
    pub upstream_timeout: Duration,
}

impl ServerConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        log_dir: PathBuf,
        languages: Vec<String>,
        proxy_http: Option<String>,
        proxy_https: Option<String>,
        proxy_regions: Vec<String>,
        upstream_timeout_secs: u64,
    ) -> Result<Self> {
        let languages: Vec<String> = languages
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        let languages = if languages.is_empty() {
            default_languages()
        } else {
            languages
        };

        let proxy = match (proxy_http, proxy_https) {
            (Some(http), https) => Some(ProxyConfig::new(http, https)),
            (None, Some(https)) => Some(ProxyConfig::new(https.clone(), Some(https))),
            (None, None) => None,
        };
        let proxy = match proxy {
            Some(proxy) => Some(proxy.with_region_filters(proxy_regions)),
            None if !proxy_regions.is_empty() => {
                return Err(anyhow!("Proxy regions were given without a proxy URL"));
            }
            None => None,
        };

        if upstream_timeout_secs == 0 {
            return Err(anyhow!("Upstream timeout must be at least one second"));
        }

        Ok(Self {
            host,
            port,
            log_dir,
            languages,
            proxy,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            proxy: self.proxy.clone(),
            timeout: self.upstream_timeout,
        }
    }
}

#[derive(Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub video_id: String,
    pub order: Option<String>,
}

impl ClientConfig {
    pub fn new(server_url: String, video_id: String, order: Option<String>) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            video_id,
            order,
        }
    }
}
