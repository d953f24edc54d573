use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use serde_json::json;

use crate::error::{TranscriptError, TranscriptResult};
use crate::youtube::captions::{self, PlayerResponse};
use crate::youtube::config::FetcherConfig;
use crate::youtube::{CaptionFragment, TranscriptProvider};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// Fetches captions from YouTube, through the configured egress proxy if any.
#[derive(Clone)]
pub struct YoutubeFetcher {
    http: reqwest::Client,
    base_url: String,
}

impl YoutubeFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);

        match &config.proxy {
            Some(proxy) => {
                info!(
                    "Routing upstream requests through proxy (regions: {:?})",
                    proxy.allowed_region_filters
                );
                builder = builder.proxy(proxy.http_proxy()?).proxy(proxy.https_proxy()?);
            }
            None => {
                // env proxies would silently bypass the explicit configuration
                builder = builder.no_proxy();
            }
        }

        let http = builder
            .build()
            .map_err(|e| anyhow!("Failed to build upstream HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: YOUTUBE_BASE_URL.to_string(),
        })
    }

    async fn watch_page(&self, video_id: &str) -> TranscriptResult<String> {
        let html = self.get_watch_page(video_id, None).await?;
        if !captions::is_consent_page(&html) {
            return Ok(html);
        }

        debug!("Consent page served for {video_id}, retrying with consent cookie");
        let value = captions::consent_value(&html).ok_or_else(|| {
            TranscriptError::UpstreamConnectivity("failed to set the consent cookie".to_string())
        })?;
        let html = self
            .get_watch_page(video_id, Some(format!("CONSENT=YES+{value}")))
            .await?;
        if captions::is_consent_page(&html) {
            return Err(TranscriptError::UpstreamConnectivity(
                "failed to set the consent cookie".to_string(),
            ));
        }
        Ok(html)
    }

    async fn get_watch_page(&self, video_id: &str, cookie: Option<String>) -> TranscriptResult<String> {
        let mut request = self
            .http
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)])
            .header(ACCEPT_LANGUAGE, "en-US");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        check_status(response.status())?;
        Ok(response.text().await?)
    }

    async fn player(&self, video_id: &str, api_key: &str) -> TranscriptResult<PlayerResponse> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .http
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .header(ACCEPT_LANGUAGE, "en-US")
            .json(&body)
            .send()
            .await?;
        check_status(response.status())?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            TranscriptError::UnexpectedResponse(format!("invalid player response: {e}"))
        })
    }

    async fn timedtext(&self, url: &str) -> TranscriptResult<String> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?;
        check_status(response.status())?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeFetcher {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> TranscriptResult<Vec<CaptionFragment>> {
        if video_id.starts_with("http://") || video_id.starts_with("https://") {
            return Err(TranscriptError::unavailable(
                video_id,
                "expected a video id, not a URL",
            ));
        }

        let html = self.watch_page(video_id).await?;
        if captions::is_recaptcha_page(&html) {
            warn!("Upstream served a captcha for {video_id}");
            return Err(TranscriptError::UpstreamConnectivity(
                "YouTube is blocking requests from this IP (captcha)".to_string(),
            ));
        }

        let api_key = captions::innertube_api_key(&html).ok_or_else(|| {
            if html.contains("\"playabilityStatus\":") {
                TranscriptError::UnexpectedResponse("innertube API key not found".to_string())
            } else {
                TranscriptError::unavailable(video_id, "the video is no longer available")
            }
        })?;

        let player = self.player(video_id, &api_key).await?;
        captions::check_playability(video_id, &player)?;
        let tracks = captions::caption_tracks(video_id, player)?;
        let track = captions::select_track(video_id, &tracks, languages)?;

        if track.requires_po_token() {
            return Err(TranscriptError::UpstreamConnectivity(
                "the caption track requires a PO token".to_string(),
            ));
        }

        debug!(
            "Fetching {} captions for {video_id} (generated: {})",
            track.language_code,
            track.is_generated()
        );
        let xml = self.timedtext(&track.timedtext_url()).await?;
        captions::parse_timedtext(&xml)
    }
}

fn check_status(status: StatusCode) -> TranscriptResult<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TranscriptError::UpstreamConnectivity(
            "too many requests (HTTP 429)".to_string(),
        ));
    }
    if !status.is_success() {
        return Err(TranscriptError::UpstreamConnectivity(format!(
            "YouTube returned HTTP {status}"
        )));
    }
    Ok(())
}
