//! Parsing of the pages and documents YouTube serves while fetching captions.
//!
//! Everything here is pure so the provider's quirks can be tested without
//! network access.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;
use serde::Deserialize;

use crate::error::{TranscriptError, TranscriptResult};
use crate::youtube::CaptionFragment;

static API_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap());
static CONSENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).unwrap());
static TEXT_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b([^>/]*)>(.*?)</text>").unwrap());
static START_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart="([^"]*)""#).unwrap());
static DUR_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bdur="([^"]*)""#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

const BOT_CHECK_REASON: &str = "Sign in to confirm you\u{2019}re not a bot";

pub fn is_consent_page(html: &str) -> bool {
    html.contains("action=\"https://consent.youtube.com/s\"")
}

pub fn consent_value(html: &str) -> Option<String> {
    CONSENT_VALUE_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
}

pub fn is_recaptcha_page(html: &str) -> bool {
    html.contains("class=\"g-recaptcha\"")
}

pub fn innertube_api_key(html: &str) -> Option<String> {
    API_KEY_RE.captures(html).map(|caps| caps[1].to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(default)]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
pub struct PlayabilityStatus {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    #[serde(default)]
    pub player_captions_tracklist_renderer: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackList {
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    /// Timed-text URL in the legacy XML format.
    pub fn timedtext_url(&self) -> String {
        self.base_url.replace("&fmt=srv3", "")
    }

    pub fn requires_po_token(&self) -> bool {
        self.base_url.contains("&exp=xpe")
    }
}

/// Fails unless the player reports the video as playable.
pub fn check_playability(video_id: &str, player: &PlayerResponse) -> TranscriptResult<()> {
    let Some(status) = &player.playability_status else {
        return Ok(());
    };
    if status.status == "OK" {
        return Ok(());
    }

    let reason = status.reason.clone().unwrap_or_default();
    if status.status == "LOGIN_REQUIRED" && is_bot_check(&reason) {
        return Err(TranscriptError::UpstreamConnectivity(
            "YouTube is blocking requests from this IP (bot check)".to_string(),
        ));
    }

    let reason = if reason.is_empty() {
        format!("playability status {}", status.status)
    } else {
        reason
    };
    Err(TranscriptError::unavailable(video_id, reason))
}

fn is_bot_check(reason: &str) -> bool {
    reason == BOT_CHECK_REASON || reason.contains("not a bot")
}

/// Returns the caption tracks, or fails when captions are disabled.
pub fn caption_tracks(video_id: &str, player: PlayerResponse) -> TranscriptResult<Vec<CaptionTrack>> {
    let tracks = player
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .map(|list| list.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::no_captions(
            video_id,
            "subtitles are disabled for this video",
        ));
    }
    Ok(tracks)
}

/// Picks the track for the first language that has one. A manually created
/// track beats an auto-generated one for the same language.
pub fn select_track<'a>(
    video_id: &str,
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> TranscriptResult<&'a CaptionTrack> {
    for lang in languages {
        let manual = tracks
            .iter()
            .find(|t| &t.language_code == lang && !t.is_generated());
        let generated = || {
            tracks
                .iter()
                .find(|t| &t.language_code == lang && t.is_generated())
        };
        if let Some(track) = manual.or_else(generated) {
            return Ok(track);
        }
    }

    let available: Vec<&str> = tracks.iter().map(|t| t.language_code.as_str()).collect();
    Err(TranscriptError::no_captions(
        video_id,
        format!(
            "no transcripts were found for any of the requested language codes [{}]; available: [{}]",
            languages.join(", "),
            available.join(", ")
        ),
    ))
}

/// Parses a timed-text XML document into fragments, in document order.
pub fn parse_timedtext(xml: &str) -> TranscriptResult<Vec<CaptionFragment>> {
    if xml.trim().is_empty() {
        return Err(TranscriptError::UnexpectedResponse(
            "empty caption document".to_string(),
        ));
    }

    let mut fragments = Vec::new();
    for caps in TEXT_ELEMENT_RE.captures_iter(xml) {
        let attrs = &caps[1];
        let body = &caps[2];

        let start = parse_seconds(START_ATTR_RE.captures(attrs).map(|c| c[1].to_string()), "start")?;
        let duration = parse_seconds(DUR_ATTR_RE.captures(attrs).map(|c| c[1].to_string()), "dur")?;

        // an element without text carries nothing; one whose text is only
        // markup still counts as a (blank) fragment
        if body.is_empty() {
            continue;
        }

        // once for XML, once for the HTML escaped inside it
        let unescaped = decode_html_entities(&decode_html_entities(body)).into_owned();
        let text = TAG_RE.replace_all(&unescaped, "").into_owned();

        fragments.push(CaptionFragment {
            text,
            start,
            duration,
        });
    }

    Ok(fragments)
}

fn parse_seconds(raw: Option<String>, attr: &str) -> TranscriptResult<f64> {
    match raw {
        None => Ok(0.0),
        Some(value) => value.parse().map_err(|_| {
            TranscriptError::UnexpectedResponse(format!("invalid {attr} attribute: {value:?}"))
        }),
    }
}
