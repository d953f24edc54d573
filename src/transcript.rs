use std::sync::Arc;

use crate::error::TranscriptResult;
use crate::youtube::{CaptionFragment, TranscriptProvider};

/// Korean first, English as the fallback.
pub const DEFAULT_LANGUAGES: &[&str] = &["ko", "en"];

/// Asks the provider for captions using a fixed language preference list.
#[derive(Clone)]
pub struct LanguageResolver {
    provider: Arc<dyn TranscriptProvider>,
    languages: Vec<String>,
}

impl LanguageResolver {
    pub fn new(provider: Arc<dyn TranscriptProvider>, languages: Vec<String>) -> Self {
        Self {
            provider,
            languages,
        }
    }

    pub async fn resolve(&self, video_id: &str) -> TranscriptResult<Vec<CaptionFragment>> {
        self.provider.fetch(video_id, &self.languages).await
    }
}

pub fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
}

/// Joins fragment texts with single spaces, keeping their order.
pub fn assemble(fragments: &[CaptionFragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
