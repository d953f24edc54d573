pub mod captions;
pub mod config;
pub mod fetcher;

use async_trait::async_trait;

use crate::error::TranscriptResult;

/// One timed piece of caption text, in timeline order.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Source of caption fragments for a video.
///
/// Implementations make a single attempt per call and pick the first
/// language in `languages` that the video has captions for.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> TranscriptResult<Vec<CaptionFragment>>;
}
