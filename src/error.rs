use thiserror::Error;

pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Why a transcript could not be produced for a video.
///
/// The `Display` text of every variant is what callers see in the `error`
/// field of a failed response, so it is phrased for humans.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={video_id}! No captions available: {detail}"
    )]
    NoCaptionsAvailable { video_id: String, detail: String },

    #[error(
        "Could not retrieve a transcript for the video https://www.youtube.com/watch?v={video_id}! The video is unavailable: {reason}"
    )]
    VideoUnavailable { video_id: String, reason: String },

    #[error("Upstream connectivity failure: {0}")]
    UpstreamConnectivity(String),

    #[error("Unexpected response from upstream: {0}")]
    UnexpectedResponse(String),
}

impl TranscriptError {
    pub fn no_captions(video_id: &str, detail: impl Into<String>) -> Self {
        TranscriptError::NoCaptionsAvailable {
            video_id: video_id.to_string(),
            detail: detail.into(),
        }
    }

    pub fn unavailable(video_id: &str, reason: impl Into<String>) -> Self {
        TranscriptError::VideoUnavailable {
            video_id: video_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Short label used in server-side diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::NoCaptionsAvailable { .. } => "no_captions",
            TranscriptError::VideoUnavailable { .. } => "video_unavailable",
            TranscriptError::UpstreamConnectivity(_) => "upstream_connectivity",
            TranscriptError::UnexpectedResponse(_) => "unexpected_response",
        }
    }
}

impl From<reqwest::Error> for TranscriptError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest hides the interesting part (refused, dns, tls) in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        if err.is_timeout() {
            TranscriptError::UpstreamConnectivity(format!("request timed out: {message}"))
        } else if err.is_decode() {
            TranscriptError::UnexpectedResponse(message)
        } else {
            TranscriptError::UpstreamConnectivity(message)
        }
    }
}
