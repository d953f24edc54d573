use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{error, info, warn};

pub const LOG_FILE_NAME: &str = "transcript_api.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => f.write_str("INFO"),
            Level::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// One audit record per transcript request.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub order_token: String,
    pub video_id: String,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl LogEntry {
    pub fn new(order_token: &str, video_id: &str, outcome: Outcome, detail: Option<&str>) -> Self {
        let level = match outcome {
            Outcome::Success => Level::Info,
            Outcome::Failure => Level::Error,
        };
        Self {
            timestamp: Local::now(),
            level,
            order_token: order_token.to_string(),
            video_id: video_id.to_string(),
            outcome,
            detail: detail.map(str::to_string),
        }
    }

    pub fn message(&self) -> String {
        match self.outcome {
            Outcome::Success => format!(
                "✅ Transcript success: {} - {}",
                self.order_token, self.video_id
            ),
            Outcome::Failure => format!(
                "❌ Transcript failed: {} - {} - {}",
                self.order_token,
                self.video_id,
                self.detail.as_deref().unwrap_or("")
            ),
        }
    }

    /// The entry as written to the log file, without the trailing newline.
    /// Newlines inside the detail are flattened so the entry stays one line.
    pub fn to_line(&self) -> String {
        let message = self.message().replace(['\r', '\n'], " ");
        format!(
            "{} - {} - {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            message
        )
    }
}

/// Append-only audit log of request outcomes, mirrored to the console.
///
/// Never fails towards the caller: if the file sink breaks it is dropped and
/// the logger carries on console-only.
pub struct OutcomeLogger {
    sink: Mutex<Option<File>>,
    path: PathBuf,
}

impl OutcomeLogger {
    /// Creates `log_dir` if needed and opens the log file for appending.
    pub async fn open(log_dir: impl AsRef<Path>) -> Result<Self> {
        let log_dir = log_dir.as_ref();
        tokio::fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let path = log_dir.join(LOG_FILE_NAME);
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open log file {}", path.display()))?
            .into_std()
            .await;

        Ok(Self::with_file(file, path))
    }

    fn with_file(file: File, path: PathBuf) -> Self {
        Self {
            sink: Mutex::new(Some(file)),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, order_token: &str, video_id: &str, outcome: Outcome, detail: Option<&str>) {
        let entry = LogEntry::new(order_token, video_id, outcome, detail);
        self.write(&entry);
    }

    pub fn write(&self, entry: &LogEntry) {
        match entry.level {
            Level::Info => info!(target: "outcome", "{}", entry.message()),
            Level::Error => error!(target: "outcome", "{}", entry.message()),
        }

        let mut line = entry.to_line();
        line.push('\n');

        // a poisoned lock only means another writer panicked mid-line
        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(file) = sink.as_mut() else {
            return;
        };

        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            warn!("Outcome log file unavailable, continuing console-only: {e}");
            *sink = None;
        }
    }
}
