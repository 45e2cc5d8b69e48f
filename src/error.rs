//! Error types for the channel-insight library.
//!
//! Two layers live here: [`InsightError`], the `thiserror` enum every fallible
//! operation returns, and [`ErrorKind`] / [`Diagnostics`], the closed taxonomy
//! of pipeline failure conditions. Only the fatal kinds are ever propagated
//! out of a pipeline run; the rest are recorded as diagnostics on the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the channel-insight application.
#[derive(Error, Debug)]
pub enum InsightError {
    /// No channel or video matched the supplied reference
    #[error("Reference could not be resolved: {0}")]
    NotResolvable(String),

    /// The channel has no videos inside the collection window
    #[error("No videos found for channel {channel_id}")]
    NoVideosFound {
        /// Channel that was searched
        channel_id: String,
    },

    /// The platform API answered with a non-success status
    #[error("Platform API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Body or reason returned by the API
        message: String,
        /// Seconds the API asked us to wait, if any
        retry_after: Option<u64>,
    },

    /// Transport-level HTTP failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An external call exceeded its deadline
    #[error("Operation timed out after {seconds} seconds")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// The run was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Sentiment backend failed to initialize or infer
    #[error("Classification unavailable: {0}")]
    Classification(String),

    /// Chart generation failed
    #[error("Rendering failed: {0}")]
    Rendering(String),

    /// Result store failure
    #[error("Store error: {0}")]
    Store(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary serialization errors
    #[error("Binary serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rejected user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with InsightError
pub type Result<T> = std::result::Result<T, InsightError>;

impl From<anyhow::Error> for InsightError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<sled::Error> for InsightError {
    fn from(err: sled::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl InsightError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Delay requested by the API before the next attempt.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Taxonomy kind of this error when it surfaces from a pipeline stage.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::NotResolvable(_) => Some(ErrorKind::NotResolvable),
            Self::NoVideosFound { .. } => Some(ErrorKind::NoVideosFound),
            Self::Classification(_) => Some(ErrorKind::ClassificationUnavailable),
            Self::Rendering(_) => Some(ErrorKind::RenderingFailure),
            Self::Store(_) | Self::Bincode(_) => Some(ErrorKind::StoreUnavailable),
            Self::Api { .. } | Self::Network(_) | Self::Timeout { .. } => {
                Some(ErrorKind::PartialCollectionFailure)
            }
            _ => None,
        }
    }
}

/// Closed set of pipeline failure conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No channel/video match
    NotResolvable,
    /// Zero videos after filtering
    NoVideosFound,
    /// A single video or comment page failed
    PartialCollectionFailure,
    /// ML backend failed to load or infer
    ClassificationUnavailable,
    /// Chart generation failed
    RenderingFailure,
    /// Persistence collaborator unreachable
    StoreUnavailable,
}

impl ErrorKind {
    /// Fatal kinds abort the run and are returned to the caller.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::NotResolvable | Self::NoVideosFound)
    }
}

/// One recoverable condition observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Failure taxonomy
    pub kind: ErrorKind,
    /// Pipeline stage that observed it (e.g. `collect`, `sentiment`)
    pub stage: String,
    /// Human readable detail
    pub message: String,
    /// When it was recorded
    pub at: DateTime<Utc>,
}

/// Ordered side-channel of recoverable conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty diagnostics channel
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a condition and emit it as a warning event.
    pub fn record(&mut self, kind: ErrorKind, stage: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = ?kind, stage, "{}", message);
        self.entries.push(Diagnostic {
            kind,
            stage: stage.to_string(),
            message,
            at: Utc::now(),
        });
    }

    /// All recorded entries, oldest first
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of entries of the given kind
    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// True when nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append another channel's entries
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }
}
