//! Error types for the relay.
//!
//! Two layers:
//! - [`ExtractionError`]: the list page did not have the shape we need to
//!   identify the latest post. Optional data (image, video, source link) never
//!   produces one of these; it simply ends up as `None`.
//! - [`AppError`]: everything that can abandon a poll cycle. The poll loop
//!   matches on it to choose between the short feed retry and the normal
//!   (possibly escalated) sleep.

use std::fmt;

use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

/// The list page is missing something required to process its latest post.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The feed container is not on the page. Upstream serves this shape while
    /// it is throwing intermittent 5xx errors, so it gets a quick retry.
    #[error("feed root #{marker} not found on page")]
    FeedRootMissing { marker: String },

    /// The feed container exists but holds no post elements.
    #[error("feed root #{marker} has no posts")]
    EmptyFeed { marker: String },

    #[error("latest post has no `{attribute}` attribute")]
    MissingAttribute { attribute: String },

    #[error("latest post has no {element} element")]
    MissingElement { element: String },

    #[error("could not resolve {what} link '{href}': {message}")]
    InvalidLink {
        what: String,
        href: String,
        message: String,
    },
}

impl ExtractionError {
    pub fn missing_attribute(attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
        }
    }

    pub fn missing_element(element: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network failure, non-success status or undecodable body while fetching a page.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Reading or writing the dedup cursor failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The webhook rejected the message or could not be reached.
    #[error("notification error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Notification { status: Option<u16>, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    pub fn notification(status: Option<u16>, message: impl fmt::Display) -> Self {
        Self::Notification {
            status,
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Extraction(ExtractionError::FeedRootMissing { .. }) => "feed_root_missing",
            Self::Extraction(_) => "extraction",
            Self::Persistence(_) => "persistence",
            Self::Notification { .. } => "notification",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// True for the page shape upstream serves while it is failing transiently.
    pub fn is_feed_root_missing(&self) -> bool {
        matches!(
            self,
            Self::Extraction(ExtractionError::FeedRootMissing { .. })
        )
    }

    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Rate limiting (429) and server errors are worth another attempt; any
    /// other 4xx from the webhook means the request itself is wrong.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Notification { status: None, .. } => true,
            Self::Notification {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(format!("YAML: {e}"))
    }
}
