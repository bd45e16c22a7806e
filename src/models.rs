//! Data models for scraped posts and the outbound webhook message.
//!
//! - [`FeedEntry`]: the latest post as it appears on the list page
//! - [`PostDetail`]: a `FeedEntry` decorated with data from its detail page
//! - [`WebhookMessage`] and friends: the JSON body posted to the webhook
//!
//! Posts are built fresh every poll cycle and dropped after notification.
//! Only their `id` survives, as the dedup cursor.

use serde::{Deserialize, Serialize};

/// The most recent post on the list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Stable post identifier, compared against the dedup cursor.
    pub id: String,
    /// Human-readable summary of the update.
    pub text: String,
    /// Absolute URL of the post's detail page.
    pub detail_link: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

/// A post enriched with data from its detail page.
///
/// Holds its own copy of the feed entry so the list-stage snapshot is never
/// touched by the detail stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub entry: FeedEntry,
    /// Canonical attribution link.
    pub source_url: Option<String>,
    /// Full-size image from the detail popup.
    pub detail_image_url: Option<String>,
}

impl PostDetail {
    pub fn new(entry: &FeedEntry) -> Self {
        Self {
            entry: entry.clone(),
            source_url: None,
            detail_image_url: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    /// Detail image when the detail page has one, otherwise the thumbnail.
    pub fn best_image(&self) -> Option<&str> {
        self.detail_image_url
            .as_deref()
            .or(self.entry.image_url.as_deref())
    }
}

/// Body of a webhook execution request.
///
/// `content` is always serialized, as `null` when there is no plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub author: EmbedAuthor,
    pub color: u32,
    pub thumbnail: EmbedMedia,
    pub fields: Vec<EmbedField>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
}

/// `{ "url": ... }` object used for both thumbnails and images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}
