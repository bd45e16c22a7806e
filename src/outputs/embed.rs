//! Webhook message formatting.
//!
//! Turns a [`PostDetail`] into the single-embed [`WebhookMessage`] posted to
//! the webhook. Formatting never fails: every optional part of the post is
//! either rendered or left out of the payload.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::models::{Embed, EmbedAuthor, EmbedField, EmbedMedia, PostDetail, WebhookMessage};

pub const AUTHOR_NAME: &str = "New update about Ukraine";
pub const AUTHOR_URL: &str = "https://github.com/AlexFlipnote/ukraine_discord";
pub const THUMBNAIL_URL: &str = "https://cdn.discordapp.com/emojis/691373958087442486.png";
pub const EMBED_COLOR: u32 = 0xf1c40f;

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M | %I:%M %p";
const SOURCE_UNKNOWN: &str = "ℹ️ Unable to find source...";
const VIDEO_WARNING: &str = "> Warning: Can be graphical, view at own risk";

/// Formatting switches taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Attach the best available image.
    pub embed_image: bool,
    /// Flag or short label shown before the local-time line.
    pub local_label: String,
    pub local_utc_offset_hours: i32,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            embed_image: true,
            local_label: "🇺🇦".into(),
            local_utc_offset_hours: 2,
        }
    }
}

impl From<&Config> for EmbedOptions {
    fn from(config: &Config) -> Self {
        Self {
            embed_image: config.embed_image,
            local_label: config.local_tz_label.clone(),
            local_utc_offset_hours: config.local_utc_offset_hours,
        }
    }
}

/// Build the webhook message announcing `post`, stamped with `now`.
pub fn build_message(
    post: &PostDetail,
    options: &EmbedOptions,
    now: DateTime<Utc>,
) -> WebhookMessage {
    let mut description = match &post.source_url {
        Some(source) => format!("[ℹ️ Source of the news]({source})\n{}", post.entry.text),
        None => format!("{SOURCE_UNKNOWN}\n{}", post.entry.text),
    };
    if let Some(video) = &post.entry.video_url {
        description.push_str(&format!("\n\n{VIDEO_WARNING}\n[Twitter video]({video})"));
    }

    let image = options
        .embed_image
        .then(|| post.best_image())
        .flatten()
        .map(|url| EmbedMedia { url: url.to_string() });

    WebhookMessage {
        content: None,
        embeds: vec![Embed {
            author: EmbedAuthor {
                name: AUTHOR_NAME.into(),
                url: AUTHOR_URL.into(),
            },
            color: EMBED_COLOR,
            thumbnail: EmbedMedia {
                url: THUMBNAIL_URL.into(),
            },
            fields: vec![timezones_field(options, now)],
            description,
            image,
        }],
    }
}

/// UTC, configured local time, and a marker the client renders in the
/// reader's own timezone.
fn timezones_field(options: &EmbedOptions, now: DateTime<Utc>) -> EmbedField {
    let local = now + Duration::hours(i64::from(options.local_utc_offset_hours));
    let unix = now.timestamp();
    let value = [
        format!("🇬🇧 {}", now.format(TIMESTAMP_FORMAT)),
        format!("{} {}", options.local_label, local.format(TIMESTAMP_FORMAT)),
        format!("🌍 <t:{unix}:d> <t:{unix}:t>"),
    ]
    .join("\n");

    EmbedField {
        name: "Timezones".into(),
        value,
        inline: false,
    }
}
