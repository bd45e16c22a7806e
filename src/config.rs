//! Runtime configuration.
//!
//! The configuration file is read once at startup into a [`Config`] and passed
//! by reference to the components that need it. JSON is the default format;
//! files ending in `.yaml` or `.yml` are read as YAML.
//!
//! The file doubles as the default home of the dedup cursor (`last_id`), see
//! [`crate::store::ConfigFileStore`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{AppError, Result};

pub const DEFAULT_FEED_URL: &str = "https://liveuamap.com/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// On-disk format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Where the dedup cursor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackendKind {
    /// The `last_id` key of the configuration file itself.
    #[default]
    Config,
    /// The `articles` table of a SQLite database.
    Sqlite,
}

/// Element markers of the upstream page template.
///
/// Upstream versions its markup from time to time; keeping the markers here
/// lets a template change be absorbed through configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupTemplate {
    /// `id` of the element holding every post on the list page.
    pub feed_root_id: String,
    /// Attribute carrying the stable post identifier.
    pub post_id_attr: String,
    pub title_class: String,
    pub comment_link_class: String,
    pub image_class: String,
    /// Attribute on the post element that may directly hold a video URL.
    pub video_attr: String,
    pub video_quote_class: String,
    pub source_link_class: String,
    pub popup_image_class: String,
}

impl Default for MarkupTemplate {
    fn default() -> Self {
        Self {
            feed_root_id: "feedler".into(),
            post_id_attr: "data-id".into(),
            title_class: "title".into(),
            comment_link_class: "comment-link".into(),
            image_class: "img".into(),
            video_attr: "data-twitpic".into(),
            video_quote_class: "twitter-video".into(),
            source_link_class: "source-link".into(),
            popup_image_class: "popup_imgi".into(),
        }
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination of outbound notifications.
    pub webhook_url: String,
    pub user_agent: String,
    /// Attach the post image to the notification.
    pub embed_image: bool,
    /// Dedup cursor when `state_backend` is `config`.
    pub last_id: Option<String>,
    /// Capture every fetched page under `debug_dir`.
    pub debug: bool,
    pub debug_dir: PathBuf,

    pub feed_url: String,
    pub poll_min_secs: u64,
    pub poll_max_secs: u64,
    /// Delay before re-fetching when the feed root is missing.
    pub feed_retry_secs: u64,
    /// Consecutive feed-root misses served with the short delay before
    /// falling back to the escalating failure backoff.
    pub feed_retry_limit: u32,
    pub max_backoff_secs: u64,
    pub request_timeout_secs: u64,

    pub state_backend: StateBackendKind,
    pub database_path: PathBuf,

    /// Label shown next to the local-time line of the notification.
    pub local_tz_label: String,
    pub local_utc_offset_hours: i32,

    pub template: MarkupTemplate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            user_agent: DEFAULT_USER_AGENT.into(),
            embed_image: true,
            last_id: None,
            debug: false,
            debug_dir: PathBuf::from("./debug"),
            feed_url: DEFAULT_FEED_URL.into(),
            poll_min_secs: 45,
            poll_max_secs: 75,
            feed_retry_secs: 5,
            feed_retry_limit: 12,
            max_backoff_secs: 600,
            request_timeout_secs: 30,
            state_backend: StateBackendKind::Config,
            database_path: PathBuf::from("storage.db"),
            local_tz_label: "🇺🇦".into(),
            local_utc_offset_hours: 2,
            template: MarkupTemplate::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON or YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))?;
        info!(
            feed_url = %config.feed_url,
            backend = ?config.state_backend,
            debug = config.debug,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| AppError::config(format!("invalid JSON config: {e}")))?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        };
        debug!(?config, "Parsed configuration");
        Ok(config)
    }

    /// Check values for basic sanity.
    ///
    /// The webhook URL is only required when notifications are actually sent.
    pub fn validate(&self, require_webhook: bool) -> Result<()> {
        if require_webhook {
            if self.webhook_url.trim().is_empty() {
                return Err(AppError::config("webhook_url is not set"));
            }
            Url::parse(&self.webhook_url)
                .map_err(|e| AppError::config(format!("webhook_url is invalid: {e}")))?;
        }
        Url::parse(&self.feed_url)
            .map_err(|e| AppError::config(format!("feed_url is invalid: {e}")))?;
        if self.user_agent.trim().is_empty() {
            return Err(AppError::config("user_agent is empty"));
        }
        if self.poll_min_secs == 0 || self.poll_min_secs > self.poll_max_secs {
            return Err(AppError::config(format!(
                "poll window [{}, {}] is invalid",
                self.poll_min_secs, self.poll_max_secs
            )));
        }
        if self.feed_retry_secs == 0 {
            return Err(AppError::config("feed_retry_secs must be > 0"));
        }
        if self.max_backoff_secs < self.poll_max_secs {
            return Err(AppError::config(
                "max_backoff_secs must be at least poll_max_secs",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::config("request_timeout_secs must be > 0"));
        }
        if self.template.feed_root_id.trim().is_empty() {
            return Err(AppError::config("template.feed_root_id is empty"));
        }
        Ok(())
    }
}
