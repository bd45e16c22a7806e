//! The poll loop.
//!
//! Each cycle walks a fixed sequence of phases:
//!
//! ```text
//! FetchingList -> ExtractingList -> Comparing
//!     unchanged: -> Sleeping
//!     changed:   -> FetchingDetail -> ExtractingDetail -> Notifying -> Persisting -> Sleeping
//! ```
//!
//! A cycle either completes or fails as a whole; the loop itself never stops.
//! After a cycle the loop sleeps:
//!
//! - success: a random duration in `[poll_min_secs, poll_max_secs]`
//! - feed root missing: a short fixed `feed_retry_secs`, up to
//!   `feed_retry_limit` times in a row
//! - any other failure: the random duration, doubled for every consecutive
//!   failure and capped at `max_backoff_secs`
//!
//! The cursor is only written after the webhook accepted the message, so a
//! failed delivery is retried on the next cycle. The last delivered post is
//! also kept in memory: if its cursor write fails, later cycles retry the
//! write without sending the message again.

use std::time::Duration;

use chrono::Utc;
use rand::{Rng, rng};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::{Config, MarkupTemplate};
use crate::error::{AppError, ExtractionError, Result};
use crate::fetch::PageSource;
use crate::models::PostDetail;
use crate::outputs::embed::{EmbedOptions, build_message};
use crate::outputs::webhook::Notify;
use crate::retry::exponential_delay;
use crate::scrapers::{detail::extract_detail, feed::extract_latest};
use crate::store::StateStore;
use crate::utils::truncate_for_log;

/// Phase of a poll cycle, logged as the cycle advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchingList,
    ExtractingList,
    Comparing,
    FetchingDetail,
    ExtractingDetail,
    Notifying,
    Persisting,
    Sleeping,
}

/// How a successful cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The latest post is the one already announced.
    Unchanged { id: String },
    /// A new post was announced and the cursor advanced.
    Notified { id: String },
    /// A new post was found in dry-run mode: printed, not sent, not recorded.
    DryRun { id: String },
    /// The post was announced earlier in this run but its cursor write
    /// failed; the write succeeded now and nothing was sent.
    Recorded { id: String },
}

/// Poll loop settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub feed_url: Url,
    pub poll_min: Duration,
    pub poll_max: Duration,
    pub feed_retry: Duration,
    pub feed_retry_limit: u32,
    pub max_backoff: Duration,
    pub template: MarkupTemplate,
    pub embed: EmbedOptions,
    pub dry_run: bool,
}

impl PollSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let feed_url = Url::parse(&config.feed_url)
            .map_err(|e| AppError::config(format!("feed_url is invalid: {e}")))?;
        Ok(Self {
            feed_url,
            poll_min: Duration::from_secs(config.poll_min_secs),
            poll_max: Duration::from_secs(config.poll_max_secs),
            feed_retry: Duration::from_secs(config.feed_retry_secs),
            feed_retry_limit: config.feed_retry_limit,
            max_backoff: Duration::from_secs(config.max_backoff_secs),
            template: config.template.clone(),
            embed: EmbedOptions::from(config),
            dry_run,
        })
    }
}

/// Drives fetch → extract → compare → notify → persist cycles.
pub struct Poller<P, N, S> {
    source: P,
    notifier: N,
    store: S,
    settings: PollSettings,
    consecutive_failures: u32,
    feed_root_misses: u32,
    /// Last post the webhook accepted during this run.
    last_notified: Option<PostDetail>,
}

impl<P, N, S> Poller<P, N, S>
where
    P: PageSource,
    N: Notify,
    S: StateStore,
{
    pub fn new(source: P, notifier: N, store: S, settings: PollSettings) -> Self {
        Self {
            source,
            notifier,
            store,
            settings,
            consecutive_failures: 0,
            feed_root_misses: 0,
            last_notified: None,
        }
    }

    /// Poll forever. Only an external interrupt ends this future.
    pub async fn run(&mut self) {
        info!(
            feed_url = %self.settings.feed_url,
            dry_run = self.settings.dry_run,
            "Poll loop starting"
        );
        loop {
            let result = self.run_cycle().await;
            let delay = self.next_delay(&result);
            debug!(phase = ?Phase::Sleeping, delay_secs = delay.as_secs(), "Sleeping");
            sleep(delay).await;
        }
    }

    /// Run a single cycle and report its result.
    ///
    /// Errors propagate unchanged so the caller can decide what to do with
    /// them; the loop in [`Poller::run`] turns them into a delay.
    #[instrument(level = "info", skip_all, fields(feed_url = %self.settings.feed_url))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        info!("Checking for new posts");
        let feed_url = self.settings.feed_url.as_str();

        debug!(phase = ?Phase::FetchingList);
        let list_html = self.source.fetch(feed_url).await?;

        debug!(phase = ?Phase::ExtractingList);
        let entry = extract_latest(&list_html, &self.settings.feed_url, &self.settings.template)?;

        debug!(phase = ?Phase::Comparing, id = %entry.id);
        let last_seen = self.store.last_seen_id().await?;
        if last_seen.as_deref() == Some(entry.id.as_str()) {
            return Ok(CycleOutcome::Unchanged { id: entry.id });
        }
        if let Some(sent) = self.last_notified.as_ref().filter(|p| p.id() == entry.id) {
            warn!(id = %entry.id, "Post already announced, retrying cursor write");
            debug!(phase = ?Phase::Persisting);
            self.store.set_last_seen(sent).await?;
            return Ok(CycleOutcome::Recorded { id: entry.id });
        }
        info!(id = %entry.id, previous = ?last_seen, "New post found, checking detail page");

        debug!(phase = ?Phase::FetchingDetail, url = %entry.detail_link);
        let detail_html = self.source.fetch(&entry.detail_link).await?;

        debug!(phase = ?Phase::ExtractingDetail);
        let detail_url =
            Url::parse(&entry.detail_link).map_err(|e| ExtractionError::InvalidLink {
                what: "detail".into(),
                href: entry.detail_link.clone(),
                message: e.to_string(),
            })?;
        let detail = extract_detail(&detail_html, &detail_url, &entry, &self.settings.template);

        debug!(phase = ?Phase::Notifying);
        let message = build_message(&detail, &self.settings.embed, Utc::now());
        if self.settings.dry_run {
            println!("{}", serde_json::to_string_pretty(&message)?);
            return Ok(CycleOutcome::DryRun { id: entry.id });
        }
        self.notifier.send(&message).await?;
        let detail = self.last_notified.insert(detail);

        debug!(phase = ?Phase::Persisting);
        self.store.set_last_seen(detail).await?;

        info!(id = %entry.id, text = %truncate_for_log(&entry.text, 200), "Announced new post");
        Ok(CycleOutcome::Notified { id: entry.id })
    }

    /// Decide how long to sleep after a cycle and update failure counters.
    pub fn next_delay(&mut self, result: &Result<CycleOutcome>) -> Duration {
        match result {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                self.feed_root_misses = 0;
                let delay = self.jitter();
                if let CycleOutcome::Unchanged { id } = outcome {
                    info!(%id, delay_secs = delay.as_secs(), "Found no news, waiting");
                }
                delay
            }
            Err(e) if e.is_feed_root_missing() => {
                self.feed_root_misses += 1;
                if self.feed_root_misses <= self.settings.feed_retry_limit {
                    warn!(
                        misses = self.feed_root_misses,
                        delay_secs = self.settings.feed_retry.as_secs(),
                        error = %e,
                        "Failed to get feed root, probably a 5xx page, trying again"
                    );
                    self.settings.feed_retry
                } else {
                    self.failure_delay(e)
                }
            }
            Err(e) => {
                self.feed_root_misses = 0;
                self.failure_delay(e)
            }
        }
    }

    fn failure_delay(&mut self, e: &AppError) -> Duration {
        self.consecutive_failures += 1;
        let delay = exponential_delay(
            self.jitter(),
            self.consecutive_failures,
            self.settings.max_backoff,
        );
        error!(
            kind = e.kind(),
            error = %e,
            consecutive_failures = self.consecutive_failures,
            delay_secs = delay.as_secs(),
            "Poll cycle failed"
        );
        delay
    }

    /// Random wait within the configured poll window.
    fn jitter(&self) -> Duration {
        let min = self.settings.poll_min.as_secs();
        let max = self.settings.poll_max.as_secs().max(min);
        Duration::from_secs(rng().random_range(min..=max))
    }
}
