//! Webhook delivery.
//!
//! [`Notify`] abstracts "deliver this message somewhere"; [`WebhookNotifier`]
//! posts it as JSON to the configured webhook URL. Retries live in
//! [`crate::retry::RetryNotify`], which wraps any [`Notify`].

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::models::WebhookMessage;
use crate::utils::truncate_for_log;

/// Trait for async message delivery.
pub trait Notify {
    /// Deliver `message`, succeeding only once the receiver accepted it.
    async fn send(&self, message: &WebhookMessage) -> Result<()>;
}

/// Posts messages to a Discord-compatible webhook.
pub struct WebhookNotifier {
    url: String,
    http: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("cannot build webhook client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

// The webhook URL embeds its secret token, keep it out of logs.
impl fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookNotifier").finish_non_exhaustive()
    }
}

impl Notify for WebhookNotifier {
    #[instrument(level = "info", skip_all)]
    async fn send(&self, message: &WebhookMessage) -> Result<()> {
        let t0 = Instant::now();
        let resp = self
            .http
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::notification(None, e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                status = %status,
                body = %truncate_for_log(&body, 300),
                "Webhook returned non-success"
            );
            return Err(AppError::notification(
                Some(status.as_u16()),
                truncate_for_log(&body, 300),
            ));
        }

        info!(
            status = %status,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Webhook delivered"
        );
        Ok(())
    }
}
