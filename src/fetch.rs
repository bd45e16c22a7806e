//! Page fetching.
//!
//! [`PageSource`] is the seam between the poll loop and the network: the
//! production [`HttpFetcher`] performs a GET with the configured user agent,
//! tests substitute canned pages.
//!
//! With `debug` enabled every fetched body is also written to
//! `<debug_dir>/debug_<unix millis>.html`. Capture failures are logged and
//! otherwise ignored.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Source of raw page markup.
pub trait PageSource {
    /// Fetch `url` and return its body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP implementation of [`PageSource`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Directory receiving raw responses when debug capture is on.
    debug_dir: Option<PathBuf>,
}

impl HttpFetcher {
    /// Build a fetcher with the user agent and timeout from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            debug_dir: config.debug.then(|| config.debug_dir.clone()),
        })
    }

    async fn capture(&self, body: &str) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let path = dir.join(format!("debug_{}.html", Utc::now().timestamp_millis()));
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(path = %dir.display(), error = %e, "Cannot create debug directory");
            return;
        }
        match tokio::fs::write(&path, body).await {
            Ok(()) => debug!(path = %path.display(), "Captured response"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to capture response"),
        }
    }
}

impl PageSource for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(url, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::transport(url, format!("reading body: {e}")))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::transport(url, format!("body is not UTF-8: {e}")))?;

        info!(
            bytes = text.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        self.capture(&text).await;
        Ok(text)
    }
}
