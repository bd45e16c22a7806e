//! Dedup cursor persistence.
//!
//! The cursor is the id of the last post that was successfully announced. It
//! is read at the top of every poll cycle and written once per cycle, after
//! the webhook accepted the notification. Every write is a single atomic
//! operation, so an interrupted process leaves either the old or the new
//! cursor behind, never a partial one.
//!
//! # Backends
//!
//! | Backend | Module | Storage |
//! |---------|--------|---------|
//! | `config` | [`config_file`] | `last_id` key of the configuration file |
//! | `sqlite` | [`sqlite`] | `articles` table, newest row is the cursor |

pub mod config_file;
pub mod sqlite;

pub use config_file::ConfigFileStore;
pub use sqlite::SqliteStore;

use std::path::Path;

use tracing::{debug, info};

use crate::config::{Config, StateBackendKind};
use crate::error::{AppError, Result};
use crate::models::PostDetail;
use crate::utils::ensure_writable_dir;

/// Persistent holder of the last announced post id.
pub trait StateStore {
    /// Last announced post id, `None` before the first announcement.
    async fn last_seen_id(&self) -> Result<Option<String>>;

    /// Record `post` as the last announced post.
    async fn set_last_seen(&self, post: &PostDetail) -> Result<()>;
}

/// Store selected at runtime from `state_backend`.
#[derive(Debug)]
pub enum StateBackend {
    ConfigFile(ConfigFileStore),
    Sqlite(SqliteStore),
}

impl StateBackend {
    /// Open the backend named by `config`.
    ///
    /// `config_path` is the file `config` was loaded from; the `config`
    /// backend writes the cursor back into it. That file must parse and its
    /// directory must accept the temp file used for writes, otherwise opening
    /// fails before any post is announced.
    pub async fn open(config: &Config, config_path: &Path) -> Result<Self> {
        let backend = match config.state_backend {
            StateBackendKind::Config => {
                let store = ConfigFileStore::new(config_path);
                let cursor = store.last_seen_id().await?;
                let dir = match config_path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                ensure_writable_dir(dir).await.map_err(|e| {
                    AppError::persistence(format!(
                        "cursor directory {} is not writable: {e}",
                        dir.display()
                    ))
                })?;
                debug!(?cursor, "Config file cursor is readable");
                Self::ConfigFile(store)
            }
            StateBackendKind::Sqlite => {
                Self::Sqlite(SqliteStore::open(&config.database_path).await?)
            }
        };
        info!(backend = ?config.state_backend, "Opened state store");
        Ok(backend)
    }
}

impl StateStore for StateBackend {
    async fn last_seen_id(&self) -> Result<Option<String>> {
        match self {
            Self::ConfigFile(store) => store.last_seen_id().await,
            Self::Sqlite(store) => store.last_seen_id().await,
        }
    }

    async fn set_last_seen(&self, post: &PostDetail) -> Result<()> {
        match self {
            Self::ConfigFile(store) => store.set_last_seen(post).await,
            Self::Sqlite(store) => store.set_last_seen(post).await,
        }
    }
}
