//! Cursor stored in a SQLite database.
//!
//! Every announced post is kept as a row of the `articles` table. The cursor
//! is the most recently written row, so recording a post and advancing the
//! cursor is one `INSERT OR REPLACE` statement.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, instrument};

use super::StateStore;
use crate::error::{AppError, Result};
use crate::models::PostDetail;

const CREATE_ARTICLES: &str = r"
    CREATE TABLE IF NOT EXISTS articles (
        post_id TEXT NOT NULL,
        text TEXT NOT NULL,
        video TEXT,
        image TEXT,
        source TEXT,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (post_id)
    )
";

/// One announced post as stored in `articles`.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ArticleRecord {
    pub post_id: String,
    pub text: String,
    pub video: Option<String>,
    pub image: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the schema.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::persistence(format!("cannot open {}: {e}", path.display()))
            })?;

        sqlx::query(CREATE_ARTICLES).execute(&pool).await?;
        info!("SQLite state store ready");
        Ok(Self { pool })
    }

    /// Every stored article, oldest first.
    #[cfg(test)]
    pub async fn articles(&self) -> Result<Vec<ArticleRecord>> {
        let rows = sqlx::query_as::<_, ArticleRecord>(
            "SELECT post_id, text, video, image, source FROM articles ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

impl StateStore for SqliteStore {
    #[instrument(level = "debug", skip_all)]
    async fn last_seen_id(&self) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT post_id FROM articles ORDER BY rowid DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    #[instrument(level = "info", skip_all, fields(id = %post.id()))]
    async fn set_last_seen(&self, post: &PostDetail) -> Result<()> {
        // REPLACE deletes any older row for the id first, so the re-inserted
        // row gets the highest rowid and becomes the cursor.
        sqlx::query(
            "INSERT OR REPLACE INTO articles (post_id, text, video, image, source) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.id())
        .bind(&post.entry.text)
        .bind(post.entry.video_url.as_deref())
        .bind(post.best_image())
        .bind(post.source_url.as_deref())
        .execute(&self.pool)
        .await?;
        debug!("Article recorded");
        Ok(())
    }
}
