//! SQLite-backed persistence for classified videos and watch events.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use thiserror::Error;
use tracing::debug;
use vbal_core::{Category, Video, WatchEvent};

pub const CRATE_NAME: &str = "vbal-store";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Durable store for `Video` rows (replace-on-conflict by id) and append-only
/// `WatchEvent` rows. Last write wins on video id conflicts; the database,
/// not this crate, serializes concurrent writers.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. A single pooled connection keeps every
    /// query on the same memory instance.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Idempotent schema setup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                video_id        TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                channel_title   TEXT NOT NULL,
                thumbnail_url   TEXT,
                duration_seconds INTEGER,
                published_at_ms INTEGER,
                category        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watch_events (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id      TEXT NOT NULL,
                watched_at_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_watch_events_video_id ON watch_events(video_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_watch_events_watched_at ON watch_events(watched_at_ms)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Full-row replace keyed by video id; prior rows are never merged.
    pub async fn upsert_video(&self, video: &Video) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO videos
                (video_id, title, channel_title, thumbnail_url,
                 duration_seconds, published_at_ms, category)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&video.video_id)
        .bind(&video.title)
        .bind(&video.channel_title)
        .bind(&video.thumbnail_url)
        .bind(video.duration_seconds)
        .bind(video.published_at_ms)
        .bind(video.category.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_videos(&self, videos: &[Video]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for video in videos {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO videos
                    (video_id, title, channel_title, thumbnail_url,
                     duration_seconds, published_at_ms, category)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&video.video_id)
            .bind(&video.title)
            .bind(&video.channel_title)
            .bind(&video.thumbnail_url)
            .bind(video.duration_seconds)
            .bind(video.published_at_ms)
            .bind(video.category.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(count = videos.len(), "upserted video batch");
        Ok(())
    }

    pub async fn video_by_id(&self, video_id: &str) -> Result<Option<Video>, StoreError> {
        let row = sqlx::query("SELECT * FROM videos WHERE video_id = ?1")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| video_from_row(&r)).transpose()
    }

    pub async fn videos_by_category(&self, category: Category) -> Result<Vec<Video>, StoreError> {
        let rows = sqlx::query("SELECT * FROM videos WHERE category = ?1")
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(video_from_row).collect()
    }

    pub async fn insert_watch_event(&self, event: &WatchEvent) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO watch_events (video_id, watched_at_ms) VALUES (?1, ?2)")
            .bind(&event.video_id)
            .bind(event.watched_at_ms)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Videos joined to watch events at or after `start_ms`, newest event
    /// first. A video watched N times in the window comes back N times.
    pub async fn watched_videos_after(&self, start_ms: i64) -> Result<Vec<Video>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT v.* FROM videos v
            INNER JOIN watch_events we ON v.video_id = we.video_id
            WHERE we.watched_at_ms >= ?1
            ORDER BY we.watched_at_ms DESC
            "#,
        )
        .bind(start_ms)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(video_from_row).collect()
    }

    pub async fn watch_event_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM watch_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn video_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Full wipe of both tables.
    pub async fn delete_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM watch_events")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM videos").execute(&self.pool).await?;
        Ok(())
    }
}

fn video_from_row(row: &SqliteRow) -> Result<Video, StoreError> {
    let category: String = row.try_get("category")?;
    Ok(Video {
        video_id: row.try_get("video_id")?,
        title: row.try_get("title")?,
        channel_title: row.try_get("channel_title")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        duration_seconds: row.try_get("duration_seconds")?,
        published_at_ms: row.try_get("published_at_ms")?,
        category: Category::from_str_or_default(&category),
    })
}
