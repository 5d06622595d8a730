//! History sync, balance reporting, and recommendation ranking.
//!
//! Every public operation is a sequential request/response flow: pagination,
//! detail batches, and keyword searches run strictly one after another, since
//! each step feeds on state accumulated by the previous one and the upstream
//! cursor is not safe to page concurrently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use vbal_catalog::{CatalogApi, CatalogConfig, CatalogError, HttpCatalog, VideoItem};
use vbal_core::{
    classify, parse_iso8601_duration, search_keywords, BalanceReport, Category, Video, WatchEvent,
};
use vbal_store::{Store, StoreError};

pub const CRATE_NAME: &str = "vbal-engine";

/// Hard ceiling on unique history items per sync.
pub const HISTORY_ITEM_CAP: usize = 200;
/// Upstream detail lookups accept at most 50 ids per request.
pub const DETAIL_BATCH_SIZE: usize = 50;
/// Only the leading search phrases per category drive recommendations.
pub const RECOMMEND_KEYWORDS: usize = 2;
pub const SEARCH_MAX_RESULTS: u32 = 30;
/// Inclusive duration band for recommendations: 2 to 14 minutes.
pub const RECOMMEND_MIN_SECONDS: i32 = 120;
pub const RECOMMEND_MAX_SECONDS: i32 = 840;
pub const RECOMMEND_LIMIT: usize = 5;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("watch history not available for this account")]
    HistoryUnavailable,
    #[error("catalog api error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Outcome of one `sync_history` run. The run id ties log lines and caller
/// output to a single sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages: usize,
    pub unique_videos: usize,
    pub events_recorded: usize,
    pub videos_upserted: usize,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("VBAL_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:vbal.db".to_string()),
        }
    }
}

/// The four public operations over an injected catalog and store. No shared
/// mutable state beyond the store; a caller may run engines for different
/// users side by side.
pub struct BalanceEngine {
    catalog: Arc<dyn CatalogApi>,
    store: Store,
}

impl BalanceEngine {
    pub fn new(catalog: Arc<dyn CatalogApi>, store: Store) -> Self {
        Self { catalog, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Walks the paginated watch history, records one watch event per
    /// occurrence, then detail-fetches the unique ids in batches and upserts
    /// classified videos.
    ///
    /// Pagination stops when the API stops handing out page tokens or when
    /// 200 unique ids have accumulated, whichever comes first; a page already
    /// fetched is always ingested whole. A failing call aborts the sync but
    /// keeps whatever was persisted before it.
    pub async fn sync_history(&self) -> Result<SyncSummary, EngineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "starting history sync");

        let channel = self.catalog.get_my_channel().await?;
        let playlist_id = channel
            .items
            .first()
            .and_then(|item| item.content_details.related_playlists.watch_history.clone())
            .ok_or(EngineError::HistoryUnavailable)?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut unique_ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        let mut events_recorded = 0usize;

        loop {
            let page = self
                .catalog
                .get_playlist_items(&playlist_id, page_token.as_deref())
                .await?;
            pages += 1;

            for item in &page.items {
                let video_id = item.content_details.video_id.clone();
                if seen.insert(video_id.clone()) {
                    unique_ids.push(video_id.clone());
                }

                // The event is recorded even when the timestamp is garbage.
                let watched_at_ms = parse_timestamp_ms(&item.snippet.published_at)
                    .unwrap_or_else(|| Utc::now().timestamp_millis());
                self.store
                    .insert_watch_event(&WatchEvent {
                        video_id,
                        watched_at_ms,
                    })
                    .await?;
                events_recorded += 1;
            }

            page_token = page.next_page_token;
            if page_token.is_none() || unique_ids.len() >= HISTORY_ITEM_CAP {
                break;
            }
        }

        let mut videos_upserted = 0usize;
        for batch in unique_ids.chunks(DETAIL_BATCH_SIZE) {
            let details = self.catalog.get_videos(&batch.join(",")).await?;
            let videos: Vec<Video> = details.items.iter().map(video_from_detail).collect();
            videos_upserted += videos.len();
            self.store.upsert_videos(&videos).await?;
        }

        let summary = SyncSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            pages,
            unique_videos: unique_ids.len(),
            events_recorded,
            videos_upserted,
        };
        info!(
            %run_id,
            pages = summary.pages,
            unique_videos = summary.unique_videos,
            events = summary.events_recorded,
            "history sync complete"
        );
        Ok(summary)
    }

    /// Aggregates watched duration per category over the trailing window and
    /// normalizes against the largest bucket.
    pub async fn balance_report(&self, window_days: u32) -> Result<BalanceReport, EngineError> {
        let start_ms = Utc::now().timestamp_millis() - i64::from(window_days) * MILLIS_PER_DAY;
        let watched = self.store.watched_videos_after(start_ms).await?;

        let rows: Vec<(Category, i64)> = watched
            .iter()
            .map(|video| {
                (
                    video.category,
                    i64::from(video.duration_seconds.unwrap_or(0)),
                )
            })
            .collect();

        Ok(vbal_core::balance_report(window_days, &rows))
    }

    /// Searches the category's leading keywords, keeps 2-to-14-minute
    /// results, and returns the five most recently published. An empty list
    /// is a valid outcome, not an error.
    pub async fn recommendations(&self, category: Category) -> Result<Vec<Video>, EngineError> {
        let mut collected: Vec<Video> = Vec::new();

        for keyword in search_keywords(category).iter().take(RECOMMEND_KEYWORDS) {
            let query = format!("{keyword} beginner");
            let search = self.catalog.search_videos(&query, SEARCH_MAX_RESULTS).await?;

            let candidate_ids: Vec<String> = search
                .items
                .iter()
                .filter_map(|item| item.id.video_id.clone())
                .collect();
            if candidate_ids.is_empty() {
                warn!(keyword, "search returned no candidates, skipping keyword");
                continue;
            }

            for batch in candidate_ids.chunks(DETAIL_BATCH_SIZE) {
                let details = self.catalog.get_videos(&batch.join(",")).await?;
                for item in &details.items {
                    let Some(snippet) = &item.snippet else {
                        continue;
                    };
                    let duration = parse_iso8601_duration(&item.content_details.duration);
                    if !(RECOMMEND_MIN_SECONDS..=RECOMMEND_MAX_SECONDS).contains(&duration) {
                        continue;
                    }
                    collected.push(Video {
                        video_id: item.id.clone(),
                        title: snippet.title.clone(),
                        channel_title: snippet.channel_title.clone(),
                        thumbnail_url: snippet.thumbnails.best_url(),
                        duration_seconds: Some(duration),
                        published_at_ms: parse_timestamp_ms(&snippet.published_at),
                        category,
                    });
                }
            }
        }

        // Most recent first; unknown publish time sorts last.
        collected.sort_by_key(|video| std::cmp::Reverse(video.published_at_ms.unwrap_or(0)));
        collected.truncate(RECOMMEND_LIMIT);
        Ok(collected)
    }

    pub async fn delete_all_local_data(&self) -> Result<(), EngineError> {
        self.store.delete_all().await?;
        info!("deleted all local data");
        Ok(())
    }
}

/// Engine wired from environment config: reqwest catalog client + SQLite
/// store, schema applied.
pub async fn engine_from_env() -> Result<BalanceEngine, EngineError> {
    let catalog = HttpCatalog::new(CatalogConfig::from_env())?;
    let store = Store::connect(&EngineConfig::from_env().database_url).await?;
    store.migrate().await?;
    Ok(BalanceEngine::new(Arc::new(catalog), store))
}

fn video_from_detail(item: &VideoItem) -> Video {
    let duration = parse_iso8601_duration(&item.content_details.duration);
    match &item.snippet {
        Some(snippet) => Video {
            video_id: item.id.clone(),
            title: snippet.title.clone(),
            channel_title: snippet.channel_title.clone(),
            thumbnail_url: snippet.thumbnails.best_url(),
            duration_seconds: Some(duration),
            published_at_ms: parse_timestamp_ms(&snippet.published_at),
            category: classify(&snippet.title, &snippet.channel_title),
        },
        // Missing snippet degrades to an empty default row, never a failure.
        None => Video {
            video_id: item.id.clone(),
            title: String::new(),
            channel_title: String::new(),
            thumbnail_url: None,
            duration_seconds: Some(duration),
            published_at_ms: None,
            category: Category::Entertainment,
        },
    }
}

fn parse_timestamp_ms(timestamp: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
