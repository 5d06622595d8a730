//! Catalog API contract + reqwest client for the upstream video catalog.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "vbal-catalog";

// ---------------------------------------------------------------------------
// Wire DTOs (upstream JSON is camelCase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPlaylists {
    #[serde(default)]
    pub watch_history: Option<String>,
    #[serde(default)]
    pub likes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub snippet: Snippet,
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
    #[serde(default)]
    pub video_published_at: Option<String>,
}

/// Shared snippet shape across playlist items, video details, and search hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(default)]
    pub published_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

impl Thumbnails {
    /// Medium first, then high, then default.
    pub fn best_url(&self) -> Option<String> {
        self.medium
            .as_ref()
            .or(self.high.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideosResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub content_details: VideoContentDetails,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContentDetails {
    /// ISO 8601 duration token, e.g. `PT1H2M10S`.
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: SearchItemId,
    #[serde(default)]
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    #[serde(default)]
    pub video_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Contract + client
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// The upstream catalog, consumed as an interface. The engine never talks
/// to the network directly; tests substitute in-memory implementations.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn get_my_channel(&self) -> Result<ChannelResponse, CatalogError>;

    async fn get_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsResponse, CatalogError>;

    /// `ids` is a comma-joined list of video identifiers.
    async fn get_videos(&self, ids: &str) -> Result<VideosResponse, CatalogError>;

    /// Searches the medium duration band, ordered by view count upstream.
    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchResponse, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Already-valid bearer credential; refresh belongs to the caller.
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            bearer_token: None,
            timeout: Duration::from_secs(20),
            user_agent: "vbal/0.1".to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("VBAL_API_BASE_URL").unwrap_or(defaults.base_url),
            bearer_token: std::env::var("VBAL_API_TOKEN").ok(),
            timeout: std::env::var("VBAL_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            user_agent: std::env::var("VBAL_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }
}

/// Single-shot reqwest client. No internal retries: transient failures
/// surface to the engine, which fails the whole operation and leaves retry
/// policy to its caller.
#[derive(Debug)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(path, "catalog request");

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            // Includes 401/403: the client fails closed rather than refresh.
            return Err(CatalogError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn get_my_channel(&self) -> Result<ChannelResponse, CatalogError> {
        self.get_json("channels", &[("part", "contentDetails"), ("mine", "true")])
            .await
    }

    async fn get_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsResponse, CatalogError> {
        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("maxResults", "50"),
            ("playlistId", playlist_id),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json("playlistItems", &query).await
    }

    async fn get_videos(&self, ids: &str) -> Result<VideosResponse, CatalogError> {
        self.get_json("videos", &[("part", "contentDetails,snippet"), ("id", ids)])
            .await
    }

    async fn search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchResponse, CatalogError> {
        let max_results = max_results.to_string();
        self.get_json(
            "search",
            &[
                ("part", "snippet"),
                ("type", "video"),
                ("order", "viewCount"),
                ("videoDuration", "medium"),
                ("maxResults", &max_results),
                ("q", query),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_response_decodes_watch_history_id() {
        let json = r#"{
            "items": [{
                "contentDetails": {
                    "relatedPlaylists": {"watchHistory": "HLxyz", "likes": "LLxyz"}
                }
            }]
        }"#;
        let decoded: ChannelResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            decoded.items[0]
                .content_details
                .related_playlists
                .watch_history
                .as_deref(),
            Some("HLxyz")
        );
    }

    #[test]
    fn missing_watch_history_decodes_as_none() {
        let json = r#"{
            "items": [{"contentDetails": {"relatedPlaylists": {"likes": "LLxyz"}}}]
        }"#;
        let decoded: ChannelResponse = serde_json::from_str(json).unwrap();
        assert!(decoded.items[0]
            .content_details
            .related_playlists
            .watch_history
            .is_none());
    }

    #[test]
    fn playlist_page_decodes_items_and_token() {
        let json = r#"{
            "items": [{
                "snippet": {
                    "title": "A video",
                    "channelTitle": "A channel",
                    "thumbnails": {"medium": {"url": "https://img/m.jpg"}},
                    "publishedAt": "2026-08-01T10:00:00Z"
                },
                "contentDetails": {"videoId": "vid-1"}
            }],
            "nextPageToken": "tok-2"
        }"#;
        let decoded: PlaylistItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.items[0].content_details.video_id, "vid-1");
        assert_eq!(decoded.next_page_token.as_deref(), Some("tok-2"));
    }

    #[test]
    fn video_item_tolerates_missing_snippet() {
        let json = r#"{
            "items": [{"id": "vid-1", "contentDetails": {"duration": "PT3M20S"}}]
        }"#;
        let decoded: VideosResponse = serde_json::from_str(json).unwrap();
        assert!(decoded.items[0].snippet.is_none());
        assert_eq!(decoded.items[0].content_details.duration, "PT3M20S");
    }

    #[test]
    fn search_items_may_lack_a_video_id() {
        let json = r#"{
            "items": [
                {"id": {"videoId": "vid-1"}, "snippet": {"title": "t", "channelTitle": "c", "thumbnails": {}, "publishedAt": ""}},
                {"id": {}, "snippet": {"title": "t2", "channelTitle": "c2", "thumbnails": {}, "publishedAt": ""}}
            ]
        }"#;
        let decoded: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.items[0].id.video_id.as_deref(), Some("vid-1"));
        assert!(decoded.items[1].id.video_id.is_none());
    }

    #[test]
    fn thumbnails_prefer_medium_then_high_then_default() {
        let full = Thumbnails {
            default: Some(Thumbnail { url: "d".into() }),
            medium: Some(Thumbnail { url: "m".into() }),
            high: Some(Thumbnail { url: "h".into() }),
        };
        assert_eq!(full.best_url().as_deref(), Some("m"));

        let no_medium = Thumbnails {
            medium: None,
            ..full.clone()
        };
        assert_eq!(no_medium.best_url().as_deref(), Some("h"));

        assert_eq!(Thumbnails::default().best_url(), None);
    }
}
