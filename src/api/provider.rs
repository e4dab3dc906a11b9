//! Anime streaming provider client
//!
//! Talks to a consumet-style JSON API: catalogue listings, anime info with
//! episodes, and per-server episode sources.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    AnimeDetail, AnimeSummary, EpisodeInfo, Page, SourceResponse, StreamingSource, SubtitleTrack,
};
use crate::playback::ServerName;

/// Public instance used when nothing is configured
pub const DEFAULT_BASE_URL: &str = "https://api.consumet.org/anime/zoro";

/// Provider API error types
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Anything that can turn an episode + server into candidate sources
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn sources(
        &self,
        episode_id: &str,
        server: &ServerName,
    ) -> Result<SourceResponse, ProviderError>;
}

/// HTTP client for the streaming provider
pub struct ProviderClient {
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl ProviderClient {
    /// Create a client for the public provider instance
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (self-hosted instance or tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET with retry on rate limits
    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            debug!(%url, "provider request");
            let response = self
                .client
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await?;
                    return serde_json::from_str(&body).map_err(|e| {
                        ProviderError::InvalidResponse(format!("JSON parse error: {}", e))
                    });
                }
                StatusCode::NOT_FOUND => {
                    return Err(ProviderError::NotFound);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(ProviderError::RateLimited);
                    }

                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    warn!(retries, wait_secs, "provider rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
                status => {
                    warn!(status = status.as_u16(), %url, "provider error");
                    return Err(ProviderError::ServerError(status.as_u16()));
                }
            }
        }
    }

    /// Search the catalogue by title
    pub async fn search(&self, query: &str, page: u32) -> Result<Page<AnimeSummary>, ProviderError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ProviderError::InvalidArgument("empty search query".into()));
        }
        let endpoint = format!("/{}?page={}", urlencoding::encode(query), page.max(1));
        let response: PageRaw = self.get(&endpoint).await?;
        Ok(response.into_page())
    }

    /// Currently airing, most popular first
    pub async fn top_airing(&self, page: u32) -> Result<Page<AnimeSummary>, ProviderError> {
        let endpoint = format!("/top-airing?page={}", page.max(1));
        let response: PageRaw = self.get(&endpoint).await?;
        Ok(response.into_page())
    }

    /// Latest released episodes
    pub async fn recent_episodes(&self, page: u32) -> Result<Page<AnimeSummary>, ProviderError> {
        let endpoint = format!("/recent-episodes?page={}", page.max(1));
        let response: PageRaw = self.get(&endpoint).await?;
        Ok(response.into_page())
    }

    /// Anime details including the episode list
    pub async fn info(&self, anime_id: &str) -> Result<AnimeDetail, ProviderError> {
        if anime_id.trim().is_empty() {
            return Err(ProviderError::InvalidArgument("empty anime id".into()));
        }
        let endpoint = format!("/info?id={}", urlencoding::encode(anime_id.trim()));
        let response: InfoRaw = self.get(&endpoint).await?;
        Ok(response.into_detail())
    }
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceProvider for ProviderClient {
    async fn sources(
        &self,
        episode_id: &str,
        server: &ServerName,
    ) -> Result<SourceResponse, ProviderError> {
        if episode_id.trim().is_empty() {
            return Err(ProviderError::InvalidArgument("empty episode id".into()));
        }
        let endpoint = format!(
            "/watch?episodeId={}&server={}",
            urlencoding::encode(episode_id.trim()),
            urlencoding::encode(server.as_str())
        );

        match self.get::<WatchRaw>(&endpoint).await {
            Ok(raw) => Ok(raw.into_response()),
            // The provider answers 404 when a server has nothing for the episode
            Err(ProviderError::NotFound) => {
                debug!(episode_id, %server, "provider has no sources for server");
                Ok(SourceResponse::default())
            }
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRaw {
    #[serde(default)]
    current_page: Option<u32>,
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    results: Vec<SummaryRaw>,
}

impl PageRaw {
    fn into_page(self) -> Page<AnimeSummary> {
        Page {
            current_page: self.current_page.unwrap_or(1),
            has_next_page: self.has_next_page,
            results: self
                .results
                .into_iter()
                .filter_map(SummaryRaw::into_summary)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRaw {
    id: Option<String>,
    title: Option<TitleRaw>,
    image: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    release_date: Option<String>,
    episode_number: Option<u32>,
    episode_id: Option<String>,
}

impl SummaryRaw {
    fn into_summary(self) -> Option<AnimeSummary> {
        // Entries without an id cannot be opened, drop them
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(AnimeSummary {
            title: self.title.map(TitleRaw::into_string).unwrap_or_else(|| id.clone()),
            id,
            image: self.image,
            kind: self.kind,
            release_date: self.release_date,
            episode_number: self.episode_number,
            episode_id: self.episode_id,
        })
    }
}

/// Titles arrive either as a string or as `{ romaji, english, native }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TitleRaw {
    Plain(String),
    Localized {
        english: Option<String>,
        romaji: Option<String>,
        native: Option<String>,
    },
}

impl TitleRaw {
    fn into_string(self) -> String {
        match self {
            TitleRaw::Plain(s) => s,
            TitleRaw::Localized {
                english,
                romaji,
                native,
            } => english.or(romaji).or(native).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfoRaw {
    id: String,
    title: Option<TitleRaw>,
    description: Option<String>,
    image: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    total_episodes: Option<u32>,
    #[serde(default)]
    episodes: Vec<EpisodeRaw>,
}

impl InfoRaw {
    fn into_detail(self) -> AnimeDetail {
        let episodes: Vec<EpisodeInfo> = self.episodes.into_iter().map(EpisodeRaw::into_episode).collect();
        AnimeDetail {
            title: self.title.map(TitleRaw::into_string).unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description.unwrap_or_default(),
            image: self.image,
            kind: self.kind,
            status: self.status,
            genres: self.genres,
            total_episodes: self.total_episodes.unwrap_or(episodes.len() as u32),
            episodes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeRaw {
    id: String,
    number: u32,
    title: Option<String>,
    #[serde(default)]
    is_filler: bool,
}

impl EpisodeRaw {
    fn into_episode(self) -> EpisodeInfo {
        EpisodeInfo {
            id: self.id,
            number: self.number,
            title: self.title.filter(|t| !t.trim().is_empty()),
            is_filler: self.is_filler,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WatchRaw {
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    sources: Vec<SourceRaw>,
    #[serde(default, alias = "tracks")]
    subtitles: Vec<TrackRaw>,
}

impl WatchRaw {
    fn into_response(self) -> SourceResponse {
        SourceResponse {
            sources: self
                .sources
                .into_iter()
                .filter_map(SourceRaw::into_source)
                .collect(),
            headers: self.headers.unwrap_or_default(),
            subtitles: self
                .subtitles
                .into_iter()
                .filter_map(TrackRaw::into_track)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceRaw {
    url: String,
    quality: Option<String>,
    #[serde(rename = "isM3U8")]
    is_m3u8: Option<bool>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl SourceRaw {
    fn into_source(self) -> Option<StreamingSource> {
        if self.url.trim().is_empty() {
            return None;
        }
        let is_segmented = self.is_m3u8.unwrap_or_else(|| {
            self.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("hls"))
                || self.url.contains(".m3u8")
        });
        Some(StreamingSource {
            url: self.url,
            quality: self.quality.filter(|q| !q.trim().is_empty()),
            is_segmented,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TrackRaw {
    #[serde(alias = "file")]
    url: Option<String>,
    #[serde(alias = "label")]
    lang: Option<String>,
    kind: Option<String>,
    #[serde(default)]
    default: bool,
}

impl TrackRaw {
    fn into_track(self) -> Option<SubtitleTrack> {
        let url = self.url.filter(|u| !u.is_empty())?;
        Some(SubtitleTrack {
            language_label: self.lang.or(self.kind).unwrap_or_default(),
            url,
            is_default: self.default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_consumet_shape() {
        let raw: WatchRaw = serde_json::from_str(
            r#"{
                "headers": {"Referer": "https://provider.to/"},
                "sources": [
                    {"url": "https://cdn.example/a.m3u8", "quality": "auto", "isM3U8": true},
                    {"url": "https://cdn.example/a.mp4", "quality": "720p", "isM3U8": false}
                ],
                "subtitles": [{"url": "https://subs.example/en.vtt", "lang": "English"}]
            }"#,
        )
        .unwrap();
        let response = raw.into_response();
        assert_eq!(response.sources.len(), 2);
        assert!(response.sources[0].is_segmented);
        assert!(!response.sources[1].is_segmented);
        assert_eq!(response.headers.get("Referer").unwrap(), "https://provider.to/");
        assert_eq!(response.subtitles[0].language_label, "English");
    }

    #[test]
    fn test_watch_tracks_shape() {
        let raw: WatchRaw = serde_json::from_str(
            r#"{
                "sources": [{"url": "https://cdn.example/master.m3u8", "type": "hls"}],
                "tracks": [
                    {"file": "https://subs.example/en.vtt", "label": "English", "kind": "captions", "default": true},
                    {"file": "https://subs.example/thumbs.vtt", "kind": "thumbnails"}
                ]
            }"#,
        )
        .unwrap();
        let response = raw.into_response();
        assert!(response.sources[0].is_segmented);
        assert!(response.sources[0].quality.is_none());
        assert!(response.headers.is_empty());
        assert_eq!(response.subtitles.len(), 2);
        assert!(response.subtitles[0].is_default);
        assert_eq!(response.subtitles[1].language_label, "thumbnails");
    }

    #[test]
    fn test_summary_without_id_dropped() {
        let raw: PageRaw = serde_json::from_str(
            r#"{"currentPage": 2, "hasNextPage": true, "results": [
                {"id": "frieren-18542", "title": "Frieren"},
                {"title": "Ghost entry"},
                {"id": "oshi-no-ko", "title": {"romaji": "Oshi no Ko", "english": null}}
            ]}"#,
        )
        .unwrap();
        let page = raw.into_page();
        assert_eq!(page.current_page, 2);
        assert!(page.has_next_page);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].title, "Oshi no Ko");
    }
}
