//! Segmented stream fetching
//!
//! Fetches HLS playlists the way a player's segment engine would: every
//! request passes through the session's [`RequestInterceptor`] first.

use reqwest::header::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::playback::RequestInterceptor;

/// Errors from manifest/segment fetches
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Stream host returned HTTP {0}")]
    Http(u16),
    #[error("Not an HLS playlist")]
    NotManifest,
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// What a manifest probe found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestSummary {
    /// Variant streams in the master playlist (0 for a media playlist)
    pub variants: usize,
    /// Media segments in the first playable playlist
    pub segments: usize,
    pub duration_secs: f64,
    pub first_segment: Option<String>,
}

/// HTTP fetcher with an optional request interceptor
pub struct SegmentFetcher {
    client: reqwest::Client,
    interceptor: Option<Arc<dyn RequestInterceptor>>,
}

impl SegmentFetcher {
    pub fn new(interceptor: Option<Arc<dyn RequestInterceptor>>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            interceptor,
        }
    }

    /// Headers that would be sent for `url`
    pub fn request_headers(&self, url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(interceptor) = &self.interceptor {
            interceptor.intercept(url, &mut headers);
        }
        headers
    }

    /// GET a playlist or segment as text
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let headers = self.request_headers(url);
        debug!(url, headers = headers.len(), "segment engine request");

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Fetch a manifest and, for a master playlist, its first variant
    pub async fn probe(&self, manifest_url: &str) -> Result<ManifestSummary, FetchError> {
        let base = Url::parse(manifest_url).map_err(|_| FetchError::InvalidUrl(manifest_url.into()))?;
        let text = self.fetch_text(manifest_url).await?;
        let playlist = parse_playlist(&text)?;

        if playlist.variants.is_empty() {
            return Ok(summarize(0, &playlist, &base));
        }

        let variant_url = base
            .join(&playlist.variants[0])
            .map_err(|_| FetchError::InvalidUrl(playlist.variants[0].clone()))?;
        let media_text = self.fetch_text(variant_url.as_str()).await?;
        let media = parse_playlist(&media_text)?;
        Ok(summarize(playlist.variants.len(), &media, &variant_url))
    }
}

#[derive(Debug, Default)]
struct Playlist {
    variants: Vec<String>,
    segments: Vec<String>,
    duration_secs: f64,
}

fn parse_playlist(text: &str) -> Result<Playlist, FetchError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next() != Some("#EXTM3U") {
        return Err(FetchError::NotManifest);
    }

    let mut playlist = Playlist::default();
    let mut expect_variant = false;
    let mut expect_segment = false;

    for line in lines {
        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            let secs = rest.split(',').next().unwrap_or("0").trim();
            playlist.duration_secs += secs.parse::<f64>().unwrap_or(0.0);
            expect_segment = true;
        } else if line.starts_with("#EXT-X-STREAM-INF") {
            expect_variant = true;
        } else if line.starts_with('#') {
            continue;
        } else if expect_variant {
            playlist.variants.push(line.to_string());
            expect_variant = false;
        } else if expect_segment {
            playlist.segments.push(line.to_string());
            expect_segment = false;
        }
    }

    Ok(playlist)
}

fn summarize(variants: usize, media: &Playlist, base: &Url) -> ManifestSummary {
    ManifestSummary {
        variants,
        segments: media.segments.len(),
        duration_secs: media.duration_secs,
        first_segment: media
            .segments
            .first()
            .and_then(|s| base.join(s).ok())
            .map(|u| u.to_string()),
    }
}
