//! Data structures and types for anistream
//!
//! Shared models organized by domain:
//! - **Catalogue**: search results, anime details, episodes, pagination
//! - **Playback**: episode references, streaming sources, subtitles
//! - **Comments**: episode comments and the user context that authors them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Catalogue Models
// =============================================================================

/// One page of a paginated provider listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub current_page: u32,
    pub has_next_page: bool,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Anime entry as returned by search and catalogue listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeSummary {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    /// TV, Movie, OVA, ONA, Special
    pub kind: Option<String>,
    pub release_date: Option<String>,
    /// Latest/target episode for "recent episodes" listings
    pub episode_number: Option<u32>,
    pub episode_id: Option<String>,
}

impl fmt::Display for AnimeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(kind) = &self.kind {
            write!(f, " [{}]", kind)?;
        }
        if let Some(ep) = self.episode_number {
            write!(f, " - Ep {}", ep)?;
        }
        Ok(())
    }
}

/// Detailed anime information with its episode list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub total_episodes: u32,
    pub episodes: Vec<EpisodeInfo>,
}

impl AnimeDetail {
    /// Build a playback reference for the given episode number
    pub fn episode_reference(&self, number: u32) -> Option<EpisodeReference> {
        self.episodes
            .iter()
            .find(|e| e.number == number)
            .map(|e| EpisodeReference::new(e.id.clone(), self.id.clone(), e.number))
    }
}

impl fmt::Display for AnimeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} episodes)", self.title, self.total_episodes)
    }
}

/// Episode entry of an anime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub id: String,
    pub number: u32,
    pub title: Option<String>,
    pub is_filler: bool,
}

impl fmt::Display for EpisodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "Ep {:03} - {}", self.number, title),
            None => write!(f, "Ep {:03}", self.number),
        }
    }
}

// =============================================================================
// Playback Models
// =============================================================================

/// Identifies the media to resolve
///
/// Treated as immutable once playback starts: a different reference means a
/// new resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeReference {
    pub episode_id: String,
    pub anime_id: String,
    pub episode_number: u32,
}

impl EpisodeReference {
    pub fn new(
        episode_id: impl Into<String>,
        anime_id: impl Into<String>,
        episode_number: u32,
    ) -> Self {
        Self {
            episode_id: episode_id.into(),
            anime_id: anime_id.into(),
            episode_number,
        }
    }

    /// Reference known only by its provider episode id
    pub fn from_episode_id(episode_id: impl Into<String>) -> Self {
        Self::new(episode_id, String::new(), 0)
    }

    pub fn is_resolvable(&self) -> bool {
        !self.episode_id.trim().is_empty()
    }
}

impl fmt::Display for EpisodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.episode_number > 0 {
            write!(f, "{} #{}", self.episode_id, self.episode_number)
        } else {
            write!(f, "{}", self.episode_id)
        }
    }
}

/// Candidate stream returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingSource {
    pub url: String,
    /// Provider label such as "720p", "default" or "auto"
    pub quality: Option<String>,
    /// True for playlist-based streams (HLS) rather than a progressive file
    pub is_segmented: bool,
}

impl StreamingSource {
    /// MIME type a player expects for this source
    pub fn media_type(&self) -> &'static str {
        if self.is_segmented {
            "application/x-mpegURL"
        } else {
            "video/mp4"
        }
    }

    pub fn quality_label(&self) -> &str {
        self.quality.as_deref().unwrap_or("unknown")
    }
}

/// Headers the provider requires for manifest/segment fetches
pub type StreamingHeaders = BTreeMap<String, String>;

/// Subtitle track exactly as the provider supplied it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub language_label: String,
    pub url: String,
    pub is_default: bool,
}

/// Raw resolution response: everything one server returned for one episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    pub sources: Vec<StreamingSource>,
    pub headers: StreamingHeaders,
    pub subtitles: Vec<SubtitleTrack>,
}

impl SourceResponse {
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Distinct quality labels in provider order
    pub fn quality_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for source in &self.sources {
            if let Some(q) = &source.quality {
                if !labels.iter().any(|l| l.eq_ignore_ascii_case(q)) {
                    labels.push(q.clone());
                }
            }
        }
        labels
    }
}

/// Subtitle track after language normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTrack {
    /// Provider label, kept for display
    pub label: String,
    pub url: String,
    /// BCP 47-ish short code, or "und" when unrecognized
    pub language: String,
    pub is_default: bool,
}

/// The only value a video player consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlayback {
    pub episode: EpisodeReference,
    pub server: String,
    /// Selected source; its URL has been passed through the proxy rule
    pub source: StreamingSource,
    pub media_type: String,
    pub headers: StreamingHeaders,
    pub subtitles: Vec<PlayerTrack>,
    pub available_qualities: Vec<String>,
}

impl ResolvedPlayback {
    pub fn default_subtitle(&self) -> Option<&PlayerTrack> {
        self.subtitles.iter().find(|t| t.is_default)
    }
}

// =============================================================================
// Comment Models
// =============================================================================

/// Identity of the user acting in a request
///
/// Passed explicitly into every flow that needs attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl UserContext {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

/// Comment submission before it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub episode_id: String,
    pub text: String,
    pub is_spoiler: bool,
    pub parent_id: Option<String>,
}

impl NewComment {
    pub fn top_level(episode_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            text: text.into(),
            is_spoiler: false,
            parent_id: None,
        }
    }

    pub fn reply(
        episode_id: impl Into<String>,
        parent_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            episode_id: episode_id.into(),
            text: text.into(),
            is_spoiler: false,
            parent_id: Some(parent_id.into()),
        }
    }

    pub fn spoiler(mut self, is_spoiler: bool) -> Self {
        self.is_spoiler = is_spoiler;
        self
    }
}

/// Stored episode comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub episode_id: String,
    pub text: String,
    pub is_spoiler: bool,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub parent_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if self.is_spoiler {
            "[spoiler hidden]"
        } else {
            self.text.as_str()
        };
        write!(
            f,
            "{} ({}): {}",
            self.author_name,
            self.created_at.format("%Y-%m-%d %H:%M"),
            text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(quality: Option<&str>) -> StreamingSource {
        StreamingSource {
            url: "https://cdn.example/v.m3u8".into(),
            quality: quality.map(String::from),
            is_segmented: true,
        }
    }

    #[test]
    fn test_quality_labels_dedup_case_insensitive() {
        let response = SourceResponse {
            sources: vec![
                source(Some("720p")),
                source(Some("auto")),
                source(None),
                source(Some("AUTO")),
            ],
            ..Default::default()
        };
        assert_eq!(response.quality_labels(), vec!["720p", "auto"]);
    }

    #[test]
    fn test_media_type() {
        assert_eq!(source(None).media_type(), "application/x-mpegURL");
        let mp4 = StreamingSource {
            is_segmented: false,
            ..source(None)
        };
        assert_eq!(mp4.media_type(), "video/mp4");
    }

    #[test]
    fn test_episode_reference_resolvable() {
        assert!(EpisodeReference::from_episode_id("one-piece$episode$1").is_resolvable());
        assert!(!EpisodeReference::from_episode_id("  ").is_resolvable());
    }

    #[test]
    fn test_episode_reference_lookup() {
        let detail = AnimeDetail {
            id: "frieren".into(),
            title: "Frieren".into(),
            description: String::new(),
            image: None,
            kind: None,
            status: None,
            genres: vec![],
            total_episodes: 2,
            episodes: vec![
                EpisodeInfo {
                    id: "frieren$ep$1".into(),
                    number: 1,
                    title: None,
                    is_filler: false,
                },
                EpisodeInfo {
                    id: "frieren$ep$2".into(),
                    number: 2,
                    title: None,
                    is_filler: false,
                },
            ],
        };
        let reference = detail.episode_reference(2).unwrap();
        assert_eq!(reference.episode_id, "frieren$ep$2");
        assert_eq!(reference.anime_id, "frieren");
        assert!(detail.episode_reference(3).is_none());
    }

    #[test]
    fn test_spoiler_hidden_in_display() {
        let comment = Comment {
            id: "c1".into(),
            episode_id: "e1".into(),
            text: "he dies".into(),
            is_spoiler: true,
            author_id: "u1".into(),
            author_name: "Ayu".into(),
            author_avatar: None,
            parent_id: None,
            created_at: chrono::Utc::now(),
        };
        assert!(comment.to_string().contains("[spoiler hidden]"));
        assert!(!comment.to_string().contains("he dies"));
    }
}
