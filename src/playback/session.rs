//! Playback session state machine
//!
//! `Idle -> Loading -> {Ready, NoSources, TransportError}`. Every network
//! resolution is keyed by a [`ResolutionTicket`]; a response whose ticket is
//! not the latest one issued is dropped, so a slow answer from a server the
//! user already switched away from never overwrites the current state.
//! Quality changes reselect among the fetched sources without a request.

use serde::Serialize;
use tracing::{info, warn};

use super::headers::HeaderInjector;
use super::proxy::{self, UrlProxy};
use super::quality;
use super::server::ServerName;
use super::subtitles::{self, LanguageTable};
use super::PlaybackError;
use crate::api::{ProviderError, SourceProvider};
use crate::models::{EpisodeReference, ResolvedPlayback, SourceResponse};

/// Key of one in-flight resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTicket {
    generation: u64,
    pub episode: EpisodeReference,
    pub server: ServerName,
}

/// What the player view shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading {
        episode: EpisodeReference,
        server: ServerName,
    },
    Ready {
        playback: Box<ResolvedPlayback>,
    },
    /// Valid answer, nothing to play; pick another server
    NoSources {
        episode: EpisodeReference,
        server: ServerName,
    },
    /// Request failed; retry by re-selecting a server
    TransportError {
        episode: EpisodeReference,
        server: ServerName,
        message: String,
    },
}

impl PlaybackState {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading { .. } => "loading",
            PlaybackState::Ready { .. } => "ready",
            PlaybackState::NoSources { .. } => "no_sources",
            PlaybackState::TransportError { .. } => "transport_error",
        }
    }
}

/// One player view's worth of resolution state
pub struct PlaybackSession {
    languages: LanguageTable,
    proxy: Option<UrlProxy>,
    generation: u64,
    latest: Option<ResolutionTicket>,
    state: PlaybackState,
    response: Option<SourceResponse>,
    quality_override: Option<String>,
    interceptor: Option<HeaderInjector>,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(LanguageTable::default(), None)
    }
}

impl PlaybackSession {
    pub fn new(languages: LanguageTable, proxy: Option<UrlProxy>) -> Self {
        Self {
            languages,
            proxy,
            generation: 0,
            latest: None,
            state: PlaybackState::Idle,
            response: None,
            quality_override: None,
            interceptor: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn playback(&self) -> Option<&ResolvedPlayback> {
        match &self.state {
            PlaybackState::Ready { playback } => Some(&**playback),
            _ => None,
        }
    }

    /// Header hook for the segment engine, present only for segmented sources
    pub fn interceptor(&self) -> Option<&HeaderInjector> {
        self.interceptor.as_ref()
    }

    /// Start a resolution; invalidates everything derived from the last one
    ///
    /// An empty episode id leaves the session idle and returns `None`.
    pub fn begin(
        &mut self,
        episode: &EpisodeReference,
        server: &ServerName,
    ) -> Option<ResolutionTicket> {
        self.response = None;
        self.quality_override = None;
        self.interceptor = None;

        if !episode.is_resolvable() {
            self.latest = None;
            self.state = PlaybackState::Idle;
            return None;
        }

        self.generation += 1;
        let ticket = ResolutionTicket {
            generation: self.generation,
            episode: episode.clone(),
            server: server.clone(),
        };
        self.latest = Some(ticket.clone());
        self.state = PlaybackState::Loading {
            episode: episode.clone(),
            server: server.clone(),
        };
        info!(episode = %episode, %server, "resolving sources");
        Some(ticket)
    }

    /// Apply a provider answer; returns false when the ticket is stale
    pub fn complete(
        &mut self,
        ticket: &ResolutionTicket,
        result: Result<SourceResponse, ProviderError>,
    ) -> bool {
        if self.latest.as_ref() != Some(ticket) {
            warn!(
                episode = %ticket.episode,
                server = %ticket.server,
                "discarding stale resolution"
            );
            return false;
        }

        match result {
            Ok(response) if response.has_sources() => {
                self.response = Some(response);
                self.rebuild();
            }
            Ok(_) => {
                info!(server = %ticket.server, "server returned no sources");
                self.state = PlaybackState::NoSources {
                    episode: ticket.episode.clone(),
                    server: ticket.server.clone(),
                };
            }
            Err(e) => {
                warn!(server = %ticket.server, error = %e, "resolution failed");
                self.state = PlaybackState::TransportError {
                    episode: ticket.episode.clone(),
                    server: ticket.server.clone(),
                    message: transport_message(&ticket.server, &e),
                };
            }
        }
        true
    }

    /// Fetch and apply in one step
    pub async fn resolve<P>(
        &mut self,
        provider: &P,
        episode: &EpisodeReference,
        server: &ServerName,
    ) -> &PlaybackState
    where
        P: SourceProvider + ?Sized,
    {
        if let Some(ticket) = self.begin(episode, server) {
            let result = provider.sources(&ticket.episode.episode_id, &ticket.server).await;
            self.complete(&ticket, result);
        }
        &self.state
    }

    /// Switch to an explicit quality among the already-fetched sources
    pub fn select_quality(&mut self, label: &str) -> Result<&ResolvedPlayback, PlaybackError> {
        let response = self.response.as_ref().ok_or(PlaybackError::NotReady)?;
        if quality::find_quality(&response.sources, label).is_none() {
            return Err(PlaybackError::QualityUnavailable {
                requested: label.to_string(),
                available: response.quality_labels().join(", "),
            });
        }

        self.quality_override = Some(label.to_string());
        self.rebuild();
        self.playback().ok_or(PlaybackError::NotReady)
    }

    /// Tear down when the view goes away
    pub fn reset(&mut self) {
        self.latest = None;
        self.response = None;
        self.quality_override = None;
        self.interceptor = None;
        self.state = PlaybackState::Idle;
    }

    /// Recompute the resolved playback from the stored response
    fn rebuild(&mut self) {
        let (Some(response), Some(ticket)) = (&self.response, &self.latest) else {
            return;
        };
        let Some(index) =
            quality::select_with_override(&response.sources, self.quality_override.as_deref())
        else {
            return;
        };

        let chosen = &response.sources[index];
        self.interceptor = HeaderInjector::for_source(chosen, &response.headers);

        let mut source = chosen.clone();
        source.url = proxy::proxied(self.proxy.as_ref(), &chosen.url);

        let playback = ResolvedPlayback {
            episode: ticket.episode.clone(),
            server: ticket.server.to_string(),
            media_type: source.media_type().to_string(),
            source,
            headers: response.headers.clone(),
            subtitles: subtitles::normalize_tracks(&response.subtitles, &self.languages),
            available_qualities: response.quality_labels(),
        };

        info!(
            server = %playback.server,
            quality = playback.source.quality_label(),
            "playback ready"
        );
        self.state = PlaybackState::Ready {
            playback: Box::new(playback),
        };
    }
}

/// User-facing text for a failed resolution, always naming the server
fn transport_message(server: &ServerName, error: &ProviderError) -> String {
    match error {
        ProviderError::InvalidResponse(_) | ProviderError::InvalidArgument(_) => {
            format!("Server '{}' could not be loaded. Try again or pick another server.", server)
        }
        other => format!("Server '{}' failed: {}", server, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamingSource, SubtitleTrack};
    use crate::playback::ServerCatalog;

    fn server(name: &str) -> ServerName {
        ServerCatalog::new(["vidcloud", "streamsb"]).parse(name).unwrap()
    }

    fn episode() -> EpisodeReference {
        EpisodeReference::new("frieren$episode$1", "frieren", 1)
    }

    fn response(qualities: &[&str]) -> SourceResponse {
        SourceResponse {
            sources: qualities
                .iter()
                .map(|q| StreamingSource {
                    url: format!("https://cdn.example/{}.m3u8", q),
                    quality: Some(q.to_string()),
                    is_segmented: true,
                })
                .collect(),
            headers: [("Origin".to_string(), "https://provider.to".to_string())]
                .into_iter()
                .collect(),
            subtitles: vec![SubtitleTrack {
                language_label: "English".into(),
                url: "https://subs.example/en.vtt".into(),
                is_default: false,
            }],
        }
    }

    #[test]
    fn test_empty_episode_stays_idle() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&EpisodeReference::from_episode_id(""), &server("vidcloud"));
        assert!(ticket.is_none());
        assert_eq!(session.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_ready_after_sources() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&episode(), &server("vidcloud")).unwrap();
        assert_eq!(session.state().name(), "loading");

        assert!(session.complete(&ticket, Ok(response(&["1080p", "auto", "480p"]))));
        let playback = session.playback().unwrap();
        assert_eq!(playback.source.quality.as_deref(), Some("auto"));
        assert_eq!(playback.subtitles[0].language, "en");
        assert!(playback.subtitles[0].is_default);
        assert!(session.interceptor().is_some());
    }

    #[test]
    fn test_zero_sources_is_no_sources() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&episode(), &server("vidcloud")).unwrap();
        session.complete(&ticket, Ok(SourceResponse::default()));
        assert!(matches!(session.state(), PlaybackState::NoSources { .. }));
    }

    #[test]
    fn test_transport_error_names_server() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&episode(), &server("streamsb")).unwrap();
        session.complete(&ticket, Err(ProviderError::ServerError(502)));
        match session.state() {
            PlaybackState::TransportError { message, .. } => assert!(message.contains("streamsb")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_response_gets_generic_message() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&episode(), &server("vidcloud")).unwrap();
        session.complete(
            &ticket,
            Err(ProviderError::InvalidResponse("expected value at line 1".into())),
        );
        match session.state() {
            PlaybackState::TransportError { message, .. } => {
                assert!(message.contains("vidcloud"));
                assert!(!message.contains("line 1"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut session = PlaybackSession::default();
        let first = session.begin(&episode(), &server("vidcloud")).unwrap();
        let second = session.begin(&episode(), &server("streamsb")).unwrap();

        assert!(session.complete(&second, Ok(response(&["720p"]))));
        assert!(!session.complete(&first, Ok(response(&["1080p"]))));

        let playback = session.playback().unwrap();
        assert_eq!(playback.server, "streamsb");
        assert_eq!(playback.source.quality.as_deref(), Some("720p"));
    }

    #[test]
    fn test_same_pair_reissued_only_latest_wins() {
        let mut session = PlaybackSession::default();
        let first = session.begin(&episode(), &server("vidcloud")).unwrap();
        let second = session.begin(&episode(), &server("vidcloud")).unwrap();
        assert_ne!(first, second);
        assert!(!session.complete(&first, Err(ProviderError::ServerError(500))));
        assert_eq!(session.state().name(), "loading");
        assert!(session.complete(&second, Ok(response(&["720p"]))));
    }

    #[test]
    fn test_quality_switch_reselects_without_refetch() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&episode(), &server("vidcloud")).unwrap();
        session.complete(&ticket, Ok(response(&["1080p", "auto"])));

        let playback = session.select_quality("1080P").unwrap();
        assert_eq!(playback.source.quality.as_deref(), Some("1080p"));

        let err = session.select_quality("4k").unwrap_err();
        assert!(matches!(err, PlaybackError::QualityUnavailable { .. }));
        // failed switch keeps the previous choice
        assert_eq!(
            session.playback().unwrap().source.quality.as_deref(),
            Some("1080p")
        );
    }

    #[test]
    fn test_server_switch_drops_override_and_headers() {
        let mut session = PlaybackSession::default();
        let ticket = session.begin(&episode(), &server("vidcloud")).unwrap();
        session.complete(&ticket, Ok(response(&["1080p", "auto"])));
        session.select_quality("1080p").unwrap();

        let ticket = session.begin(&episode(), &server("streamsb")).unwrap();
        assert!(session.interceptor().is_none());
        assert!(session.playback().is_none());

        let mut progressive = response(&["1080p", "auto"]);
        for s in &mut progressive.sources {
            s.is_segmented = false;
        }
        session.complete(&ticket, Ok(progressive));
        let playback = session.playback().unwrap();
        assert_eq!(playback.source.quality.as_deref(), Some("auto"));
        assert!(session.interceptor().is_none());
    }

    #[test]
    fn test_select_quality_before_ready() {
        let mut session = PlaybackSession::default();
        assert_eq!(session.select_quality("720p").unwrap_err(), PlaybackError::NotReady);
    }

    #[test]
    fn test_proxy_applied_to_selected_source() {
        let proxy = UrlProxy::new("https://relay.example");
        let mut session = PlaybackSession::new(LanguageTable::default(), Some(proxy));
        let ticket = session.begin(&episode(), &server("vidcloud")).unwrap();
        session.complete(&ticket, Ok(response(&["auto"])));
        assert_eq!(
            session.playback().unwrap().source.url,
            "https://relay.example/https://cdn.example/auto.m3u8"
        );
    }
}
