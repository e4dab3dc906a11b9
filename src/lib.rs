//! anistream - anime discovery and episode playback
//!
//! Browses an anime streaming provider, resolves episodes into a playable
//! source with normalized subtitles, and hands the result to a local player.
//!
//! # Modules
//!
//! - `models` - Catalogue, playback and comment data structures
//! - `api` - Provider and suggestion clients
//! - `playback` - Source resolution: quality policy, relay, headers, subtitles
//! - `stream` - Local player and HLS manifest fetching
//! - `comments` - Comment store interface and implementations
//! - `cache` - Local response cache
//! - `cli` / `commands` - Command-line surface
//! - `config` - Config file and runtime wiring

pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod comments;
pub mod config;
pub mod models;
pub mod playback;
pub mod stream;

// Re-export commonly used types
pub use models::{
    AnimeDetail, AnimeSummary, Comment, EpisodeInfo, EpisodeReference, NewComment, Page,
    PlayerTrack, ResolvedPlayback, SourceResponse, StreamingHeaders, StreamingSource,
    SubtitleTrack, UserContext,
};

pub use api::{ProviderClient, ProviderError, SourceProvider, SuggestionClient};
pub use playback::{PlaybackSession, PlaybackState, ServerCatalog, ServerName};
