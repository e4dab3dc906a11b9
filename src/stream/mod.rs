//! Playback outputs
//!
//! - Player: mpv/VLC launching for resolved episodes
//! - Segments: HLS manifest fetching through the request interceptor

pub mod player;
pub mod segments;

pub use player::{LocalPlayer, PlayerError, PlayerType};
pub use segments::{FetchError, ManifestSummary, SegmentFetcher};
