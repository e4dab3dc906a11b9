//! Playback source resolution
//!
//! - `quality`: source selection policy
//! - `proxy`: CORS relay rewriting
//! - `headers`: header injection for segmented streams
//! - `subtitles`: language normalization and default track choice
//! - `server`: validated provider server names
//! - `session`: the loading state machine tying it all together

pub mod headers;
pub mod proxy;
pub mod quality;
pub mod server;
pub mod session;
pub mod subtitles;

use thiserror::Error;

pub use headers::{HeaderInjector, RequestInterceptor};
pub use proxy::{ProxyStyle, UrlProxy};
pub use server::{ServerCatalog, ServerName};
pub use session::{PlaybackSession, PlaybackState, ResolutionTicket};
pub use subtitles::LanguageTable;

/// Errors from playback operations that are not resolution outcomes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Unknown server '{name}' (known: {known})")]
    UnknownServer { name: String, known: String },

    #[error("Episode id is empty")]
    EmptyEpisodeId,

    #[error("Quality '{requested}' not available (available: {available})")]
    QualityUnavailable { requested: String, available: String },

    #[error("No sources loaded yet")]
    NotReady,
}
