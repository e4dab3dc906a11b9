//! API clients for external services
//!
//! - Provider: anime catalogue, info and episode sources
//! - Suggest: generative "similar anime" endpoint

pub mod provider;
pub mod suggest;

pub use provider::{ProviderClient, ProviderError, SourceProvider};
pub use suggest::SuggestionClient;
