//! Integration tests for anistream
//!
//! Tests are organized by component:
//! - provider_test: Provider API client tests (catalogue, info, watch)
//! - playback_test: Source resolution, relay, headers, out-of-order answers
//! - subtitles_test: Subtitle language normalization
//! - segments_test: HLS manifest probing through the interceptor
//! - comments_test: Comment stores
//! - suggest_test: Suggestion client
//! - cli_test: CLI parsing and JSON output

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
