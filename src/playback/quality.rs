//! Quality selection policy
//!
//! Picks one source out of the provider's ordered list. First match wins:
//! a "default" label, then any label containing "auto", then the first
//! source. An explicit user choice overrides the policy.

use crate::models::StreamingSource;

/// Index of the source the policy picks, or `None` for an empty list
pub fn select_source(sources: &[StreamingSource]) -> Option<usize> {
    if sources.is_empty() {
        return None;
    }

    let label = |s: &StreamingSource| s.quality.as_deref().map(|q| q.trim().to_lowercase());

    sources
        .iter()
        .position(|s| label(s).as_deref() == Some("default"))
        .or_else(|| {
            sources
                .iter()
                .position(|s| label(s).is_some_and(|l| l.contains("auto")))
        })
        .or(Some(0))
}

/// Index of the source matching an explicit quality choice
pub fn find_quality(sources: &[StreamingSource], quality: &str) -> Option<usize> {
    let wanted = quality.trim();
    sources.iter().position(|s| {
        s.quality
            .as_deref()
            .is_some_and(|q| q.trim().eq_ignore_ascii_case(wanted))
    })
}

/// Apply the explicit choice when present, the policy otherwise
pub fn select_with_override(
    sources: &[StreamingSource],
    explicit: Option<&str>,
) -> Option<usize> {
    explicit
        .and_then(|q| find_quality(sources, q))
        .or_else(|| select_source(sources))
}
