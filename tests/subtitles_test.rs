//! Subtitle Normalization Tests
//!
//! Language code mapping, artifact filtering and default track choice.

use anistream::playback::subtitles::{normalize_tracks, UNDETERMINED};
use anistream::playback::LanguageTable;
use anistream::SubtitleTrack;
use std::collections::HashMap;

fn track(label: &str, is_default: bool) -> SubtitleTrack {
    SubtitleTrack {
        language_label: label.to_string(),
        url: format!("https://subs.example/{}.vtt", label.to_lowercase().replace(' ', "-")),
        is_default,
    }
}

#[test]
fn test_regional_variants() {
    let table = LanguageTable::default();
    assert_eq!(table.code_for("Portuguese (Brazil)"), "pt-BR");
    assert_eq!(table.code_for("Portuguese"), "pt");
    assert_eq!(table.code_for("Spanish (Latin America)"), "es-LA");
    assert_eq!(table.code_for("Spanish"), "es");
    // unknown region keeps the base language
    assert_eq!(table.code_for("French (Canada)"), "fr");
}

#[test]
fn test_thumbnails_excluded() {
    let tracks = vec![track("Thumbnails", false), track("English", false)];
    let out = normalize_tracks(&tracks, &LanguageTable::default());
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].language, "en");
    assert!(out[0].is_default);
}

#[test]
fn test_provider_default_is_honored() {
    let tracks = vec![
        track("English", false),
        track("Portuguese (Brazil)", true),
        track("Spanish", false),
    ];
    let out = normalize_tracks(&tracks, &LanguageTable::default());
    let defaults: Vec<&str> = out
        .iter()
        .filter(|t| t.is_default)
        .map(|t| t.language.as_str())
        .collect();
    assert_eq!(defaults, vec!["pt-BR"]);
}

#[test]
fn test_english_preferred_without_provider_default() {
    let tracks = vec![track("Spanish", false), track("English", false)];
    let out = normalize_tracks(&tracks, &LanguageTable::default());
    assert!(!out[0].is_default);
    assert!(out[1].is_default);
}

#[test]
fn test_unknown_language_kept_but_never_default() {
    let tracks = vec![track("Klingon", true), track("Italian", false)];
    let out = normalize_tracks(&tracks, &LanguageTable::default());
    assert_eq!(out[0].language, UNDETERMINED);
    assert_eq!(out[0].label, "Klingon");
    assert!(!out[0].is_default);
    assert!(out[1].is_default);
}

#[test]
fn test_only_unknown_tracks_have_no_default() {
    let tracks = vec![track("Klingon", false), track("Elvish", false)];
    let out = normalize_tracks(&tracks, &LanguageTable::default());
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|t| !t.is_default));
}

#[test]
fn test_injected_table() {
    let mut table = LanguageTable::empty();
    assert!(table.is_empty());
    let overrides: HashMap<String, String> =
        [("tagalog".to_string(), "tl".to_string())].into_iter().collect();
    table.extend(&overrides);
    table.insert("English", "en");

    assert_eq!(table.len(), 2);
    assert_eq!(table.code_for("Tagalog"), "tl");
    assert_eq!(table.code_for("Spanish"), UNDETERMINED);
}

#[test]
fn test_no_tracks() {
    assert!(normalize_tracks(&[], &LanguageTable::default()).is_empty());
}
