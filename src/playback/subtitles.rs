//! Subtitle track normalization
//!
//! Provider labels are free text ("English", "Español", "Portuguese (Brazil)").
//! A [`LanguageTable`] maps them to short codes for the player's track menu,
//! thumbnail tracks are removed, and one default track is picked.

use std::collections::HashMap;

use regex::Regex;

use crate::models::{PlayerTrack, SubtitleTrack};

/// Code used for labels the table does not recognize
pub const UNDETERMINED: &str = "und";

const DEFAULT_LANGUAGES: &[(&str, &str)] = &[
    ("english", "en"),
    ("inglés", "en"),
    ("ingles", "en"),
    ("spanish", "es"),
    ("español", "es"),
    ("espanol", "es"),
    ("castellano", "es"),
    ("portuguese", "pt"),
    ("português", "pt"),
    ("portugues", "pt"),
    ("french", "fr"),
    ("français", "fr"),
    ("francais", "fr"),
    ("german", "de"),
    ("deutsch", "de"),
    ("italian", "it"),
    ("italiano", "it"),
    ("russian", "ru"),
    ("русский", "ru"),
    ("japanese", "ja"),
    ("日本語", "ja"),
    ("korean", "ko"),
    ("한국어", "ko"),
    ("chinese", "zh"),
    ("中文", "zh"),
    ("arabic", "ar"),
    ("العربية", "ar"),
    ("indonesian", "id"),
    ("bahasa indonesia", "id"),
    ("thai", "th"),
    ("ไทย", "th"),
    ("vietnamese", "vi"),
    ("tiếng việt", "vi"),
    ("turkish", "tr"),
    ("türkçe", "tr"),
    ("polish", "pl"),
    ("polski", "pl"),
    ("dutch", "nl"),
    ("nederlands", "nl"),
    ("hindi", "hi"),
    ("हिन्दी", "hi"),
];

/// (base code, region hint, refined code)
const DEFAULT_REGIONS: &[(&str, &str, &str)] = &[
    ("pt", "brazil", "pt-BR"),
    ("pt", "brasil", "pt-BR"),
    ("pt", "br", "pt-BR"),
    ("es", "la", "es-LA"),
    ("es", "latin america", "es-LA"),
    ("es", "latinoamérica", "es-LA"),
    ("es", "latino", "es-LA"),
];

/// Injectable label-to-code mapping
#[derive(Debug, Clone)]
pub struct LanguageTable {
    names: HashMap<String, String>,
    regions: Vec<(String, String, String)>,
    parenthetical: Option<Regex>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (name, code) in DEFAULT_LANGUAGES {
            table.insert(name, code);
        }
        for (base, hint, refined) in DEFAULT_REGIONS {
            table.insert_region(base, hint, refined);
        }
        table
    }
}

impl LanguageTable {
    /// Table with no entries at all
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
            regions: Vec::new(),
            parenthetical: Regex::new(r"\(([^)]*)\)").ok(),
        }
    }

    /// Add or replace a language name
    pub fn insert(&mut self, name: &str, code: &str) {
        self.names
            .insert(name.trim().to_lowercase(), code.trim().to_string());
    }

    /// Add a region refinement, e.g. `("pt", "brazil", "pt-BR")`
    pub fn insert_region(&mut self, base: &str, hint: &str, refined: &str) {
        self.regions.push((
            base.trim().to_lowercase(),
            hint.trim().to_lowercase(),
            refined.trim().to_string(),
        ));
    }

    /// Merge overrides, typically from the config file
    pub fn extend<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, code) in entries {
            self.insert(name, code);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a free-text label to a code, or [`UNDETERMINED`]
    pub fn code_for(&self, label: &str) -> String {
        let lowered = label.to_lowercase();
        let (base_name, hints): (String, Vec<String>) = match &self.parenthetical {
            Some(re) => (
                re.replace_all(&lowered, "").into_owned(),
                re.captures_iter(&lowered)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .collect(),
            ),
            None => (lowered.clone(), Vec::new()),
        };
        let base_name = base_name.trim();

        let Some(code) = self.lookup(base_name) else {
            return UNDETERMINED.to_string();
        };

        // "Spanish (CC) (LA)": the first hint with a rule wins
        hints
            .iter()
            .find_map(|hint| {
                self.regions
                    .iter()
                    .find(|(base, h, _)| base.eq_ignore_ascii_case(code) && h == hint)
                    .map(|(_, _, refined)| refined.clone())
            })
            .unwrap_or_else(|| code.to_string())
    }

    /// Exact name first, then the leading word ("English - CC" -> "english")
    fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(code) = self.names.get(name) {
            return Some(code);
        }
        let first = name
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())?;
        self.names.get(first).map(String::as_str)
    }
}

/// Whether a track is a non-language artifact such as a thumbnail sprite track
pub fn is_non_language(label: &str) -> bool {
    label.to_lowercase().contains("thumbnails")
}

pub fn is_determined(code: &str) -> bool {
    code != UNDETERMINED
}

/// Filter, tag and pick the default track
///
/// Unrecognized languages are kept with the [`UNDETERMINED`] code so they stay
/// reachable by label, but they are never chosen as the default.
pub fn normalize_tracks(tracks: &[SubtitleTrack], table: &LanguageTable) -> Vec<PlayerTrack> {
    let mut normalized: Vec<PlayerTrack> = tracks
        .iter()
        .filter(|t| !is_non_language(&t.language_label))
        .map(|t| PlayerTrack {
            label: t.language_label.trim().to_string(),
            url: t.url.clone(),
            language: table.code_for(&t.language_label),
            is_default: false,
        })
        .collect();

    let provider_default = tracks
        .iter()
        .filter(|t| !is_non_language(&t.language_label))
        .position(|t| t.is_default)
        .filter(|&i| is_determined(&normalized[i].language));

    let chosen = provider_default
        .or_else(|| normalized.iter().position(|t| t.language == "en"))
        .or_else(|| normalized.iter().position(|t| is_determined(&t.language)));

    if let Some(i) = chosen {
        normalized[i].is_default = true;
    }

    normalized
}
