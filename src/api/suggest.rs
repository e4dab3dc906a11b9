//! Generative "similar anime" suggestions
//!
//! The endpoint hosts the prompt; this client only sends a title and cleans
//! up the list that comes back.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Upper bound on returned suggestions
pub const MAX_SUGGESTIONS: usize = 5;

/// Suggestion endpoint error types
#[derive(Error, Debug)]
pub enum SuggestionError {
    #[error("No suggestion endpoint configured")]
    NotConfigured,

    #[error("Title is empty")]
    EmptyTitle,

    #[error("Suggestion endpoint returned HTTP {0}")]
    Http(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    title: &'a str,
    count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuggestResponse {
    List(Vec<String>),
    Wrapped { suggestions: Vec<String> },
}

/// Client for the hosted suggestion prompt
pub struct SuggestionClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl SuggestionClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Ask for up to [`MAX_SUGGESTIONS`] titles similar to `title`
    pub async fn suggest(&self, title: &str) -> Result<Vec<String>, SuggestionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SuggestionError::EmptyTitle);
        }
        if self.endpoint.is_empty() {
            return Err(SuggestionError::NotConfigured);
        }

        let mut request = self.client.post(&self.endpoint).json(&SuggestRequest {
            title,
            count: MAX_SUGGESTIONS,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(title, endpoint = %self.endpoint, "requesting suggestions");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SuggestionError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: SuggestResponse = serde_json::from_str(&body)
            .map_err(|e| SuggestionError::InvalidResponse(e.to_string()))?;
        let raw = match parsed {
            SuggestResponse::List(list) => list,
            SuggestResponse::Wrapped { suggestions } => suggestions,
        };

        Ok(clean_suggestions(title, raw))
    }
}

/// Trim list markers and quotes, drop blanks, repeats and the query itself
pub fn clean_suggestions(query: &str, raw: Vec<String>) -> Vec<String> {
    let marker = regex::Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s*").ok();
    let mut out: Vec<String> = Vec::new();
    for item in raw {
        let unmarked = match &marker {
            Some(re) => re.replace(&item, "").into_owned(),
            None => item,
        };
        let cleaned = unmarked.trim().trim_matches('"').trim().to_string();

        if cleaned.is_empty()
            || cleaned.eq_ignore_ascii_case(query)
            || out.iter().any(|o| o.eq_ignore_ascii_case(&cleaned))
        {
            continue;
        }
        out.push(cleaned);
        if out.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_suggestions() {
        let raw = vec![
            "1. Mushishi".to_string(),
            "2) \"Natsume's Book of Friends\"".to_string(),
            "".to_string(),
            "mushishi".to_string(),
            "Frieren".to_string(),
            "- Aria the Animation".to_string(),
        ];
        let out = clean_suggestions("Frieren", raw);
        assert_eq!(
            out,
            vec!["Mushishi", "Natsume's Book of Friends", "Aria the Animation"]
        );
    }

    #[test]
    fn test_capped_at_five() {
        let raw = (0..10).map(|i| format!("Title {}", i)).collect();
        assert_eq!(clean_suggestions("x", raw).len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_titles_starting_with_digits_kept() {
        let out = clean_suggestions(
            "x",
            vec!["86 Eighty-Six".to_string(), "3. 86 Eighty-Six".to_string()],
        );
        assert_eq!(out, vec!["86 Eighty-Six"]);
    }
}
