//! Header reconciliation for segmented streams
//!
//! Providers often require extra headers on manifest and segment fetches.
//! The player's segment engine exposes a per-request hook; here that hook is
//! the [`RequestInterceptor`] trait, and [`HeaderInjector`] is the
//! implementation built from a provider's header map.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::models::{StreamingHeaders, StreamingSource};

/// Header names a browser refuses to let scripts set cross-origin
pub const FORBIDDEN_HEADERS: &[&str] = &["referer", "user-agent"];

/// Per-request hook invoked before every manifest/segment fetch
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, url: &str, headers: &mut HeaderMap);
}

/// Injects a fixed header set into every intercepted request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderInjector {
    headers: HeaderMap,
}

impl HeaderInjector {
    /// Build the injector for a freshly selected source
    ///
    /// Returns `None` when the source is progressive or when no header
    /// survives filtering.
    pub fn for_source(source: &StreamingSource, headers: &StreamingHeaders) -> Option<Self> {
        if !source.is_segmented {
            return None;
        }
        let injector = Self::from_headers(headers);
        (!injector.is_empty()).then_some(injector)
    }

    /// Keep every header that is settable and well formed, drop the rest
    pub fn from_headers(headers: &StreamingHeaders) -> Self {
        let mut map = HeaderMap::new();

        for (name, value) in headers {
            if is_forbidden(name) {
                debug!(header = %name, "dropping browser-forbidden header");
                continue;
            }

            let parsed = HeaderName::from_bytes(name.trim().as_bytes())
                .ok()
                .zip(HeaderValue::from_str(value.trim()).ok());

            match parsed {
                Some((n, v)) => {
                    map.insert(n, v);
                }
                None => warn!(header = %name, "dropping malformed stream header"),
            }
        }

        Self { headers: map }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header pairs as plain strings, for handing to external players
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.as_str().to_string(), v.to_string())))
            .collect()
    }
}

impl RequestInterceptor for HeaderInjector {
    fn intercept(&self, _url: &str, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Case-insensitive check against [`FORBIDDEN_HEADERS`]
pub fn is_forbidden(name: &str) -> bool {
    let name = name.trim();
    FORBIDDEN_HEADERS
        .iter()
        .any(|forbidden| name.eq_ignore_ascii_case(forbidden))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hls() -> StreamingSource {
        StreamingSource {
            url: "https://cdn.example/master.m3u8".into(),
            quality: Some("auto".into()),
            is_segmented: true,
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> StreamingHeaders {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_forbidden_headers_dropped_any_case() {
        let injector = HeaderInjector::from_headers(&headers(&[
            ("Referer", "https://provider.to/"),
            ("USER-AGENT", "Mozilla/5.0"),
            ("user-agent", "curl"),
            ("X-Token", "abc"),
        ]));
        assert_eq!(injector.headers().len(), 1);
        assert_eq!(injector.headers().get("x-token").unwrap(), "abc");
        assert!(injector.headers().get("referer").is_none());
    }

    #[test]
    fn test_malformed_header_dropped() {
        let injector =
            HeaderInjector::from_headers(&headers(&[("Bad Header", "x"), ("Origin", "https://a.b")]));
        assert_eq!(injector.pairs(), vec![("origin".to_string(), "https://a.b".to_string())]);
    }

    #[test]
    fn test_only_segmented_sources_get_injector() {
        let h = headers(&[("Origin", "https://provider.to")]);
        assert!(HeaderInjector::for_source(&hls(), &h).is_some());

        let mp4 = StreamingSource {
            is_segmented: false,
            ..hls()
        };
        assert!(HeaderInjector::for_source(&mp4, &h).is_none());
    }

    #[test]
    fn test_only_forbidden_headers_clears_injector() {
        let h = headers(&[("Referer", "https://provider.to/")]);
        assert!(HeaderInjector::for_source(&hls(), &h).is_none());
        assert!(HeaderInjector::for_source(&hls(), &StreamingHeaders::new()).is_none());
    }

    #[test]
    fn test_intercept_overrides_existing() {
        let injector = HeaderInjector::from_headers(&headers(&[("Origin", "https://provider.to")]));
        let mut map = HeaderMap::new();
        map.insert("origin", HeaderValue::from_static("https://other"));
        injector.intercept("https://cdn.example/seg1.ts", &mut map);
        assert_eq!(map.get("origin").unwrap(), "https://provider.to");
    }
}
