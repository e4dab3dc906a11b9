//! CORS relay rewriting
//!
//! Absolute http(s) URLs on hosts outside the allow-list are routed through a
//! relay endpoint that returns the same bytes with permissive CORS headers.
//! The relay's own host is always allow-listed, so rewriting is idempotent.

use serde::{Deserialize, Serialize};
use url::Url;

/// How the relay expects the target URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStyle {
    /// `https://relay.example/https://cdn.example/a.m3u8?x=1`
    #[default]
    Path,
    /// `https://relay.example/proxy?url=https%3A%2F%2Fcdn.example%2Fa.m3u8`
    Query,
}

/// URL rewriter for a configured relay
#[derive(Debug, Clone)]
pub struct UrlProxy {
    endpoint: String,
    style: ProxyStyle,
    param: String,
    relay_host: Option<String>,
    allowed_hosts: Vec<String>,
}

impl UrlProxy {
    /// Create a path-style relay with an empty allow-list
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let relay_host = Url::parse(&endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase));

        Self {
            endpoint,
            style: ProxyStyle::Path,
            param: "url".to_string(),
            relay_host,
            allowed_hosts: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: ProxyStyle) -> Self {
        self.style = style;
        self
    }

    /// Query parameter name used by [`ProxyStyle::Query`]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    /// Hosts (and their subdomains) that never need the relay
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_hosts.extend(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|h| !h.is_empty()),
        );
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True when the URL is already relayed or lives on a safe host
    ///
    /// Hosts are compared after parsing; relayed URLs sit on the relay's own
    /// host, so no string prefix test is needed.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
        else {
            return false;
        };

        self.relay_host.as_deref() == Some(host.as_str())
            || self
                .allowed_hosts
                .iter()
                .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// Whether the rewrite rule applies to this URL
    pub fn needs_proxy(&self, url: &str) -> bool {
        let absolute = Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        absolute && !self.is_allowed(url)
    }

    /// Rewrite the URL through the relay, or return it unchanged
    pub fn rewrite(&self, url: &str) -> String {
        if !self.needs_proxy(url) {
            return url.to_string();
        }

        match self.style {
            ProxyStyle::Path => {
                format!("{}/{}", self.endpoint.trim_end_matches('/'), url)
            }
            ProxyStyle::Query => {
                let sep = if self.endpoint.contains('?') { '&' } else { '?' };
                format!(
                    "{}{}{}={}",
                    self.endpoint,
                    sep,
                    self.param,
                    urlencoding::encode(url)
                )
            }
        }
    }
}

/// Apply an optional relay; no relay means pass-through
pub fn proxied(proxy: Option<&UrlProxy>, url: &str) -> String {
    match proxy {
        Some(p) => p.rewrite(url),
        None => url.to_string(),
    }
}
