//! Configuration management for anistream
//!
//! Handles config file loading/saving and turns the settings into the
//! runtime pieces (server catalog, relay, language table, identity).
//! Config is stored at ~/.config/anistream/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::api::provider::DEFAULT_BASE_URL;
use crate::api::SuggestionClient;
use crate::cache::{LocalCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};
use crate::models::UserContext;
use crate::playback::{LanguageTable, ProxyStyle, ServerCatalog, ServerName, UrlProxy};

/// CORS relay settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Relay endpoint, e.g. "https://relay.example"
    pub endpoint: String,
    #[serde(default)]
    pub style: ProxyStyle,
    /// Query parameter name for the "query" style (default "url")
    pub param: Option<String>,
    /// Hosts that never need the relay (the provider's own CDN)
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
}

/// Generative suggestion endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

/// Identity used to attribute comments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Local response cache limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: Option<usize>,
    pub ttl_secs: Option<i64>,
    pub disabled: Option<bool>,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider API base URL
    pub provider_url: Option<String>,
    /// Server tried first when none is given
    pub default_server: Option<String>,
    /// Servers beyond the built-in list
    pub extra_servers: Option<Vec<String>>,
    /// Preferred local player (mpv, vlc)
    pub player: Option<String>,
    pub proxy: Option<ProxyConfig>,
    /// Extra subtitle label -> language code entries
    pub languages: Option<HashMap<String, String>>,
    pub suggest: Option<SuggestConfig>,
    pub identity: Option<IdentityConfig>,
    pub cache: Option<CacheConfig>,
}

impl Config {
    /// Get config file path (~/.config/anistream/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("anistream").join("config.toml"))
    }

    /// Load config from the default file, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load an explicitly named config file; errors are not swallowed
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Save config to the default file
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Provider base URL with fallback chain:
    /// 1. Environment variable ANISTREAM_API_URL
    /// 2. Config file
    /// 3. Public instance
    pub fn provider_url(&self) -> String {
        if let Ok(url) = std::env::var("ANISTREAM_API_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        self.provider_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Built-in servers plus configured extras
    pub fn server_catalog(&self) -> ServerCatalog {
        let mut catalog = ServerCatalog::default();
        if let Some(extra) = &self.extra_servers {
            catalog.extend(extra);
        }
        catalog
    }

    /// Server to use when the user names none
    pub fn default_server(&self, catalog: &ServerCatalog) -> Option<ServerName> {
        self.default_server
            .as_deref()
            .and_then(|name| catalog.parse(name).ok())
            .or_else(|| catalog.first())
    }

    /// Relay for cross-origin sources, if one is configured
    pub fn url_proxy(&self) -> Option<UrlProxy> {
        let cfg = self.proxy.as_ref().filter(|p| !p.endpoint.trim().is_empty())?;
        let mut proxy = UrlProxy::new(cfg.endpoint.trim())
            .with_style(cfg.style.clone())
            .with_allowed_hosts(&cfg.allowed_hosts);
        if let Some(param) = &cfg.param {
            proxy = proxy.with_param(param);
        }
        Some(proxy)
    }

    /// Default language table with config overrides applied
    pub fn language_table(&self) -> LanguageTable {
        let mut table = LanguageTable::default();
        if let Some(extra) = &self.languages {
            table.extend(extra);
        }
        table
    }

    /// Suggestion client; ANISTREAM_SUGGEST_KEY wins over the file's key
    pub fn suggestion_client(&self) -> Option<SuggestionClient> {
        let cfg = self.suggest.as_ref().filter(|s| !s.endpoint.trim().is_empty())?;
        let key = std::env::var("ANISTREAM_SUGGEST_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| cfg.api_key.clone());
        Some(SuggestionClient::new(cfg.endpoint.trim(), key))
    }

    /// Identity from the config file, if set
    pub fn user_context(&self) -> Option<UserContext> {
        let identity = self.identity.as_ref().filter(|i| !i.id.trim().is_empty())?;
        let name = if identity.display_name.trim().is_empty() {
            identity.id.clone()
        } else {
            identity.display_name.clone()
        };
        let mut ctx = UserContext::new(identity.id.trim(), name);
        ctx.avatar_url = identity.avatar_url.clone();
        Some(ctx)
    }

    /// Local cache according to settings, `None` when disabled
    pub fn local_cache(&self) -> Option<LocalCache> {
        let cfg = self.cache.clone().unwrap_or_default();
        if cfg.disabled.unwrap_or(false) {
            return None;
        }
        let path = LocalCache::default_path()?;
        Some(LocalCache::open(
            path,
            cfg.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES),
            cfg.ttl_secs.unwrap_or(DEFAULT_TTL_SECS),
        ))
    }
}
