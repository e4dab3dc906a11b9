//! Provider-side server names
//!
//! The set of servers belongs to the provider, so it is configuration rather
//! than an enum: a [`ServerName`] can only be produced by a [`ServerCatalog`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::PlaybackError;

/// Servers the streaming provider documents out of the box
pub const DEFAULT_SERVERS: &[&str] = &["vidcloud", "streamsb", "vidstreaming", "streamtape"];

/// A server name validated against a [`ServerCatalog`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerName(String);

impl ServerName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ServerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Known servers, in preference order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCatalog {
    known: Vec<String>,
}

impl Default for ServerCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SERVERS.iter().copied())
    }
}

impl ServerCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self { known: Vec::new() };
        catalog.extend(names);
        catalog
    }

    /// Add servers the provider has started offering
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = normalize(name.as_ref());
            if !name.is_empty() && !self.known.contains(&name) {
                self.known.push(name);
            }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.known
    }

    /// Validate a user-supplied server name
    pub fn parse(&self, name: &str) -> Result<ServerName, PlaybackError> {
        let name = normalize(name);
        if self.known.contains(&name) {
            Ok(ServerName(name))
        } else {
            Err(PlaybackError::UnknownServer {
                name,
                known: self.known.join(", "),
            })
        }
    }

    /// First known server, used when the user expresses no preference
    pub fn first(&self) -> Option<ServerName> {
        self.known.first().cloned().map(ServerName)
    }

    /// Other servers worth trying after `current` came back empty
    pub fn alternatives(&self, current: &ServerName) -> Vec<ServerName> {
        self.known
            .iter()
            .filter(|n| n.as_str() != current.as_str())
            .cloned()
            .map(ServerName)
            .collect()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
