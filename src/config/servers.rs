//! Static address book of known hub servers
//!
//! Maps logical server names (the names a `switch-server` redirect refers to)
//! to the port each hub instance listens on.

use serde::{Deserialize, Serialize};

/// A single `[[servers]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Logical host name used in redirects
    pub host: String,
    /// Port the hub listens on
    pub port: u16,
}

impl ServerEntry {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Immutable, ordered lookup of server entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBook {
    entries: Vec<ServerEntry>,
}

impl AddressBook {
    /// Build an address book, keeping the first entry for duplicated hosts
    pub fn new(entries: impl IntoIterator<Item = ServerEntry>) -> Self {
        let mut unique: Vec<ServerEntry> = Vec::new();
        for entry in entries {
            if !unique.iter().any(|e| e.host == entry.host) {
                unique.push(entry);
            }
        }
        Self { entries: unique }
    }

    /// Port registered for a logical host name
    pub fn port_for(&self, host: &str) -> Option<u16> {
        self.entries
            .iter()
            .find(|entry| entry.host == host)
            .map(|entry| entry.port)
    }

    pub fn entries(&self) -> &[ServerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
