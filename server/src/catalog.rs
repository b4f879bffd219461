//! Tyrant catalogue access.
//!
//! The scene consumes exactly one capability from persistence: given a
//! tyrant identifier, return its stat block. Everything else about the
//! catalogue (how it is edited, where it is stored) lives outside this
//! process. [`MemoryCatalog`] is the in-process implementation, seeded once
//! at startup and immutable while serving, which is what makes concurrent
//! lookups from session tasks safe without a lock.

use log::info;
use shared::Tyrant;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Stat-block lookup contract consumed by the hub.
pub trait TyrantCatalog: Send + Sync {
    /// Returns the stat block for `id`, or `None` when the tyrant is unknown.
    fn get_tyrant(&self, id: &str) -> Option<Tyrant>;
}

/// In-memory catalogue keyed by tyrant id.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tyrants: HashMap<String, Tyrant>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalogue from a JSON file holding an array of stat blocks.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = fs::read_to_string(path)?;
        let catalog = Self::from_json(&raw)?;
        info!(
            "loaded {} tyrants from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parses a catalogue from a JSON array of stat blocks.
    ///
    /// Later entries win on duplicate ids.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let tyrants: Vec<Tyrant> = serde_json::from_str(raw)?;
        let mut catalog = Self::new();
        for tyrant in tyrants {
            catalog.insert(tyrant);
        }
        Ok(catalog)
    }

    /// Adds (or replaces) one stat block. Seeding happens before serving;
    /// there is no mutation path once the catalogue is shared.
    pub fn insert(&mut self, tyrant: Tyrant) {
        self.tyrants.insert(tyrant.id.clone(), tyrant);
    }

    pub fn len(&self) -> usize {
        self.tyrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tyrants.is_empty()
    }
}

impl TyrantCatalog for MemoryCatalog {
    fn get_tyrant(&self, id: &str) -> Option<Tyrant> {
        self.tyrants.get(id).cloned()
    }
}
