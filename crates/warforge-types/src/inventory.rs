//! Per-faction typed part storage.
//!
//! An inventory maps each [`DetailType`] to the ordered collection of
//! details the faction has received and not yet consumed. Growth is
//! append-only and removal is LIFO (most-recently-added-first), which
//! makes assembly deterministic for a given arrival order. Inventories
//! persist across days -- unmatched leftovers are carried forward, never
//! discarded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detail::{Detail, DetailType};

/// Typed part storage with append-only growth and LIFO removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    shelves: BTreeMap<DetailType, Vec<Detail>>,
}

impl Inventory {
    /// Create an empty inventory.
    pub const fn new() -> Self {
        Self {
            shelves: BTreeMap::new(),
        }
    }

    /// Append a detail to the shelf for its type.
    pub fn store(&mut self, detail: Detail) {
        self.shelves
            .entry(detail.detail_type)
            .or_default()
            .push(detail);
    }

    /// Number of details currently stored for the given type.
    pub fn count(&self, detail_type: DetailType) -> usize {
        self.shelves.get(&detail_type).map_or(0, Vec::len)
    }

    /// Remove and return the most recently added detail of the given type.
    ///
    /// Returns `None` if the shelf for that type is empty.
    pub fn take_latest(&mut self, detail_type: DetailType) -> Option<Detail> {
        self.shelves.get_mut(&detail_type)?.pop()
    }

    /// Total number of details across all types.
    pub fn total(&self) -> usize {
        self.shelves.values().map(Vec::len).sum()
    }

    /// Whether no details of any type are stored.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Per-type counts of non-empty shelves, for reporting.
    pub fn counts(&self) -> BTreeMap<DetailType, usize> {
        self.shelves
            .iter()
            .filter(|(_, shelf)| !shelf.is_empty())
            .map(|(t, shelf)| (*t, shelf.len()))
            .collect()
    }
}
