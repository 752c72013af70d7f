//! Field-to-fragment mapping table.

pub mod remap;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::document::FieldKey;
use crate::models::fragment::{FragmentId, Rect, SourceFragment};

pub use remap::{MappingOperation, remap_for_shift};

/// Cached bounding box of one source fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentGeometry {
    pub id: FragmentId,
    pub top: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Fragments supporting one field, plus their cached geometry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMappingEntry {
    /// Supporting fragment ids, in the order they were linked.
    pub source_ids: Vec<FragmentId>,

    /// Derived from `source_ids`; may be stale until recomputed.
    #[serde(default)]
    pub cached_geometry: Vec<FragmentGeometry>,
}

impl FieldMappingEntry {
    /// Create an entry and resolve its geometry.
    pub fn new(source_ids: Vec<FragmentId>, context: &GeometryContext) -> Self {
        let cached_geometry = context.resolve(&source_ids);
        Self {
            source_ids,
            cached_geometry,
        }
    }

    /// Recompute the cached geometry.
    pub fn refresh(&mut self, context: &GeometryContext) {
        self.cached_geometry = context.resolve(&self.source_ids);
    }
}

// Geometry is derived, so equality only looks at the linked fragments.
impl PartialEq for FieldMappingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.source_ids == other.source_ids
    }
}

/// Fragment bounds indexed by id, shared across one batch of updates.
#[derive(Debug, Clone, Default)]
pub struct GeometryContext {
    bounds: HashMap<FragmentId, Rect>,
}

impl GeometryContext {
    /// Index a fragment list.
    pub fn new(fragments: &[SourceFragment]) -> Self {
        Self {
            bounds: fragments
                .iter()
                .map(|f| (f.id.clone(), f.bounds()))
                .collect(),
        }
    }

    /// Number of indexed fragments.
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Geometry for each id that is known; unknown ids are skipped.
    pub fn resolve(&self, ids: &[FragmentId]) -> Vec<FragmentGeometry> {
        ids.iter()
            .filter_map(|id| {
                self.bounds.get(id).map(|r| FragmentGeometry {
                    id: id.clone(),
                    top: r.top,
                    left: r.left,
                    right: r.right,
                    bottom: r.bottom,
                })
            })
            .collect()
    }
}

/// Field key → mapping entry. A missing key means the field is unmapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMappingTable {
    entries: BTreeMap<FieldKey, FieldMappingEntry>,
}

impl FieldMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &FieldKey) -> Option<&FieldMappingEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &FieldKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace an entry, returning the previous one.
    pub fn insert(&mut self, key: FieldKey, entry: FieldMappingEntry) -> Option<FieldMappingEntry> {
        self.entries.insert(key, entry)
    }

    /// Remove an entry, returning it.
    pub fn remove(&mut self, key: &FieldKey) -> Option<FieldMappingEntry> {
        self.entries.remove(key)
    }

    /// Mapped keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldMappingEntry)> {
        self.entries.iter()
    }

    /// Drop entries whose key fails the predicate, returning the dropped keys.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&FieldKey) -> bool) -> Vec<FieldKey> {
        let dropped: Vec<FieldKey> = self.entries.keys().filter(|k| !keep(k)).cloned().collect();
        for key in &dropped {
            self.entries.remove(key);
        }
        dropped
    }

    /// Recompute every entry's cached geometry.
    pub fn refresh_geometry(&mut self, context: &GeometryContext) {
        for entry in self.entries.values_mut() {
            entry.refresh(context);
        }
    }

    /// Fragment id → keys of the fields it supports.
    pub fn reverse_index(&self) -> BTreeMap<FragmentId, Vec<FieldKey>> {
        let mut index: BTreeMap<FragmentId, Vec<FieldKey>> = BTreeMap::new();
        for (key, entry) in &self.entries {
            for id in &entry.source_ids {
                let keys = index.entry(id.clone()).or_default();
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
        }
        index
    }
}

impl FromIterator<(FieldKey, FieldMappingEntry)> for FieldMappingTable {
    fn from_iter<I: IntoIterator<Item = (FieldKey, FieldMappingEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
