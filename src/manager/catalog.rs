//! In-memory catalogs
//!
//! A catalog keeps two parallel structures for one entity kind: an ordered
//! list (load order) and an ID-keyed map. Both always contain the same
//! elements; map keys are unique.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

use crate::db::Row;
use crate::error::DataError;

/// An entity that can live in a catalog
pub trait CatalogEntry: Send + Sync {
    fn id(&self) -> i64;

    /// Display name used for by-name lookups; empty when the entity kind
    /// has no name
    fn label(&self) -> &str {
        ""
    }
}

pub struct Catalog<T> {
    order: Vec<Arc<T>>,
    by_id: HashMap<i64, Arc<T>>,
}

impl<T: CatalogEntry> Catalog<T> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Insert an entry, replacing any entry with the same ID in place
    pub fn insert(&mut self, entry: Arc<T>) {
        let id = entry.id();
        if self.by_id.insert(id, Arc::clone(&entry)).is_some() {
            if let Some(slot) = self.order.iter_mut().find(|e| e.id() == id) {
                *slot = entry;
            }
        } else {
            self.order.push(entry);
        }
    }

    /// Remove from both structures
    pub fn remove(&mut self, id: i64) -> Option<Arc<T>> {
        let removed = self.by_id.remove(&id)?;
        self.order.retain(|e| e.id() != id);
        Some(removed)
    }

    pub fn get(&self, id: i64) -> Option<Arc<T>> {
        self.by_id.get(&id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<T>> {
        self.order.iter().find(|e| e.label() == name).cloned()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All entries in load order
    pub fn all(&self) -> Vec<Arc<T>> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.by_id.clear();
    }
}

impl<T: CatalogEntry> Default for Catalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a batch of rows to entities, skipping rows that fail to map
///
/// A bad row (typically a missing or garbage ID) is a column-level error for
/// that row only; the rest of the batch still loads.
pub fn map_rows<T>(
    table: &str,
    rows: &[Row],
    mut map: impl FnMut(&Row) -> Result<T, DataError>,
) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match map(row) {
            Ok(entity) => out.push(entity),
            Err(e) => error!(table, error = %e, "skipping unmappable row"),
        }
    }
    out
}
