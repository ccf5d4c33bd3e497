//! History of previous coloring book requests.
//!
//! Records are kept most-recent-first, capped at [`MAX_CREATIONS`], and never
//! contain two entries with the same theme, name and page count.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::storage::{KeyValueStore, HISTORY_KEY};

/// Maximum number of remembered creations
pub const MAX_CREATIONS: usize = 10;

/// A remembered generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creation {
    /// Creation timestamp, RFC 3339 with milliseconds
    pub id: String,
    pub theme: String,
    pub name: String,
    pub page_count: u32,
}

impl Creation {
    fn same_request(&self, theme: &str, name: &str, page_count: u32) -> bool {
        self.theme == theme && self.name == name && self.page_count == page_count
    }
}

/// Creation history backed by a [`KeyValueStore`]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    creations: Vec<Creation>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("creations", &self.creations)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Load history from the store.
    ///
    /// A value that cannot be parsed is discarded and removed from the store;
    /// the caller always gets a usable (possibly empty) history.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let creations = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Creation>>(&raw) {
                Ok(creations) => {
                    debug!("Loaded {} saved creations", creations.len());
                    creations
                }
                Err(e) => {
                    warn!("Failed to parse saved creations, resetting history: {}", e);
                    if let Err(e) = store.remove(HISTORY_KEY) {
                        warn!("Failed to clear corrupt history: {}", e);
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read saved creations: {}", e);
                Vec::new()
            }
        };

        Self { store, creations }
    }

    /// All records, most recent first
    pub fn list(&self) -> &[Creation] {
        &self.creations
    }

    pub fn get(&self, id: &str) -> Option<&Creation> {
        self.creations.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.creations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creations.is_empty()
    }

    /// Remember a request. Returns the new record, or `None` when an
    /// identical request is already stored.
    pub fn save(
        &mut self,
        theme: &str,
        name: &str,
        page_count: u32,
    ) -> Result<Option<Creation>, PersistenceError> {
        self.save_at(theme, name, page_count, Utc::now())
    }

    /// Same as [`save`](Self::save) with an explicit creation time.
    pub fn save_at(
        &mut self,
        theme: &str,
        name: &str,
        page_count: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<Creation>, PersistenceError> {
        if self
            .creations
            .iter()
            .any(|c| c.same_request(theme, name, page_count))
        {
            debug!("Creation already in history: {} / {} / {}", theme, name, page_count);
            return Ok(None);
        }

        let creation = Creation {
            id: self.unique_id(now),
            theme: theme.to_string(),
            name: name.to_string(),
            page_count,
        };

        let mut updated = Vec::with_capacity(MAX_CREATIONS);
        updated.push(creation.clone());
        updated.extend(self.creations.iter().take(MAX_CREATIONS - 1).cloned());
        self.commit(updated)?;

        info!(id = %creation.id, "Saved creation to history");
        Ok(Some(creation))
    }

    /// Remove the record with `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> Result<bool, PersistenceError> {
        if self.get(id).is_none() {
            return Ok(false);
        }

        let updated = self
            .creations
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        self.commit(updated)?;
        info!(id = %id, "Deleted creation from history");
        Ok(true)
    }

    fn unique_id(&self, now: DateTime<Utc>) -> String {
        let mut at = now;
        loop {
            let id = at.to_rfc3339_opts(SecondsFormat::Millis, true);
            if self.get(&id).is_none() {
                return id;
            }
            at += Duration::milliseconds(1);
        }
    }

    /// Write `updated` to the store, then adopt it. A failed write leaves the
    /// in-memory list as it was.
    fn commit(&mut self, updated: Vec<Creation>) -> Result<(), PersistenceError> {
        let json =
            serde_json::to_string(&updated).map_err(|source| PersistenceError::Serialize {
                key: HISTORY_KEY.to_string(),
                source,
            })?;
        self.store.set(HISTORY_KEY, &json)?;
        self.creations = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use crate::test_support::FlakyStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_empty_store_loads_empty() {
        let history = HistoryStore::load(memory());
        assert!(history.is_empty());
    }

    #[test]
    fn test_save_prepends() {
        let mut history = HistoryStore::load(memory());
        history.save_at("Space", "Alex", 3, at(0)).unwrap();
        history.save_at("Ocean", "Sam", 2, at(1)).unwrap();

        let themes: Vec<_> = history.list().iter().map(|c| c.theme.as_str()).collect();
        assert_eq!(themes, vec!["Ocean", "Space"]);
    }

    #[test]
    fn test_id_is_iso_timestamp() {
        let mut history = HistoryStore::load(memory());
        let created = history
            .save_at("Space", "Alex", 3, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(created.id, "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn test_duplicate_is_ignored() {
        let mut history = HistoryStore::load(memory());
        assert!(history.save_at("Space", "Alex", 3, at(0)).unwrap().is_some());
        assert!(history.save_at("Space", "Alex", 3, at(5)).unwrap().is_none());
        assert_eq!(history.len(), 1);

        // Any differing field is a new record
        assert!(history.save_at("Space", "Alex", 4, at(6)).unwrap().is_some());
        assert!(history.save_at("space", "Alex", 3, at(7)).unwrap().is_some());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_eleventh_evicts_oldest() {
        let mut history = HistoryStore::load(memory());
        for i in 0..10 {
            history.save_at(&format!("Theme {}", i), "Alex", 1, at(i)).unwrap();
        }
        assert_eq!(history.len(), 10);

        history.save_at("Theme 10", "Alex", 1, at(10)).unwrap();
        assert_eq!(history.len(), MAX_CREATIONS);
        assert_eq!(history.list()[0].theme, "Theme 10");
        assert!(history.list().iter().all(|c| c.theme != "Theme 0"));
    }

    #[test]
    fn test_same_millisecond_gets_distinct_ids() {
        let mut history = HistoryStore::load(memory());
        let a = history.save_at("A", "Alex", 1, at(0)).unwrap().unwrap();
        let b = history.save_at("B", "Alex", 1, at(0)).unwrap().unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_delete_keeps_relative_order() {
        let mut history = HistoryStore::load(memory());
        let mut ids = Vec::new();
        for i in 0..4 {
            let c = history.save_at(&format!("T{}", i), "Alex", 1, at(i)).unwrap().unwrap();
            ids.push(c.id);
        }

        assert!(history.delete(&ids[1]).unwrap());

        let themes: Vec<_> = history.list().iter().map(|c| c.theme.as_str()).collect();
        assert_eq!(themes, vec!["T3", "T2", "T0"]);
    }

    #[test]
    fn test_delete_unknown_id() {
        let mut history = HistoryStore::load(memory());
        history.save_at("Space", "Alex", 3, at(0)).unwrap();
        assert!(!history.delete("no-such-id").unwrap());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_memory_in_sync() {
        let store = Arc::new(FlakyStore::default());
        let mut history = HistoryStore::load(store.clone());
        history.save_at("Space", "Alex", 3, at(0)).unwrap();
        let id = history.list()[0].id.clone();

        store.set_fail_writes(true);
        assert!(history.save_at("Ocean", "Sam", 2, at(1)).is_err());
        assert!(history.delete(&id).is_err());
        assert_eq!(history.len(), 1);
        assert_eq!(history.list()[0].id, id);

        // What is on disk matches what is in memory
        let reloaded = HistoryStore::load(store.clone());
        assert_eq!(reloaded.list(), history.list());

        store.set_fail_writes(false);
        assert!(history.save_at("Ocean", "Sam", 2, at(1)).unwrap().is_some());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_roundtrip_through_store() {
        let store = memory();
        let mut history = HistoryStore::load(store.clone());
        history.save_at("Space", "Alex", 3, at(0)).unwrap();
        history.save_at("Ocean", "Sam", 2, at(1)).unwrap();
        history.save_at("Forest", "Kim", 10, at(2)).unwrap();

        let reloaded = HistoryStore::load(store);
        assert_eq!(reloaded.list(), history.list());
    }

    #[test]
    fn test_roundtrip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut history = HistoryStore::load(store);
        history.save_at("Space", "Alex", 3, at(0)).unwrap();

        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        let reloaded = HistoryStore::load(store);
        assert_eq!(reloaded.list(), history.list());
    }

    #[test]
    fn test_persisted_field_names() {
        let store = memory();
        let mut history = HistoryStore::load(store.clone());
        history.save_at("Space", "Alex", 3, at(0)).unwrap();

        let raw = store.get(HISTORY_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["pageCount"], 3);
        assert_eq!(value[0]["theme"], "Space");
        assert_eq!(value[0]["name"], "Alex");
    }

    #[test]
    fn test_corrupt_value_resets_and_clears() {
        let store = memory();
        store.set(HISTORY_KEY, "{not json").unwrap();

        let history = HistoryStore::load(store.clone());
        assert!(history.is_empty());
        assert!(store.get(HISTORY_KEY).unwrap().is_none());
    }

    proptest! {
        #[test]
        fn prop_history_invariants(
            entries in prop::collection::vec(("[a-c]", "[x-z]", 1u32..=3), 0..40)
        ) {
            let mut history = HistoryStore::load(memory());
            for (i, (theme, name, pages)) in entries.iter().enumerate() {
                history.save_at(theme, name, *pages, at(i as i64)).unwrap();
            }

            prop_assert!(history.len() <= MAX_CREATIONS);

            let list = history.list();
            for (i, a) in list.iter().enumerate() {
                for b in &list[i + 1..] {
                    prop_assert!(!a.same_request(&b.theme, &b.name, b.page_count));
                    prop_assert_ne!(&a.id, &b.id);
                }
            }
        }
    }
}
