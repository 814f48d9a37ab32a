//! The authoritative tab store (spec §3, §4.2).
//!
//! Ordering is insertion order, newest first, which is a stable-ordered
//! substitute for the original C daemon's hand-rolled singly-linked list of
//! `TabInfo` nodes (see spec §9): an index-linked `Vec` gives O(1) iteration
//! in a deterministic order and is the closest "ordered collection" to the
//! original semantics at the cardinalities this daemon ever sees (tens to
//! low hundreds of tabs).

use std::collections::HashSet;

pub const NO_TASK: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct TabRecord {
    pub id: u64,
    pub title: String,
    pub active: bool,
    pub task_ext_id: i64,
}

#[derive(Debug, Default)]
pub struct TabStore {
    tabs: Vec<TabRecord>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, id: u64) -> Option<&TabRecord> {
        self.tabs.iter().find(|t| t.id == id)
    }

    fn find_index(&self, id: u64) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Insert a new record or update an existing one in place.
    ///
    /// Title is only overwritten when it actually differs (spec §4.2); a
    /// missing title defaults to "Unknown" (spec §3). Newly inserted tabs
    /// start inactive — activation is only ever set by [`Self::apply_active`].
    pub fn upsert(&mut self, id: u64, title: Option<&str>, task_ext_id: i64) {
        let title = title.filter(|t| !t.is_empty()).unwrap_or("Unknown");
        if let Some(idx) = self.find_index(id) {
            let record = &mut self.tabs[idx];
            if record.title != title {
                record.title = title.to_string();
            }
            record.task_ext_id = task_ext_id;
        } else {
            self.tabs.push(TabRecord {
                id,
                title: title.to_string(),
                active: false,
                task_ext_id,
            });
        }
    }

    /// Remove a tab if present; unknown ids are silently ignored (idempotent).
    pub fn remove(&mut self, id: u64) {
        if let Some(idx) = self.find_index(id) {
            self.tabs.remove(idx);
        }
    }

    /// Set `active` true on exactly the tabs whose id appears in `ids`,
    /// false on every other tab (spec §4.2 "active exclusivity").
    pub fn apply_active(&mut self, ids: &[u64]) {
        let active_ids: HashSet<u64> = ids.iter().copied().collect();
        for tab in &mut self.tabs {
            tab.active = active_ids.contains(&tab.id);
        }
    }

    pub fn snapshot(&self) -> Vec<TabRecord> {
        self.tabs.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_inserts_inactive_with_default_title() {
        let mut store = TabStore::new();
        store.upsert(1, None, NO_TASK);
        let tab = store.find(1).unwrap();
        assert_eq!(tab.title, "Unknown");
        assert!(!tab.active);
        assert_eq!(tab.task_ext_id, NO_TASK);
    }

    #[test]
    fn upsert_only_rewrites_title_when_different() {
        let mut store = TabStore::new();
        store.upsert(1, Some("A"), NO_TASK);
        store.upsert(1, Some("A"), 5);
        assert_eq!(store.find(1).unwrap().title, "A");
        assert_eq!(store.find(1).unwrap().task_ext_id, 5);
    }

    #[test]
    fn remove_unknown_id_is_idempotent() {
        let mut store = TabStore::new();
        store.remove(404);
        assert!(store.is_empty());
    }

    #[test]
    fn apply_active_is_exclusive() {
        let mut store = TabStore::new();
        store.upsert(1, Some("a"), NO_TASK);
        store.upsert(2, Some("b"), NO_TASK);
        store.upsert(3, Some("c"), NO_TASK);
        store.apply_active(&[2]);
        assert!(!store.find(1).unwrap().active);
        assert!(store.find(2).unwrap().active);
        assert!(!store.find(3).unwrap().active);
    }

    #[test]
    fn tab_ids_stay_unique_across_repeated_upserts() {
        let mut store = TabStore::new();
        for _ in 0..5 {
            store.upsert(1, Some("x"), NO_TASK);
        }
        assert_eq!(store.len(), 1);
    }
}
