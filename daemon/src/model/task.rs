//! The authoritative task (tab-group) store (spec §3, §4.3).

use super::tab::NO_TASK;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub external_id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<TaskRecord>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_external(&self, ext_id: i64) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.external_id == ext_id)
    }

    fn find_index(&self, ext_id: i64) -> Option<usize> {
        self.tasks.iter().position(|t| t.external_id == ext_id)
    }

    /// Insert or update a task record. `external_id == -1` (the "no task"
    /// sentinel) is never stored (spec §3 TaskStore invariant).
    pub fn incorporate(&mut self, ext_id: i64, name: Option<&str>, color: Option<&str>) {
        if ext_id == NO_TASK {
            return;
        }
        let name = name.filter(|n| !n.is_empty()).unwrap_or("Unknown").to_string();
        let color = color.filter(|c| !c.is_empty()).unwrap_or("grey").to_string();
        if let Some(idx) = self.find_index(ext_id) {
            let record = &mut self.tasks[idx];
            record.name = name;
            record.color = color;
        } else {
            self.tasks.push(TaskRecord {
                external_id: ext_id,
                name,
                color,
            });
        }
    }

    pub fn remove(&mut self, ext_id: i64) {
        if let Some(idx) = self.find_index(ext_id) {
            self.tasks.remove(idx);
        }
    }

    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.tasks.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorporate_defaults_color_to_grey() {
        let mut store = TaskStore::new();
        store.incorporate(10, Some("Work"), None);
        assert_eq!(store.find_by_external(10).unwrap().color, "grey");
    }

    #[test]
    fn sentinel_external_id_is_never_stored() {
        let mut store = TaskStore::new();
        store.incorporate(NO_TASK, Some("ghost"), Some("red"));
        assert!(store.is_empty());
    }

    #[test]
    fn external_ids_stay_unique() {
        let mut store = TaskStore::new();
        store.incorporate(1, Some("a"), Some("red"));
        store.incorporate(1, Some("b"), Some("blue"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_external(1).unwrap().name, "b");
    }

    #[test]
    fn remove_unknown_id_is_idempotent() {
        let mut store = TaskStore::new();
        store.remove(999);
        assert!(store.is_empty());
    }
}
