//! offtimer-store: JSON-file persistence for scheduled task records.
//!
//! The table is a single pretty-printed JSON array in insertion order,
//! fully rewritten on every save. Writes land in a sibling temp file and
//! are renamed into place, so an interrupted save cannot leave a garbled
//! file behind.

use std::fs;
use std::path::{Path, PathBuf};

use offtimer_types::ScheduledTask;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store contains invalid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable table of scheduled tasks, keyed by task name at the caller
/// level. Callers read-modify-write the whole collection.
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Create a store over the given file path. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records in insertion order. A missing file is the normal
    /// initial state and yields an empty list.
    pub fn load(&self) -> Result<Vec<ScheduledTask>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Replace the entire table with `tasks`.
    pub fn save(&self, tasks: &[ScheduledTask]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(tasks)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Saved {} task(s) to {}", tasks.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offtimer_types::{Action, ScheduleType, Weekday};

    fn task(name: &str) -> ScheduledTask {
        ScheduledTask {
            task_name: name.into(),
            action: Action::Shutdown,
            schedule_type: ScheduleType::Weekly,
            days_of_week: vec![Weekday::Mon, Weekday::Wed],
            timestamp: 1700000000000,
            enabled: true,
            platform_job_id: None,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));

        let tasks = vec![task("OfftimerTask_1"), task("OfftimerTask_2")];
        store.save(&tasks).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].task_name, "OfftimerTask_1");
        assert_eq!(loaded[1].task_name, "OfftimerTask_2");
        assert_eq!(loaded[0].days_of_week, vec![Weekday::Mon, Weekday::Wed]);

        // save(load()) leaves the file unchanged
        store.save(&loaded).unwrap();
        let reread = fs::read_to_string(store.path()).unwrap();
        let reparsed: Vec<ScheduledTask> = serde_json::from_str(&reread).unwrap();
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn test_save_is_full_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));

        store.save(&[task("a"), task("b")]).unwrap();
        store.save(&[task("c")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].task_name, "c");
    }

    #[test]
    fn test_on_disk_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.json"));
        store.save(&[task("OfftimerTask_1")]).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        // Pretty-printed array with the contract field names
        assert!(raw.starts_with('['));
        assert!(raw.contains('\n'));
        assert!(raw.contains("\"taskName\": \"OfftimerTask_1\""));
        assert!(raw.contains("\"scheduleType\": \"weekly\""));
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path().join("nested/deeper/tasks.json"));
        store.save(&[task("a")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let store = TaskStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Serde(_))));
    }
}
