//! Snapshot persistence for tasks and users.
//!
//! Each collection lives in its own JSON file wrapped in a versioned
//! envelope. Loads are forgiving: a missing, corrupt, or unrecognized
//! snapshot yields an empty collection with a warning, never an error.
//! Saves replace the whole file atomically under a sibling `.lock`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::lock::{write_atomic_locked, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::Task;
use crate::user::{canonical_key, User};

pub const TASKS_SCHEMA_VERSION: &str = "cotask.tasks.v1";
pub const USERS_SCHEMA_VERSION: &str = "cotask.users.v1";

#[derive(Debug, Serialize, Deserialize)]
struct TaskSnapshot {
    schema_version: String,
    generated_at: DateTime<Utc>,
    tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserSnapshot {
    schema_version: String,
    generated_at: DateTime<Utc>,
    users: Vec<User>,
}

/// Snapshot file pair backing a store.
#[derive(Debug, Clone)]
pub struct Storage {
    tasks_path: PathBuf,
    users_path: PathBuf,
}

impl Storage {
    pub fn new(tasks_path: impl Into<PathBuf>, users_path: impl Into<PathBuf>) -> Self {
        Self {
            tasks_path: tasks_path.into(),
            users_path: users_path.into(),
        }
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    /// Load the task snapshot, or an empty list when none is usable.
    pub fn load_tasks(&self) -> Vec<Task> {
        let data = match fs::read_to_string(&self.tasks_path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.tasks_path.display(), %err, "failed to read task snapshot, starting empty");
                return Vec::new();
            }
        };

        let snapshot: TaskSnapshot = match serde_json::from_str(&data) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(path = %self.tasks_path.display(), %err, "corrupt task snapshot, starting empty");
                return Vec::new();
            }
        };

        if snapshot.schema_version != TASKS_SCHEMA_VERSION {
            warn!(
                path = %self.tasks_path.display(),
                found = %snapshot.schema_version,
                expected = TASKS_SCHEMA_VERSION,
                "unknown task snapshot schema, starting empty"
            );
            return Vec::new();
        }

        snapshot.tasks
    }

    /// Load the user snapshot keyed by canonical username, or empty.
    pub fn load_users(&self) -> HashMap<String, User> {
        let data = match fs::read_to_string(&self.users_path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %self.users_path.display(), %err, "failed to read user snapshot, starting empty");
                return HashMap::new();
            }
        };

        let snapshot: UserSnapshot = match serde_json::from_str(&data) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(path = %self.users_path.display(), %err, "corrupt user snapshot, starting empty");
                return HashMap::new();
            }
        };

        if snapshot.schema_version != USERS_SCHEMA_VERSION {
            warn!(
                path = %self.users_path.display(),
                found = %snapshot.schema_version,
                expected = USERS_SCHEMA_VERSION,
                "unknown user snapshot schema, starting empty"
            );
            return HashMap::new();
        }

        snapshot
            .users
            .into_iter()
            .map(|user| (canonical_key(&user.username), user))
            .collect()
    }

    /// Write a full replacement task snapshot.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        let snapshot = TaskSnapshot {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        write_atomic_locked(&self.tasks_path, json.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }

    /// Write a full replacement user snapshot, ordered by canonical key.
    pub fn save_users(&self, users: &HashMap<String, User>) -> Result<()> {
        let mut ordered: Vec<(&String, &User)> = users.iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(b.0));

        let snapshot = UserSnapshot {
            schema_version: USERS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            users: ordered.into_iter().map(|(_, user)| user.clone()).collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        write_atomic_locked(&self.users_path, json.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage_in(dir: &TempDir) -> Storage {
        Storage::new(dir.path().join("tasks.json"), dir.path().join("users.json"))
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        assert!(storage.load_tasks().is_empty());
        assert!(storage.load_users().is_empty());
    }

    #[test]
    fn tasks_round_trip_through_snapshot() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let mut tasks = vec![
            Task::new(1, "Write report", "Work", "Alice"),
            Task::new(2, "Buy milk", "Errands", "Bob"),
        ];
        tasks[1].mark_completed().unwrap();

        storage.save_tasks(&tasks).unwrap();
        let loaded = storage.load_tasks();
        assert_eq!(loaded, tasks);
    }

    #[test]
    fn users_round_trip_keyed_by_canonical_name() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let mut users = HashMap::new();
        users.insert("bob".to_string(), User::new("Bob"));
        users.insert("alice".to_string(), User::new("ALICE"));

        storage.save_users(&users).unwrap();
        let loaded = storage.load_users();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["bob"].username, "Bob");
        assert_eq!(loaded["alice"].username, "ALICE");
    }

    #[test]
    fn corrupt_snapshot_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        fs::write(storage.tasks_path(), "{not json").unwrap();
        fs::write(storage.users_path(), "[1, 2, 3]").unwrap();

        assert!(storage.load_tasks().is_empty());
        assert!(storage.load_users().is_empty());
    }

    #[test]
    fn unknown_schema_version_loads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        let payload = serde_json::json!({
            "schema_version": "cotask.tasks.v99",
            "generated_at": Utc::now(),
            "tasks": [],
        });
        fs::write(storage.tasks_path(), payload.to_string()).unwrap();

        assert!(storage.load_tasks().is_empty());
    }

    #[test]
    fn racing_snapshot_writers_leave_a_loadable_snapshot() {
        use std::sync::{Arc, Barrier};

        let dir = TempDir::new().unwrap();
        let storage = Arc::new(storage_in(&dir));

        let writers = 6u64;
        let barrier = Arc::new(Barrier::new(writers as usize));
        let mut handles = Vec::with_capacity(writers as usize);

        for idx in 0..writers {
            let storage = Arc::clone(&storage);
            let barrier = Arc::clone(&barrier);
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                let tasks: Vec<Task> = (0..=idx)
                    .map(|n| {
                        Task::new(n + 1, format!("writer {idx} task {n}"), "General", "alice")
                    })
                    .collect();
                storage.save_tasks(&tasks).unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // some writer's full snapshot survives, never an interleaving
        let loaded = storage.load_tasks();
        assert!(!loaded.is_empty());
        let winner = loaded.len() as u64 - 1;
        let prefix = format!("writer {winner} ");
        assert!(loaded.iter().all(|t| t.description.starts_with(&prefix)));
    }

    #[test]
    fn snapshot_envelope_carries_schema_version() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);

        storage.save_tasks(&[]).unwrap();
        let raw = fs::read_to_string(storage.tasks_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], TASKS_SCHEMA_VERSION);
        assert!(value["generated_at"].is_string());
    }
}
