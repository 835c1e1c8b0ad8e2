//! The task/user store: authoritative in-memory state behind one RwLock.
//!
//! A single lock guards tasks, users, and the id counter jointly, so every
//! mutation commits as one unit and every query sees a consistent view.
//! Readers share the lock; writers are exclusive. After each committed
//! mutation the affected snapshot is rewritten synchronously while the
//! write lock is still held. Snapshot failures are logged and never roll
//! back the in-memory change.
//!
//! Mutations that can fail for domain reasons (missing task, wrong owner,
//! already completed) report `false` rather than an error; the two causes
//! are deliberately indistinguishable at this surface.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{Task, TaskStatus, DEFAULT_CATEGORY};
use crate::user::{canonical_key, User};

#[derive(Debug, Default)]
struct State {
    tasks: Vec<Task>,
    users: HashMap<String, User>,
    next_id: u64,
}

/// Concurrency-safe task registry with write-through snapshots.
pub struct TaskStore {
    state: RwLock<State>,
    storage: Storage,
    /// Message from the most recent failed snapshot write, if any.
    save_warning: Mutex<Option<String>>,
}

impl TaskStore {
    /// Open a store backed by the given snapshot files.
    ///
    /// Unusable snapshots (missing, corrupt, unknown schema) load as empty
    /// state. The id counter resumes above the highest id ever persisted.
    pub fn open(tasks_path: impl AsRef<Path>, users_path: impl AsRef<Path>) -> Self {
        let storage = Storage::new(
            tasks_path.as_ref().to_path_buf(),
            users_path.as_ref().to_path_buf(),
        );

        let tasks = storage.load_tasks();
        let users = storage.load_users();
        let next_id = tasks.iter().map(|t| t.id).max().map_or(1, |max| max + 1);
        debug!(tasks = tasks.len(), users = users.len(), next_id, "store opened");

        Self {
            state: RwLock::new(State {
                tasks,
                users,
                next_id,
            }),
            storage,
            save_warning: Mutex::new(None),
        }
    }

    // A panicked writer never leaves a half-applied operation (each mutation
    // builds complete values before touching state), so a poisoned lock is
    // safe to recover.
    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_tasks(&self, state: &State) {
        if let Err(err) = self.storage.save_tasks(&state.tasks) {
            warn!(%err, "task snapshot write failed, in-memory state kept");
            self.note_save_failure("task", &err);
        }
    }

    fn persist_users(&self, state: &State) {
        if let Err(err) = self.storage.save_users(&state.users) {
            warn!(%err, "user snapshot write failed, in-memory state kept");
            self.note_save_failure("user", &err);
        }
    }

    fn note_save_failure(&self, kind: &str, err: &Error) {
        let mut slot = self
            .save_warning
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(format!(
            "{kind} snapshot write failed ({err}); change kept in memory only"
        ));
    }

    /// Warning from the most recent failed snapshot write, cleared on read.
    pub fn take_save_warning(&self) -> Option<String> {
        self.save_warning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Look up a user by name, creating it on first sight.
    ///
    /// Double-checked: a read-lock lookup first, and on miss the read lock
    /// is dropped before the write lock is taken, so the re-check under the
    /// write lock is mandatory. Concurrent callers converge on one entry
    /// with the first arrival's casing.
    pub fn get_or_create_user(&self, username: &str) -> Result<User> {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument(
                "username must not be empty".to_string(),
            ));
        }
        let key = canonical_key(trimmed);

        {
            let state = self.read_state();
            if let Some(user) = state.users.get(&key) {
                return Ok(user.clone());
            }
        }

        let mut state = self.write_state();
        if let Some(user) = state.users.get(&key) {
            return Ok(user.clone());
        }

        let user = User::new(trimmed);
        state.users.insert(key, user.clone());
        self.persist_users(&state);
        debug!(username = %user.username, "user created");
        Ok(user)
    }

    /// Create a task assigned to `assigned_user` (registered on demand).
    ///
    /// Id allocation and append happen under one write-lock hold, so ids
    /// are unique and issued in insertion order across all threads.
    pub fn add_task(
        &self,
        description: &str,
        category: Option<&str>,
        assigned_user: &str,
    ) -> Result<Task> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::InvalidArgument(
                "task description must not be empty".to_string(),
            ));
        }
        let category = match category.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };

        let user = self.get_or_create_user(assigned_user)?;

        let mut state = self.write_state();
        let id = state.next_id;
        state.next_id += 1;

        let task = Task::new(id, description, category, user.username);
        state.tasks.push(task.clone());
        self.persist_tasks(&state);
        debug!(id, assignee = %task.assigned_user, "task added");
        Ok(task)
    }

    /// Remove a task by id. A missing id is a `false` no-op.
    pub fn remove_task(&self, id: u64) -> bool {
        let mut state = self.write_state();
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        let removed = state.tasks.len() != before;
        if removed {
            self.persist_tasks(&state);
            debug!(id, "task removed");
        }
        removed
    }

    /// Complete a task on behalf of `username`.
    ///
    /// Only the assignee (case-insensitive) may complete, and only once;
    /// missing task, wrong owner, and repeat completion all report `false`.
    pub fn mark_task_completed(&self, id: u64, username: &str) -> bool {
        let key = canonical_key(username);
        if key.is_empty() {
            return false;
        }

        let mut state = self.write_state();
        let updated = match state.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) if canonical_key(&task.assigned_user) == key && task.is_pending() => {
                task.mark_completed().is_ok()
            }
            _ => false,
        };
        if updated {
            self.persist_tasks(&state);
            debug!(id, user = %username, "task completed");
        }
        updated
    }

    /// Move a task to `to_username`, creating the target user if needed.
    ///
    /// When `from_username` is supplied and non-blank it must match the
    /// current assignee (case-insensitive); `None` or blank skips the
    /// ownership check. The target user may outlive a failed reassignment.
    /// Works in either status.
    pub fn reassign_task(&self, id: u64, from_username: Option<&str>, to_username: &str) -> bool {
        let target = match self.get_or_create_user(to_username) {
            Ok(user) => user,
            Err(_) => return false,
        };
        let from_key = from_username
            .map(canonical_key)
            .filter(|key| !key.is_empty());

        let mut state = self.write_state();
        let updated = match state.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => match &from_key {
                Some(expected) if canonical_key(&task.assigned_user) != *expected => false,
                _ => {
                    task.assigned_user = target.username.clone();
                    true
                }
            },
            None => false,
        };
        if updated {
            self.persist_tasks(&state);
            debug!(id, to = %target.username, "task reassigned");
        }
        updated
    }

    /// All tasks in insertion order.
    pub fn all_tasks(&self) -> Vec<Task> {
        self.read_state().tasks.clone()
    }

    /// Tasks assigned to `username` (case-insensitive). Blank yields empty.
    pub fn user_tasks(&self, username: &str) -> Vec<Task> {
        let key = canonical_key(username);
        if key.is_empty() {
            return Vec::new();
        }
        self.read_state()
            .tasks
            .iter()
            .filter(|task| canonical_key(&task.assigned_user) == key)
            .cloned()
            .collect()
    }

    /// Pending tasks assigned to `username`.
    pub fn incomplete_tasks_by_user(&self, username: &str) -> Vec<Task> {
        let key = canonical_key(username);
        if key.is_empty() {
            return Vec::new();
        }
        self.read_state()
            .tasks
            .iter()
            .filter(|task| task.is_pending() && canonical_key(&task.assigned_user) == key)
            .cloned()
            .collect()
    }

    /// All pending tasks.
    pub fn incomplete_tasks(&self) -> Vec<Task> {
        self.read_state()
            .tasks
            .iter()
            .filter(|task| task.is_pending())
            .cloned()
            .collect()
    }

    /// Tasks in the given status.
    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.read_state()
            .tasks
            .iter()
            .filter(|task| task.status == status)
            .cloned()
            .collect()
    }

    /// Tasks in a category (trim + case-insensitive). Blank yields empty.
    pub fn tasks_by_category(&self, category: &str) -> Vec<Task> {
        let wanted = category.trim().to_lowercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.read_state()
            .tasks
            .iter()
            .filter(|task| task.category.trim().to_lowercase() == wanted)
            .cloned()
            .collect()
    }

    /// Distinct category names as stored, ordered.
    pub fn categories(&self) -> BTreeSet<String> {
        self.read_state()
            .tasks
            .iter()
            .map(|task| task.category.clone())
            .collect()
    }

    /// Single task lookup; absence is `None`.
    pub fn task_by_id(&self, id: u64) -> Option<Task> {
        self.read_state()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    /// All registered users, sorted by canonical username.
    pub fn users(&self) -> Vec<User> {
        let state = self.read_state();
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|user| canonical_key(&user.username));
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> TaskStore {
        TaskStore::open(dir.path().join("tasks.json"), dir.path().join("users.json"))
    }

    #[test]
    fn add_task_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let a = store.add_task("first", None, "alice").unwrap();
        let b = store.add_task("second", Some("Work"), "bob").unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.category, DEFAULT_CATEGORY);
        assert_eq!(b.category, "Work");
    }

    #[test]
    fn add_task_rejects_blank_description() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let err = store.add_task("   ", None, "alice").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn get_or_create_user_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let first = store.get_or_create_user("Bob").unwrap();
        let second = store.get_or_create_user("  BOB ").unwrap();
        assert_eq!(first.username, "Bob");
        assert_eq!(second.username, "Bob");
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn get_or_create_user_rejects_blank() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert!(matches!(
            store.get_or_create_user("  "),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn completion_requires_the_assignee() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let task = store.add_task("Write report", None, "bob").unwrap();
        assert!(!store.mark_task_completed(task.id, "mallory"));
        assert!(store.mark_task_completed(task.id, "BOB"));
        // already completed
        assert!(!store.mark_task_completed(task.id, "bob"));
    }

    #[test]
    fn remove_task_reports_whether_anything_changed() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let task = store.add_task("cleanup", None, "alice").unwrap();
        assert!(store.remove_task(task.id));
        assert!(!store.remove_task(task.id));
        assert!(!store.remove_task(999));
    }

    #[test]
    fn reassign_respects_ownership_and_admin_override() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let task = store.add_task("triage", None, "alice").unwrap();

        // wrong current owner: refused, but the target user now exists
        assert!(!store.reassign_task(task.id, Some("mallory"), "carol"));
        assert_eq!(store.task_by_id(task.id).unwrap().assigned_user, "alice");
        assert!(store.users().iter().any(|u| u.username == "carol"));

        // matching owner
        assert!(store.reassign_task(task.id, Some("ALICE"), "bob"));
        assert_eq!(store.task_by_id(task.id).unwrap().assigned_user, "bob");

        // admin override with no from
        assert!(store.reassign_task(task.id, None, "carol"));
        assert_eq!(store.task_by_id(task.id).unwrap().assigned_user, "carol");
    }

    #[test]
    fn reassign_to_blank_target_is_refused() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let task = store.add_task("triage", None, "alice").unwrap();
        assert!(!store.reassign_task(task.id, None, "   "));
        assert!(!store.reassign_task(999, None, "bob"));
    }

    #[test]
    fn queries_filter_by_status_category_and_user() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let t1 = store.add_task("one", Some("Work"), "alice").unwrap();
        let _t2 = store.add_task("two", Some("Home"), "bob").unwrap();
        let _t3 = store.add_task("three", Some("work"), "alice").unwrap();
        store.mark_task_completed(t1.id, "alice");

        assert_eq!(store.all_tasks().len(), 3);
        assert_eq!(store.user_tasks("ALICE").len(), 2);
        assert_eq!(store.incomplete_tasks_by_user("alice").len(), 1);
        assert_eq!(store.incomplete_tasks().len(), 2);
        assert_eq!(store.tasks_by_status(TaskStatus::Completed).len(), 1);
        assert_eq!(store.tasks_by_category(" WORK ").len(), 2);
        assert!(store.user_tasks("").is_empty());
        assert!(store.tasks_by_category("  ").is_empty());

        let categories: Vec<String> = store.categories().into_iter().collect();
        assert_eq!(categories, vec!["Home", "Work", "work"]);
    }

    #[test]
    fn failed_snapshot_write_leaves_a_warning() {
        let dir = TempDir::new().unwrap();

        // snapshot paths whose parent is a regular file: every save fails
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = TaskStore::open(blocker.join("tasks.json"), blocker.join("users.json"));

        let task = store.add_task("kept", None, "bob").unwrap();
        let warning = store.take_save_warning().expect("warning recorded");
        assert!(warning.contains("snapshot write failed"));

        // cleared once read, set again on the next failure
        assert!(store.take_save_warning().is_none());
        assert!(store.mark_task_completed(task.id, "bob"));
        assert!(store.take_save_warning().is_some());
    }

    #[test]
    fn successful_saves_leave_no_warning() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_task("persisted", None, "alice").unwrap();
        assert!(store.take_save_warning().is_none());
    }

    #[test]
    fn next_id_resumes_above_persisted_ids() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir);
            store.add_task("one", None, "alice").unwrap();
            store.add_task("two", None, "alice").unwrap();
            assert!(store.remove_task(2));
        }

        let reopened = open_store(&dir);
        let task = reopened.add_task("three", None, "alice").unwrap();
        assert_eq!(task.id, 2);

        let reloaded = open_store(&dir);
        let next = reloaded.add_task("four", None, "alice").unwrap();
        assert_eq!(next.id, 3);
    }
}
