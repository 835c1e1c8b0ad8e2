//! Session actors: one unit of concurrent work against a shared store.
//!
//! A session registers its user, adds a batch of tasks, lists what it can
//! see, and completes its own pending work. `run_concurrent_sessions` fans
//! sessions out one per OS thread over an `Arc`-shared store, which is how
//! the `demo` subcommand and the concurrency tests exercise the lock
//! discipline.

use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::TaskStore;

/// What one session did, for reporting and assertions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub username: String,
    /// Ids of tasks this session created, in creation order.
    pub added: Vec<u64>,
    /// Ids of own tasks this session completed.
    pub completed: Vec<u64>,
    /// Total tasks visible in the store when the session finished.
    pub visible: usize,
}

/// A scripted workload bound to one username.
pub struct Session {
    store: Arc<TaskStore>,
    username: String,
}

impl Session {
    pub fn new(store: Arc<TaskStore>, username: impl Into<String>) -> Self {
        Self {
            store,
            username: username.into(),
        }
    }

    /// Run the workload: register, add `tasks`, complete own pending work.
    ///
    /// `tasks` is a list of (description, category) pairs.
    pub fn run(&self, tasks: &[(String, String)]) -> Result<SessionReport> {
        let user = self.store.get_or_create_user(&self.username)?;

        let mut added = Vec::with_capacity(tasks.len());
        for (description, category) in tasks {
            let task = self
                .store
                .add_task(description, Some(category), &user.username)?;
            added.push(task.id);
        }

        let mut completed = Vec::new();
        for task in self.store.incomplete_tasks_by_user(&user.username) {
            if self.store.mark_task_completed(task.id, &user.username) {
                completed.push(task.id);
            }
        }

        let visible = self.store.all_tasks().len();
        debug!(
            user = %user.username,
            added = added.len(),
            completed = completed.len(),
            visible,
            "session finished"
        );

        Ok(SessionReport {
            username: user.username,
            added,
            completed,
            visible,
        })
    }
}

/// Run one session per username on its own thread and collect the reports.
pub fn run_concurrent_sessions(
    store: Arc<TaskStore>,
    usernames: &[String],
    tasks_per_session: usize,
) -> Result<Vec<SessionReport>> {
    let mut handles = Vec::with_capacity(usernames.len());

    for username in usernames {
        let store = Arc::clone(&store);
        let username = username.clone();
        handles.push(thread::spawn(move || {
            let tasks: Vec<(String, String)> = (1..=tasks_per_session)
                .map(|n| (format!("{username} task {n}"), "General".to_string()))
                .collect();
            Session::new(store, username).run(&tasks)
        }));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle
            .join()
            .map_err(|_| Error::OperationFailed("session thread panicked".to_string()))??;
        reports.push(report);
    }

    Ok(reports)
}
