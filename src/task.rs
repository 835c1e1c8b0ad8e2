//! Task entity and status state machine.
//!
//! A task is Pending from creation until its assignee completes it;
//! Completed is terminal. Ids are issued by the store and never reused.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Category applied when a task is created without one.
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub category: String,
    pub status: TaskStatus,
    /// Canonical display casing of the assignee's username.
    pub assigned_user: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: u64,
        description: impl Into<String>,
        category: impl Into<String>,
        assigned_user: impl Into<String>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            category: category.into(),
            status: TaskStatus::Pending,
            assigned_user: assigned_user.into(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition Pending -> Completed, stamping the completion time.
    ///
    /// Completed is terminal; calling this on an already-completed task is a
    /// caller bug surfaced as [`Error::AlreadyCompleted`]. The store checks
    /// status under its write lock before calling, so the error never escapes
    /// store operations.
    pub fn mark_completed(&mut self) -> Result<()> {
        if self.status == TaskStatus::Completed {
            return Err(Error::AlreadyCompleted(self.id));
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. [{}] {} (Category: {}) - assigned to {} (created {}",
            self.id,
            self.status.display_name(),
            self.description,
            self.category,
            self.assigned_user,
            self.created_at.format("%Y-%m-%d %H:%M"),
        )?;
        if let Some(completed_at) = self.completed_at {
            write!(f, ", completed {}", completed_at.format("%Y-%m-%d %H:%M"))?;
        }
        write!(f, ")")
    }
}
