/// HabitTask entity for checklist items under a habit
///
/// A task belongs to exactly one habit, referenced by id in storage, and
/// is what progress is computed from. `created_at` is set once when the
/// task is created and never mutated; the task list of a habit is always
/// ordered by it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A single checklist item owned by one habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitTask {
    /// Surrogate key assigned by the store on insert
    pub id: Option<i64>,
    /// Short label for the task
    pub title: String,
    /// Whether the user has checked this task off
    pub is_completed: bool,
    /// Set once at creation, never mutated
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl HabitTask {
    /// Create a new, not-yet-persisted task with validation
    pub fn new(title: String) -> Result<Self, DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::InvalidTitle(
                "task title cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: None,
            title,
            is_completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstruct a task from already-persisted data
    pub fn from_existing(
        id: i64,
        title: String,
        is_completed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            title,
            is_completed,
            created_at,
            updated_at,
        }
    }

    /// Flip the completion state
    pub fn toggle(&mut self) {
        self.is_completed = !self.is_completed;
    }
}
