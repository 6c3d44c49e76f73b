/// Storage layer for persisting habit data
///
/// This module owns the durable habit/task state. It provides the
/// repository interface all mutations funnel through, the SQLite
/// implementation, and the schema migrator.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteRepository;

use thiserror::Error;

use crate::domain::{Habit, HabitTask};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// A schema migration step failed to apply. Fatal at startup: the
    /// store must not be opened for reads or writes.
    #[error("schema migration failed: {0}")]
    Migration(String),

    /// Update/delete was called on a value that was never persisted.
    /// This is a caller bug, not a storage condition.
    #[error("missing id on {entity}: value has not been persisted yet")]
    MissingId { entity: &'static str },

    #[error("habit not found: {habit_id}")]
    HabitNotFound { habit_id: i64 },

    #[error("task not found: {task_id} under habit {habit_id}")]
    TaskNotFound { task_id: i64, habit_id: i64 },
}

/// Interface for the durable habit store
///
/// All mutations funnel through this trait; it also keeps the SQLite
/// engine swappable behind a narrow seam. Deleting a row that is already
/// gone is a successful no-op, never an error.
pub trait HabitRepository {
    /// Insert a habit and its tasks, returning the persisted form with
    /// assigned ids and server-set timestamps.
    fn create_habit(&mut self, habit: &Habit) -> Result<Habit, StorageError>;

    /// All habits, newest first, with tasks eagerly populated in
    /// creation order.
    fn list_habits(&self) -> Result<Vec<Habit>, StorageError>;

    /// Overwrite all scalar fields and reconcile the task set.
    fn update_habit(&mut self, habit: &Habit) -> Result<(), StorageError>;

    /// Delete a habit and everything it owns.
    fn delete_habit(&mut self, habit: &Habit) -> Result<(), StorageError>;

    /// Insert one task under an existing habit.
    fn add_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<HabitTask, StorageError>;

    /// Update title/completion for the task matching both ids.
    fn update_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<(), StorageError>;

    /// Delete the task matching both ids; returns how many rows were
    /// actually removed (0 or 1).
    fn delete_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<usize, StorageError>;
}
