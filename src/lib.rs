/// Public library interface for the Habify persistence engine
///
/// This crate is the local persistence and habit-state core of the app:
/// durable storage of habits and their checklist tasks, schema evolution
/// across app versions, derived progress/status computation, and an
/// observable in-memory cache the presentation layer reads from.

use std::path::Path;

use chrono::NaiveTime;
use tokio::sync::watch;

// Internal modules
mod cache;
mod domain;
mod storage;

// Re-export public modules and types
pub use cache::{HabitCache, HabitSnapshot};
pub use domain::*;
pub use storage::{HabitRepository, SqliteRepository, StorageError};

/// One reminder the platform scheduler should arm
///
/// The core only supplies the data; scheduling and rendering the
/// notification belong to the platform layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderEntry {
    pub habit_id: i64,
    pub title: String,
    pub time: NaiveTime,
}

/// The habit store: repository + observable cache, explicitly constructed
///
/// Replaces the app's old process-wide singletons. Opening runs the
/// schema migrations and the initial load; every mutation persists
/// through the repository and then republishes the full list so
/// observers always see consistent state. `close` tears the connection
/// down explicitly.
pub struct HabitStore {
    repo: SqliteRepository,
    cache: HabitCache,
}

impl HabitStore {
    /// Open (or create) the database at `db_path`, migrate, and load
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        Self::from_repository(SqliteRepository::open(db_path)?)
    }

    /// In-memory store for tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_repository(SqliteRepository::open_in_memory()?)
    }

    fn from_repository(repo: SqliteRepository) -> Result<Self, StorageError> {
        let store = Self {
            repo,
            cache: HabitCache::new(),
        };
        store.refresh()?;
        tracing::info!("habit store opened with {} habit(s)", store.habits().len());
        Ok(store)
    }

    /// Close the underlying connection
    pub fn close(self) -> Result<(), StorageError> {
        self.repo.close()
    }

    /// Cached snapshot of all habits, newest first
    pub fn habits(&self) -> HabitSnapshot {
        self.cache.current()
    }

    /// Change-notification receiver for presentation code
    pub fn subscribe(&self) -> watch::Receiver<HabitSnapshot> {
        self.cache.subscribe()
    }

    /// Reload the full list from storage and republish it
    ///
    /// On failure the previous snapshot is retained and the error is
    /// returned to the caller.
    pub fn refresh(&self) -> Result<(), StorageError> {
        let habits = self.repo.list_habits()?;
        self.cache.publish(habits);
        Ok(())
    }

    /// Persist a new habit (with any tasks it already carries)
    pub fn create_habit(&mut self, habit: &Habit) -> Result<Habit, StorageError> {
        let created = self.repo.create_habit(habit)?;
        self.refresh()?;
        Ok(created)
    }

    /// Overwrite an existing habit and reconcile its task set
    pub fn update_habit(&mut self, habit: &Habit) -> Result<(), StorageError> {
        self.repo.update_habit(habit)?;
        self.refresh()
    }

    /// Delete a habit and everything it owns
    pub fn delete_habit(&mut self, habit: &Habit) -> Result<(), StorageError> {
        self.repo.delete_habit(habit)?;
        self.refresh()
    }

    /// Add one task under an existing habit
    pub fn add_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<HabitTask, StorageError> {
        let added = self.repo.add_task(task, habit_id)?;
        self.refresh()?;
        Ok(added)
    }

    /// Update one task under its owning habit
    pub fn update_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<(), StorageError> {
        self.repo.update_task(task, habit_id)?;
        self.refresh()
    }

    /// Delete one task; returns how many rows were removed
    ///
    /// When nothing matched there is nothing to reload, so observers are
    /// not re-notified.
    pub fn delete_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<usize, StorageError> {
        let removed = self.repo.delete_task(task, habit_id)?;
        if removed > 0 {
            self.refresh()?;
        }
        Ok(removed)
    }

    /// Reminder data for the platform notification scheduler
    ///
    /// One entry per reminder-enabled habit, in cache order.
    pub fn reminder_schedule(&self) -> Vec<ReminderEntry> {
        self.habits()
            .iter()
            .filter(|h| h.reminder_enabled)
            .filter_map(|h| {
                h.id.map(|id| ReminderEntry {
                    habit_id: id,
                    title: h.title.clone(),
                    time: h.reminder_time,
                })
            })
            .collect()
    }

    /// Direct repository access (useful for tests)
    pub fn repository(&mut self) -> &mut SqliteRepository {
        &mut self.repo
    }
}
