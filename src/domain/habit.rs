/// Habit entity and related functionality
///
/// This module defines the core Habit struct: a goal tracked over a date
/// window, optionally decomposed into checklist tasks. Validation happens
/// here, before a habit ever reaches the repository.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HabitTask};

/// A habit the user wants to build over a bounded date range
///
/// `id` is `None` until the repository persists the habit and assigns a
/// surrogate key; it never changes afterwards. The `tasks` vec is owned
/// exclusively by this habit and is loaded eagerly alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Surrogate key assigned by the store on insert
    pub id: Option<i64>,
    /// Display name (e.g., "Read", "Morning Run")
    pub title: String,
    /// Free-form description, may be empty
    pub description: String,
    /// First day of the tracking window (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the tracking window (inclusive)
    pub end_date: NaiveDate,
    /// Whether a daily reminder should be scheduled for this habit
    pub reminder_enabled: bool,
    /// Time of day for the reminder; only meaningful when enabled
    pub reminder_time: NaiveTime,
    /// When this habit was persisted (server-assigned)
    pub created_at: DateTime<Utc>,
    /// Last modification time (server-assigned)
    pub updated_at: DateTime<Utc>,
    /// Checklist tasks owned by this habit, ordered by creation time
    pub tasks: Vec<HabitTask>,
}

impl Habit {
    /// Create a new, not-yet-persisted habit with validation
    ///
    /// The title must be non-empty after trimming and the end date must
    /// not precede the start date. Reminders default to off at 09:00.
    pub fn new(
        title: String,
        description: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, DomainError> {
        Self::validate_title(&title)?;
        Self::validate_dates(start_date, end_date)?;

        let now = Utc::now();
        Ok(Self {
            id: None,
            title,
            description,
            start_date,
            end_date,
            reminder_enabled: false,
            reminder_time: default_reminder_time(),
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        })
    }

    /// Reconstruct a habit from already-persisted data
    ///
    /// Used by the storage layer when loading rows; assumes the data was
    /// validated when it was first written.
    pub fn from_existing(
        id: i64,
        title: String,
        description: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reminder_enabled: bool,
        reminder_time: NaiveTime,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        tasks: Vec<HabitTask>,
    ) -> Self {
        Self {
            id: Some(id),
            title,
            description,
            start_date,
            end_date,
            reminder_enabled,
            reminder_time,
            created_at,
            updated_at,
            tasks,
        }
    }

    /// Validate a replacement title/date set before an update
    ///
    /// Edit flows mutate the public fields directly; calling this first
    /// keeps the same rules as `new` without rebuilding the value.
    pub fn validate(&self) -> Result<(), DomainError> {
        Self::validate_title(&self.title)?;
        Self::validate_dates(self.start_date, self.end_date)
    }

    fn validate_title(title: &str) -> Result<(), DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::InvalidTitle(
                "habit title cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_dates(start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
        if end < start {
            return Err(DomainError::InvalidDateRange { start, end });
        }
        Ok(())
    }
}

/// Default reminder time of day (09:00)
pub fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}
