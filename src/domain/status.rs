/// Derived habit state: status, progress, and days remaining
///
/// Everything here is a pure function over a Habit value. Nothing is
/// stored; the presentation layer calls these on read. `today` is always
/// a parameter so the calculations stay deterministic and unit-testable
/// without any clock or storage dependency.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Habit;

/// Where a habit sits relative to its date window on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HabitStatus {
    /// Today is before the start date
    Upcoming,
    /// Today falls inside the inclusive start..=end window
    Active,
    /// Today is past the end date
    Completed,
}

impl HabitStatus {
    /// Display label matching the card badges in the app
    pub fn label(&self) -> &'static str {
        match self {
            HabitStatus::Upcoming => "Upcoming",
            HabitStatus::Active => "Active",
            HabitStatus::Completed => "Ended",
        }
    }
}

impl Habit {
    /// True iff `today` falls within the habit's inclusive date window
    ///
    /// Date-only comparison; time of day never enters into it.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.end_date
    }

    /// Classify the habit against `today`
    pub fn status(&self, today: NaiveDate) -> HabitStatus {
        if today < self.start_date {
            HabitStatus::Upcoming
        } else if today > self.end_date {
            HabitStatus::Completed
        } else {
            HabitStatus::Active
        }
    }

    /// Whole calendar days from `today` until the end date, never negative
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days().max(0)
    }

    /// Fraction of tasks completed, in [0.0, 1.0]
    ///
    /// A habit with no tasks reports 0.0. Task-based progress replaced
    /// the old elapsed-date ratio entirely.
    pub fn progress_percentage(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }

        let completed = self.tasks.iter().filter(|t| t.is_completed).count();
        completed as f64 / self.tasks.len() as f64
    }
}
