/// Domain module containing the core entities and their business rules
///
/// This module defines Habit and HabitTask along with the validation that
/// callers run before handing values to the storage layer, and the pure
/// derived-state calculations (status, progress, days remaining).

pub mod habit;
pub mod status;
pub mod task;

// Re-export public types for easy access
pub use habit::*;
pub use status::*;
pub use task::*;

use thiserror::Error;

/// Errors that can occur during domain validation
///
/// The storage layer never re-checks business rules; these errors are
/// raised at construction time, on the caller's side.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid title: {0}")]
    InvalidTitle(String),

    #[error("invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}
