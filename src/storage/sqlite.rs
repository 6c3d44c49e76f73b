/// SQLite implementation of the habit repository
///
/// Owns the single long-lived connection, runs migrations on open, and
/// implements every repository operation. Dates go to disk as ISO-8601
/// text through rusqlite's chrono support; `reminder_time` is persisted
/// as a full instant of which only the time of day is read back.

use std::path::Path;

use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::domain::{default_reminder_time, Habit, HabitTask};
use crate::storage::{migrations, HabitRepository, StorageError};

const HABIT_COLUMNS: &str = "id, title, description, start_date, end_date, \
                             created_at, updated_at, reminder_enabled, reminder_time";

/// SQLite-backed repository
///
/// One instance holds one connection, opened at init and closed by
/// [`SqliteRepository::close`]. Mutations take `&mut self`, so there is
/// exactly one writer by construction.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open the database file, enable foreign keys, and migrate
    ///
    /// A failed migration aborts here; the repository never serves an
    /// inconsistent schema.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(format!("failed to open database: {e}")))?;
        let repo = Self::init(conn)?;
        tracing::info!("sqlite store ready at {}", db_path.display());
        Ok(repo)
    }

    /// In-memory database, mainly for tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open database: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| StorageError::Connection(format!("failed to enable foreign keys: {e}")))?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Release the connection handle
    pub fn close(self) -> Result<(), StorageError> {
        self.conn
            .close()
            .map_err(|(_, e)| StorageError::Connection(format!("failed to close database: {e}")))
    }

    fn get_habit(&self, habit_id: i64) -> Result<Habit, StorageError> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1");
        let result = self
            .conn
            .query_row(&sql, [habit_id], Self::habit_from_row);

        match result {
            Ok(mut habit) => {
                habit.tasks = self.tasks_for_habit(habit_id)?;
                Ok(habit)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(StorageError::HabitNotFound { habit_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn tasks_for_habit(&self, habit_id: i64) -> Result<Vec<HabitTask>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, is_completed, created_at, updated_at
             FROM habit_tasks WHERE habit_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let tasks = stmt
            .query_map([habit_id], Self::task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn habit_from_row(row: &Row<'_>) -> Result<Habit, rusqlite::Error> {
        let reminder_instant: Option<DateTime<Utc>> = row.get(8)?;

        Ok(Habit::from_existing(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(7)?,
            reminder_instant
                .map(|dt| dt.time())
                .unwrap_or_else(default_reminder_time),
            row.get(5)?,
            row.get(6)?,
            Vec::new(),
        ))
    }

    fn task_from_row(row: &Row<'_>) -> Result<HabitTask, rusqlite::Error> {
        Ok(HabitTask::from_existing(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn insert_task(
        conn: &Connection,
        task: &HabitTask,
        habit_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, rusqlite::Error> {
        conn.execute(
            "INSERT INTO habit_tasks (habit_id, title, is_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![habit_id, task.title, task.is_completed, task.created_at, now],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl HabitRepository for SqliteRepository {
    /// Insert a habit and its tasks in one transaction
    ///
    /// Timestamps are assigned here, not taken from the caller, and the
    /// fully persisted form is reloaded so the returned value carries
    /// every id the store handed out.
    fn create_habit(&mut self, habit: &Habit) -> Result<Habit, StorageError> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO habits (title, description, start_date, end_date,
                                 created_at, updated_at, reminder_enabled, reminder_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                habit.title,
                habit.description,
                habit.start_date,
                habit.end_date,
                now,
                now,
                habit.reminder_enabled,
                reminder_instant(habit.reminder_time, now),
            ],
        )?;
        let habit_id = tx.last_insert_rowid();

        for task in &habit.tasks {
            Self::insert_task(&tx, task, habit_id, now)?;
        }

        tx.commit()?;
        tracing::debug!("created habit {habit_id} ({})", habit.title);

        self.get_habit(habit_id)
    }

    /// All habits, most recently created first, tasks eagerly loaded
    fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY created_at DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let habits = stmt
            .query_map([], Self::habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut loaded = Vec::with_capacity(habits.len());
        for mut habit in habits {
            if let Some(id) = habit.id {
                habit.tasks = self.tasks_for_habit(id)?;
            }
            loaded.push(habit);
        }

        Ok(loaded)
    }

    /// Overwrite scalar fields and reconcile the task set, atomically
    ///
    /// Tasks that still carry ids are updated in place, id-less ones are
    /// inserted, and rows absent from the submitted set are deleted, so
    /// task identity and `created_at` survive habit edits. A crash can
    /// never leave the habit with a half-replaced task list.
    fn update_habit(&mut self, habit: &Habit) -> Result<(), StorageError> {
        let habit_id = habit.id.ok_or(StorageError::MissingId { entity: "habit" })?;
        let now = Utc::now();
        let tx = self.conn.transaction()?;

        let rows = tx.execute(
            "UPDATE habits SET
                title = ?2,
                description = ?3,
                start_date = ?4,
                end_date = ?5,
                updated_at = ?6,
                reminder_enabled = ?7,
                reminder_time = ?8
             WHERE id = ?1",
            params![
                habit_id,
                habit.title,
                habit.description,
                habit.start_date,
                habit.end_date,
                now,
                habit.reminder_enabled,
                reminder_instant(habit.reminder_time, now),
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::HabitNotFound { habit_id });
        }

        // Drop rows the caller no longer has, then upsert the rest
        let kept: Vec<i64> = habit.tasks.iter().filter_map(|t| t.id).collect();
        if kept.is_empty() {
            tx.execute("DELETE FROM habit_tasks WHERE habit_id = ?1", [habit_id])?;
        } else {
            let placeholders = vec!["?"; kept.len()].join(", ");
            let sql = format!(
                "DELETE FROM habit_tasks WHERE habit_id = ? AND id NOT IN ({placeholders})"
            );
            tx.execute(
                &sql,
                params_from_iter(std::iter::once(habit_id).chain(kept.iter().copied())),
            )?;
        }

        for task in &habit.tasks {
            match task.id {
                Some(task_id) => {
                    let rows = tx.execute(
                        "UPDATE habit_tasks SET title = ?3, is_completed = ?4, updated_at = ?5
                         WHERE id = ?1 AND habit_id = ?2",
                        params![task_id, habit_id, task.title, task.is_completed, now],
                    )?;
                    if rows == 0 {
                        return Err(StorageError::TaskNotFound { task_id, habit_id });
                    }
                }
                None => {
                    Self::insert_task(&tx, task, habit_id, now)?;
                }
            }
        }

        tx.commit()?;
        tracing::debug!("updated habit {habit_id} ({})", habit.title);
        Ok(())
    }

    /// Delete a habit and its tasks; already-gone ids are a no-op
    fn delete_habit(&mut self, habit: &Habit) -> Result<(), StorageError> {
        let habit_id = habit.id.ok_or(StorageError::MissingId { entity: "habit" })?;
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM habit_tasks WHERE habit_id = ?1", [habit_id])?;
        let rows = tx.execute("DELETE FROM habits WHERE id = ?1", [habit_id])?;

        tx.commit()?;
        tracing::debug!("deleted habit {habit_id} ({rows} row(s))");
        Ok(())
    }

    /// Insert one task under an existing habit
    ///
    /// The foreign key enforces habit existence; a constraint violation
    /// surfaces as `HabitNotFound` rather than an application-side check.
    fn add_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<HabitTask, StorageError> {
        let now = Utc::now();
        match Self::insert_task(&self.conn, task, habit_id, now) {
            Ok(task_id) => {
                tracing::debug!("added task {task_id} to habit {habit_id}");
                Ok(HabitTask::from_existing(
                    task_id,
                    task.title.clone(),
                    task.is_completed,
                    task.created_at,
                    now,
                ))
            }
            Err(e) if is_foreign_key_violation(&e) => {
                Err(StorageError::HabitNotFound { habit_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Update the task matching both the task id and the owning habit id
    ///
    /// Matching on both keys keeps a stale or hostile habit id from
    /// touching another habit's tasks.
    fn update_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<(), StorageError> {
        let task_id = task.id.ok_or(StorageError::MissingId { entity: "task" })?;
        let now = Utc::now();

        let rows = self.conn.execute(
            "UPDATE habit_tasks SET title = ?3, is_completed = ?4, updated_at = ?5
             WHERE id = ?1 AND habit_id = ?2",
            params![task_id, habit_id, task.title, task.is_completed, now],
        )?;
        if rows == 0 {
            return Err(StorageError::TaskNotFound { task_id, habit_id });
        }

        tracing::debug!("updated task {task_id} under habit {habit_id}");
        Ok(())
    }

    /// Delete the task matching both ids; reports rows actually removed
    fn delete_task(&mut self, task: &HabitTask, habit_id: i64) -> Result<usize, StorageError> {
        let task_id = task.id.ok_or(StorageError::MissingId { entity: "task" })?;

        let rows = self.conn.execute(
            "DELETE FROM habit_tasks WHERE id = ?1 AND habit_id = ?2",
            params![task_id, habit_id],
        )?;

        tracing::debug!("deleted task {task_id} under habit {habit_id} ({rows} row(s))");
        Ok(rows)
    }
}

/// Encode a reminder time as a full instant on today's date
///
/// Only the hour/minute are meaningful; persisting a complete timestamp
/// keeps the column format uniform with the other datetime columns.
fn reminder_instant(time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(time).and_utc()
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
