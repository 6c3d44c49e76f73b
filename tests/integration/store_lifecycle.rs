/// End-to-end tests over the public store API against temp-file databases
///
/// Where an invariant is about raw rows (cascade deletes, id reuse), a
/// second connection inspects the file directly.
use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::NamedTempFile;

use habify_core::{default_reminder_time, Habit, HabitStore, HabitTask, StorageError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_store() -> (NamedTempFile, HabitStore) {
    let tmp = NamedTempFile::new().expect("failed to create temp file");
    let store = HabitStore::open(tmp.path()).expect("failed to open store");
    (tmp, store)
}

fn reading_habit() -> Habit {
    Habit::new(
        "Read".to_string(),
        "30 min/day".to_string(),
        date(2024, 1, 1),
        date(2024, 1, 31),
    )
    .unwrap()
}

fn habit_by_id(store: &HabitStore, id: i64) -> Habit {
    store
        .habits()
        .iter()
        .find(|h| h.id == Some(id))
        .cloned()
        .expect("habit should be in the cache")
}

#[test]
fn round_trip_create_then_list() {
    let (_tmp, mut store) = new_store();

    let mut habit = reading_habit();
    habit.reminder_enabled = true;
    habit.reminder_time = chrono::NaiveTime::from_hms_opt(7, 30, 0).unwrap();

    let created = store.create_habit(&habit).unwrap();
    assert!(created.id.is_some());

    let habits = store.habits();
    assert_eq!(habits.len(), 1);

    let loaded = &habits[0];
    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.title, habit.title);
    assert_eq!(loaded.description, habit.description);
    assert_eq!(loaded.start_date, habit.start_date);
    assert_eq!(loaded.end_date, habit.end_date);
    assert!(loaded.reminder_enabled);
    assert_eq!(loaded.reminder_time, habit.reminder_time);
    assert!(loaded.tasks.is_empty());
}

#[test]
fn create_persists_tasks_carried_by_the_habit() {
    let (_tmp, mut store) = new_store();

    let mut habit = reading_habit();
    habit.tasks = vec![
        HabitTask::new("Pick a book".to_string()).unwrap(),
        HabitTask::new("Read chapter 1".to_string()).unwrap(),
    ];

    let created = store.create_habit(&habit).unwrap();
    assert_eq!(created.tasks.len(), 2);
    assert!(created.tasks.iter().all(|t| t.id.is_some()));
    assert_eq!(created.tasks[0].title, "Pick a book");
    assert_eq!(created.tasks[1].title, "Read chapter 1");
}

#[test]
fn list_orders_newest_first() {
    let (_tmp, mut store) = new_store();

    let first = store.create_habit(&reading_habit()).unwrap();
    let mut second = reading_habit();
    second.title = "Run".to_string();
    let second = store.create_habit(&second).unwrap();

    let habits = store.habits();
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0].id, second.id);
    assert_eq!(habits[1].id, first.id);
}

#[test]
fn tasks_load_in_creation_order() {
    let (_tmp, mut store) = new_store();
    let habit = store.create_habit(&reading_habit()).unwrap();
    let habit_id = habit.id.unwrap();

    for title in ["first", "second", "third"] {
        let task = HabitTask::new(title.to_string()).unwrap();
        store.add_task(&task, habit_id).unwrap();
    }

    let loaded = habit_by_id(&store, habit_id);
    let titles: Vec<&str> = loaded.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second", "third"]);
}

#[test]
fn scenario_read_habit() {
    // The spec walk-through: a January reading habit, two tasks, one done
    let (tmp, mut store) = new_store();

    let habit = store.create_habit(&reading_habit()).unwrap();
    let habit_id = habit.id.unwrap();
    assert_eq!(habit.days_remaining(date(2024, 1, 10)), 21);

    store
        .add_task(&HabitTask::new("Pick a book".to_string()).unwrap(), habit_id)
        .unwrap();
    store
        .add_task(&HabitTask::new("Read chapter 1".to_string()).unwrap(), habit_id)
        .unwrap();

    let loaded = habit_by_id(&store, habit_id);
    let mut done = loaded.tasks[0].clone();
    done.is_completed = true;
    store.update_task(&done, habit_id).unwrap();

    let loaded = habit_by_id(&store, habit_id);
    assert_eq!(loaded.progress_percentage(), 0.5);

    store.delete_habit(&loaded).unwrap();
    assert!(store.habits().is_empty());

    let conn = Connection::open(tmp.path()).unwrap();
    let task_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM habit_tasks WHERE habit_id = ?1",
            [habit_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(task_rows, 0);
}

#[test]
fn delete_cascades_to_all_owned_tasks() {
    let (tmp, mut store) = new_store();

    let habit = store.create_habit(&reading_habit()).unwrap();
    let habit_id = habit.id.unwrap();
    for i in 0..5 {
        store
            .add_task(&HabitTask::new(format!("task {i}")).unwrap(), habit_id)
            .unwrap();
    }

    let loaded = habit_by_id(&store, habit_id);
    store.delete_habit(&loaded).unwrap();

    let conn = Connection::open(tmp.path()).unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM habit_tasks", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn update_overwrites_scalars_and_preserves_task_identity() {
    let (_tmp, mut store) = new_store();

    let habit = store.create_habit(&reading_habit()).unwrap();
    let habit_id = habit.id.unwrap();
    store
        .add_task(&HabitTask::new("keep me".to_string()).unwrap(), habit_id)
        .unwrap();
    store
        .add_task(&HabitTask::new("drop me".to_string()).unwrap(), habit_id)
        .unwrap();

    let before = habit_by_id(&store, habit_id);
    let kept_id = before.tasks[0].id;
    let kept_created_at = before.tasks[0].created_at;

    // Edit the habit: retitle, drop the second task, add a third
    let mut edited = before.clone();
    edited.title = "Read more".to_string();
    edited.tasks.remove(1);
    edited
        .tasks
        .push(HabitTask::new("new arrival".to_string()).unwrap());
    store.update_habit(&edited).unwrap();

    let after = habit_by_id(&store, habit_id);
    assert_eq!(after.title, "Read more");
    assert_eq!(after.tasks.len(), 2);

    let kept = after
        .tasks
        .iter()
        .find(|t| t.title == "keep me")
        .expect("surviving task");
    assert_eq!(kept.id, kept_id);
    assert_eq!(kept.created_at, kept_created_at);

    assert!(after.tasks.iter().all(|t| t.title != "drop me"));
    assert!(after.tasks.iter().any(|t| t.title == "new arrival"));
}

#[test]
fn update_without_id_is_a_caller_bug() {
    let (_tmp, mut store) = new_store();
    let unpersisted = reading_habit();

    let result = store.update_habit(&unpersisted);
    assert!(matches!(result, Err(StorageError::MissingId { .. })));
}

#[test]
fn update_of_vanished_habit_reports_not_found() {
    let (_tmp, mut store) = new_store();

    let habit = store.create_habit(&reading_habit()).unwrap();
    store.delete_habit(&habit).unwrap();

    let result = store.update_habit(&habit);
    assert!(matches!(result, Err(StorageError::HabitNotFound { .. })));
}

#[test]
fn deleting_a_missing_habit_is_a_noop() {
    let (_tmp, mut store) = new_store();

    let habit = store.create_habit(&reading_habit()).unwrap();
    store.delete_habit(&habit).unwrap();

    // Already gone: success, not an error
    assert!(store.delete_habit(&habit).is_ok());
}

#[test]
fn add_task_to_missing_habit_fails_via_foreign_key() {
    let (_tmp, mut store) = new_store();

    let task = HabitTask::new("orphan".to_string()).unwrap();
    let result = store.add_task(&task, 4242);
    assert!(matches!(
        result,
        Err(StorageError::HabitNotFound { habit_id: 4242 })
    ));
}

#[test]
fn task_updates_cannot_cross_habits() {
    let (_tmp, mut store) = new_store();

    let habit_a = store.create_habit(&reading_habit()).unwrap();
    let mut other = reading_habit();
    other.title = "Run".to_string();
    let habit_b = store.create_habit(&other).unwrap();

    let a_id = habit_a.id.unwrap();
    let b_id = habit_b.id.unwrap();
    store
        .add_task(&HabitTask::new("a task".to_string()).unwrap(), a_id)
        .unwrap();
    store
        .add_task(&HabitTask::new("b task".to_string()).unwrap(), b_id)
        .unwrap();

    // Take A's task but claim it belongs to B
    let mut stray = habit_by_id(&store, a_id).tasks[0].clone();
    stray.is_completed = true;
    let result = store.update_task(&stray, b_id);
    assert!(matches!(result, Err(StorageError::TaskNotFound { .. })));

    // Neither habit's tasks changed
    assert!(!habit_by_id(&store, a_id).tasks[0].is_completed);
    assert!(!habit_by_id(&store, b_id).tasks[0].is_completed);

    // Same guard on delete: no rows match, nothing removed
    let stray = habit_by_id(&store, a_id).tasks[0].clone();
    assert_eq!(store.delete_task(&stray, b_id).unwrap(), 0);
    assert_eq!(habit_by_id(&store, a_id).tasks.len(), 1);
}

#[test]
fn delete_task_reports_rows_removed() {
    let (_tmp, mut store) = new_store();

    let habit = store.create_habit(&reading_habit()).unwrap();
    let habit_id = habit.id.unwrap();
    let task = store
        .add_task(&HabitTask::new("once".to_string()).unwrap(), habit_id)
        .unwrap();

    assert_eq!(store.delete_task(&task, habit_id).unwrap(), 1);
    assert_eq!(store.delete_task(&task, habit_id).unwrap(), 0);
}

#[test]
fn ids_are_never_reused_after_deletion() {
    let (_tmp, mut store) = new_store();

    let first = store.create_habit(&reading_habit()).unwrap();
    let first_id = first.id.unwrap();
    store.delete_habit(&first).unwrap();

    let second = store.create_habit(&reading_habit()).unwrap();
    assert!(second.id.unwrap() > first_id);
}

#[test]
fn data_survives_reopen() {
    let tmp = NamedTempFile::new().expect("failed to create temp file");

    {
        let mut store = HabitStore::open(tmp.path()).unwrap();
        let habit = store.create_habit(&reading_habit()).unwrap();
        store
            .add_task(
                &HabitTask::new("persisted".to_string()).unwrap(),
                habit.id.unwrap(),
            )
            .unwrap();
        store.close().unwrap();
    }

    let store = HabitStore::open(tmp.path()).unwrap();
    let habits = store.habits();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].title, "Read");
    assert_eq!(habits[0].tasks.len(), 1);
}

#[test]
fn marker_less_legacy_database_upgrades_in_place() {
    let tmp = NamedTempFile::new().expect("failed to create temp file");

    // A database written before version tracking: habits table only
    {
        let conn = Connection::open(tmp.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE habits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            INSERT INTO habits (title, description, start_date, end_date, created_at, updated_at)
            VALUES ('Stretch', 'legacy row', '2024-01-01', '2024-01-31',
                    '2024-01-01T08:00:00+00:00', '2024-01-01T08:00:00+00:00');",
        )
        .unwrap();
    }

    let mut store = HabitStore::open(tmp.path()).unwrap();
    let habits = store.habits();
    assert_eq!(habits.len(), 1);

    let legacy = &habits[0];
    assert_eq!(legacy.title, "Stretch");
    assert!(!legacy.reminder_enabled);
    assert_eq!(legacy.reminder_time, default_reminder_time());
    assert!(legacy.tasks.is_empty());

    // The upgraded schema is fully writable, tasks table included
    store
        .add_task(
            &HabitTask::new("post-upgrade".to_string()).unwrap(),
            legacy.id.unwrap(),
        )
        .unwrap();
    assert_eq!(store.habits()[0].tasks.len(), 1);
}

#[test]
fn reminder_schedule_lists_enabled_habits_only() {
    let (_tmp, mut store) = new_store();

    let mut with_reminder = reading_habit();
    with_reminder.reminder_enabled = true;
    with_reminder.reminder_time = chrono::NaiveTime::from_hms_opt(6, 45, 0).unwrap();
    let with_reminder = store.create_habit(&with_reminder).unwrap();

    store.create_habit(&reading_habit()).unwrap();

    let schedule = store.reminder_schedule();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].habit_id, with_reminder.id.unwrap());
    assert_eq!(schedule[0].title, "Read");
    assert_eq!(
        schedule[0].time,
        chrono::NaiveTime::from_hms_opt(6, 45, 0).unwrap()
    );
}
