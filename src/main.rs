/// CLI host for the Habify persistence engine
///
/// A thin presentation-layer stand-in: it constructs the store, calls
/// the repository operations, and renders the cached list. Business
/// validation (titles, date ordering) happens here, on the caller side,
/// before anything reaches storage. The today/week/month filters operate
/// on the full cached list, client-side.

use std::path::PathBuf;

use chrono::{Datelike, Local, Months, NaiveDate, NaiveTime, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use habify_core::{Habit, HabitStore, HabitTask};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's data directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new habit
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// First day of the tracking window (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the tracking window (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Enable a daily reminder at the given time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        reminder: Option<NaiveTime>,
    },
    /// List habits with status, progress, and days remaining
    List {
        /// Restrict to habits overlapping today, this week, or this month
        #[arg(long, value_enum, default_value = "all")]
        when: When,
        /// Emit the list as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one habit with its task checklist
    Show { id: i64 },
    /// Edit fields of an existing habit
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Turn the daily reminder on or off
        #[arg(long)]
        reminder: Option<bool>,
        /// Change the reminder time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        reminder_time: Option<NaiveTime>,
    },
    /// Delete a habit and its tasks
    Remove { id: i64 },
    /// Manage a habit's checklist tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Print the (habit, time) pairs a notification scheduler would arm
    Reminders,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// Add a task under a habit
    Add { habit_id: i64, title: String },
    /// Flip a task's completion state
    Toggle { habit_id: i64, task_id: i64 },
    /// Remove a task from a habit
    Remove { habit_id: i64, task_id: i64 },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum When {
    Today,
    Week,
    Month,
    All,
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("invalid time '{s}': {e}"))
}

/// Default database location, preferring the platform data directory
fn default_database_path() -> Result<PathBuf, std::io::Error> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let dir = base.join("habify");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("habits.db"))
}

fn matches_filter(habit: &Habit, when: When, today: NaiveDate) -> bool {
    match when {
        When::All => true,
        When::Today => habit.is_active(today),
        When::Week => {
            let week = today.week(Weekday::Mon);
            habit.start_date <= week.last_day() && habit.end_date >= week.first_day()
        }
        When::Month => {
            let first = today.with_day(1).unwrap_or(today);
            let last = (first + Months::new(1)).pred_opt().unwrap_or(first);
            habit.start_date <= last && habit.end_date >= first
        }
    }
}

fn find_habit(store: &HabitStore, id: i64) -> Option<Habit> {
    store.habits().iter().find(|h| h.id == Some(id)).cloned()
}

fn print_habit_line(habit: &Habit, today: NaiveDate) {
    println!(
        "{:>4}  {:<24} {:<9} {:>4.0}%  {:>3}d left  {} → {}",
        habit.id.unwrap_or_default(),
        habit.title,
        habit.status(today).label(),
        habit.progress_percentage() * 100.0,
        habit.days_remaining(today),
        habit.start_date,
        habit.end_date,
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("habify_core={log_level},habify={log_level}"))
        .with_writer(std::io::stderr)
        .init();

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => default_database_path()?,
    };

    info!("using database at {}", db_path.display());
    let mut store = HabitStore::open(&db_path)?;
    let today = Local::now().date_naive();

    match args.command {
        Command::Add {
            title,
            description,
            start,
            end,
            reminder,
        } => {
            let mut habit = Habit::new(title, description, start, end)?;
            if let Some(time) = reminder {
                habit.reminder_enabled = true;
                habit.reminder_time = time;
            }
            let created = store.create_habit(&habit)?;
            println!(
                "created habit {} ({})",
                created.id.unwrap_or_default(),
                created.title
            );
        }

        Command::List { when, json } => {
            let habits = store.habits();
            let filtered: Vec<&Habit> = habits
                .iter()
                .filter(|h| matches_filter(h, when, today))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&filtered)?);
            } else if filtered.is_empty() {
                println!("no habits");
            } else {
                for habit in filtered {
                    print_habit_line(habit, today);
                }
            }
        }

        Command::Show { id } => match find_habit(&store, id) {
            Some(habit) => {
                print_habit_line(&habit, today);
                if !habit.description.is_empty() {
                    println!("      {}", habit.description);
                }
                if habit.reminder_enabled {
                    println!("      reminder at {}", habit.reminder_time.format("%H:%M"));
                }
                for task in &habit.tasks {
                    let mark = if task.is_completed { "x" } else { " " };
                    println!("      [{mark}] {:>4}  {}", task.id.unwrap_or_default(), task.title);
                }
            }
            None => println!("habit {id} not found"),
        },

        Command::Edit {
            id,
            title,
            description,
            start,
            end,
            reminder,
            reminder_time,
        } => match find_habit(&store, id) {
            Some(mut habit) => {
                if let Some(title) = title {
                    habit.title = title;
                }
                if let Some(description) = description {
                    habit.description = description;
                }
                if let Some(start) = start {
                    habit.start_date = start;
                }
                if let Some(end) = end {
                    habit.end_date = end;
                }
                if let Some(enabled) = reminder {
                    habit.reminder_enabled = enabled;
                }
                if let Some(time) = reminder_time {
                    habit.reminder_time = time;
                }
                habit.validate()?;
                store.update_habit(&habit)?;
                println!("updated habit {id}");
            }
            None => println!("habit {id} not found"),
        },

        Command::Remove { id } => match find_habit(&store, id) {
            Some(habit) => {
                store.delete_habit(&habit)?;
                println!("removed habit {id}");
            }
            None => println!("habit {id} not found"),
        },

        Command::Task { command } => match command {
            TaskCommand::Add { habit_id, title } => {
                let task = HabitTask::new(title)?;
                let added = store.add_task(&task, habit_id)?;
                println!(
                    "added task {} to habit {habit_id}",
                    added.id.unwrap_or_default()
                );
            }
            TaskCommand::Toggle { habit_id, task_id } => {
                let task = find_habit(&store, habit_id)
                    .and_then(|h| h.tasks.into_iter().find(|t| t.id == Some(task_id)));
                match task {
                    Some(mut task) => {
                        task.toggle();
                        store.update_task(&task, habit_id)?;
                        let state = if task.is_completed { "done" } else { "open" };
                        println!("task {task_id} is now {state}");
                    }
                    None => println!("task {task_id} not found under habit {habit_id}"),
                }
            }
            TaskCommand::Remove { habit_id, task_id } => {
                let task = find_habit(&store, habit_id)
                    .and_then(|h| h.tasks.into_iter().find(|t| t.id == Some(task_id)));
                match task {
                    Some(task) => {
                        let removed = store.delete_task(&task, habit_id)?;
                        println!("removed {removed} task(s)");
                    }
                    None => println!("task {task_id} not found under habit {habit_id}"),
                }
            }
        },

        Command::Reminders => {
            for entry in store.reminder_schedule() {
                println!(
                    "{:>4}  {}  {}",
                    entry.habit_id,
                    entry.time.format("%H:%M"),
                    entry.title
                );
            }
        }
    }

    store.close()?;
    Ok(())
}
