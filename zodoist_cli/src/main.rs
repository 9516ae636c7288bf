//! Zodoist command-line front end.
//!
//! ```text
//! zodoist list --view today
//! zodoist add "Buy milk" --description "2 litres"
//! zodoist done 3f2a
//! zodoist watch --view upcoming
//! ```
//!
//! Task ids may be abbreviated to any unique prefix.

use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::TryRecvError};
use zodoist::{
    Composer, Config, CountsMemo, Mounted, Notice, Snapshot, Task, TaskDb, TaskDbBuilder,
    TaskState, View, ViewContext, ViewCounts, due_label, is_overdue,
};

#[derive(Parser)]
#[command(name = "zodoist", version, about = "A small personal task manager")]
struct Cli {
    /// Database URL, overrides ZODOIST_DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show view counts and the tasks of one view
    List {
        /// inbox, today, upcoming or completed
        #[arg(short, long, default_value_t = View::Inbox)]
        view: View,
        /// Print the view's tasks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task, due today unless told otherwise
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Due date as YYYY-MM-DD
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        /// Leave the due date empty
        #[arg(long)]
        no_due: bool,
    },
    /// Mark a task completed
    Done { id: String },
    /// Mark a completed task open again
    Reopen { id: String },
    /// Delete a task
    Rm { id: String },
    /// Keep a view on screen and redraw it when tasks change
    Watch {
        #[arg(short, long, default_value_t = View::Inbox)]
        view: View,
        /// Seconds between refreshes that pick up writes from other processes
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

type Tasks = Mounted<TaskDb>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let db = TaskDbBuilder::from_config(&config)
        .build()
        .await
        .context("Failed to open task store")?;
    let state = TaskState::new(db).with_notice_capacity(config.channel_capacity);
    // Subscribe before mounting so a failed initial load is reported too.
    let mut notices = state.notices();
    let tasks = state.mount().await;

    let result = match cli.command {
        Command::List { view, json } => list(&tasks, view, json),
        Command::Add {
            title,
            description,
            due,
            no_due,
        } => add(&tasks, title, description, due, no_due).await,
        Command::Done { id } => set_completed(&tasks, &id, true).await,
        Command::Reopen { id } => set_completed(&tasks, &id, false).await,
        Command::Rm { id } => remove(&tasks, &id).await,
        Command::Watch { view, interval } => {
            watch(&tasks, view, Duration::from_secs(interval.max(1)), &mut notices).await
        }
    };

    drain_notices(&mut notices);
    result
}

fn list(tasks: &Tasks, view: View, json: bool) -> anyhow::Result<()> {
    let snapshot = tasks.snapshot();
    let ctx = tasks.context();
    if json {
        let shown = snapshot.filter(view, &ctx);
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }
    let counts = snapshot.counts(&ctx);
    print!("{}", render(&snapshot, view, counts, &ctx));
    Ok(())
}

async fn add(
    tasks: &Tasks,
    title: String,
    description: String,
    due: Option<NaiveDate>,
    no_due: bool,
) -> anyhow::Result<()> {
    let mut composer = Composer::new(tasks.clock().today());
    composer.set_title(title);
    composer.set_description(description);
    if no_due {
        composer.set_due(None::<NaiveDate>);
    } else if due.is_some() {
        composer.set_due(due);
    }

    let Some(new_task) = composer.begin_submit() else {
        bail!("a task needs a title");
    };
    let created = tasks.create_task(new_task).await;
    composer.finish_submit();

    let task = created?;
    println!("{}", render_task(&task, &tasks.context()));
    Ok(())
}

async fn set_completed(tasks: &Tasks, query: &str, completed: bool) -> anyhow::Result<()> {
    let id = resolve(&tasks.snapshot(), query)?;
    tasks.toggle(&id, completed).await?;
    if let Some(task) = tasks.snapshot().get(&id) {
        println!("{}", render_task(task, &tasks.context()));
    }
    Ok(())
}

async fn remove(tasks: &Tasks, query: &str) -> anyhow::Result<()> {
    let id = resolve(&tasks.snapshot(), query)?;
    tasks.delete(&id).await?;
    Ok(())
}

async fn watch(
    tasks: &Tasks,
    view: View,
    interval: Duration,
    notices: &mut broadcast::Receiver<Notice>,
) -> anyhow::Result<()> {
    let mut snapshots = tasks.subscribe();
    let mut memo = CountsMemo::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut shown_date = tasks.context().today;
    redraw(tasks, view, &mut memo);
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                redraw(tasks, view, &mut memo);
            }
            notice = notices.recv() => match notice {
                Ok(notice) => print_notice(&notice),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Dropped {skipped} notices");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ticker.tick() => {
                // Writes from other processes do not reach this process's
                // change channel.
                let _ = tasks.fetch_all().await;
                let today = tasks.context().today;
                if today != shown_date {
                    shown_date = today;
                    redraw(tasks, view, &mut memo);
                }
            }
            _ = &mut shutdown => break,
        }
    }
    Ok(())
}

fn redraw(tasks: &Tasks, view: View, memo: &mut CountsMemo) {
    let snapshot = tasks.snapshot();
    let ctx = tasks.context();
    let counts = memo.get(snapshot.version, &snapshot.tasks, &ctx);
    // Clear the screen and home the cursor.
    print!("\x1b[2J\x1b[H{}", render(&snapshot, view, counts, &ctx));
}

fn render(snapshot: &Snapshot, view: View, counts: ViewCounts, ctx: &ViewContext) -> String {
    let mut out = String::new();
    let tabs: Vec<String> = View::ALL
        .iter()
        .map(|v| {
            let marker = if *v == view { "*" } else { " " };
            format!("{marker}{} ({})", v.title(), counts.get(*v))
        })
        .collect();
    out.push_str(&tabs.join("  "));
    out.push_str("\n\n");

    if snapshot.loading {
        out.push_str("Loading...\n");
        return out;
    }
    let shown = snapshot.filter(view, ctx);
    if shown.is_empty() {
        out.push_str(view.empty_text());
        out.push('\n');
    }
    for task in shown {
        out.push_str(&render_task(task, ctx));
        out.push('\n');
    }
    out
}

fn render_task(task: &Task, ctx: &ViewContext) -> String {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{check} {}  {}", short_id(&task.id), task.title);
    if let Some(due) = task.due_date {
        line.push_str(&format!("  ({})", due_label(due, ctx)));
        if is_overdue(task, ctx) {
            line.push_str(" overdue");
        }
    }
    if let Some(description) = &task.description {
        line.push_str("\n             ");
        line.push_str(description);
    }
    line
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Find the task whose id is `query` or starts with it.
fn resolve(snapshot: &Snapshot, query: &str) -> anyhow::Result<String> {
    if query.is_empty() {
        bail!("task id must not be empty");
    }
    if snapshot.get(query).is_some() {
        return Ok(query.to_string());
    }
    let matches: Vec<&Task> = snapshot
        .tasks
        .iter()
        .filter(|t| t.id.starts_with(query))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => bail!("no task with id {query:?}"),
        _ => bail!("task id {query:?} is ambiguous, {} tasks match", matches.len()),
    }
}

fn print_notice(notice: &Notice) {
    eprintln!("{}: {}", notice.title, notice.description);
}

fn drain_notices(notices: &mut broadcast::Receiver<Notice>) {
    loop {
        match notices.try_recv() {
            Ok(notice) => print_notice(&notice),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}
