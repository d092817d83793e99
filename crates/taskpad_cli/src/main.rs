//! Command-line driver for the taskpad core.
//!
//! # Responsibility
//! - Drive the view-state coordinator from one-shot commands.
//! - Print the list the coordinator would present after each command.

use clap::{Parser, Subcommand};
use log::warn;
use std::error::Error;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskpad_core::config::{DATA_DIR_ENV, LOG_LEVEL_ENV};
use taskpad_core::{
    init_logging, Action, AppConfig, ListSource, PreferenceStore, Priority, SearchBarState, Task,
    TaskId, TaskListCoordinator, TaskRepository,
};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "taskpad", version, about = "Prioritized task list")]
struct Cli {
    /// Directory holding the task database, preferences and logs.
    #[arg(long, env = DATA_DIR_ENV)]
    data_dir: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, env = LOG_LEVEL_ENV)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the list for the saved sort order.
    List,
    /// Add a task.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "LOW", value_parser = parse_priority)]
        priority: Priority,
    },
    /// Replace every field of an existing task.
    Update {
        #[arg(long)]
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    /// Delete one task.
    Delete {
        #[arg(long)]
        id: TaskId,
    },
    /// Delete every task.
    Clear,
    /// List tasks whose title contains QUERY.
    Search { query: String },
    /// Save the sort order: HIGH, LOW, MEDIUM or NONE.
    Sort {
        #[arg(value_parser = parse_priority)]
        priority: Priority,
    },
    /// Print one task.
    Show {
        #[arg(long)]
        id: TaskId,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = AppConfig::from_data_dir(cli.data_dir)?;
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }
    config.ensure_data_dir()?;
    if let Err(err) = init_logging(&config.log_level, config.log_dir()) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let repo = config.open_repository()?;
    let preferences = config.open_preferences();

    match cli.command {
        Command::Show { id } => {
            match repo.store().get_task(id)? {
                Some(task) => print_task(&task),
                None => println!("task {id} not found"),
            }
            return Ok(());
        }
        Command::List => {}
        Command::Search { query } => {
            let coordinator = TaskListCoordinator::new(repo.clone(), Arc::clone(&preferences));
            coordinator.set_search_text(query.as_str());
            coordinator.search_database(&query);
            print_list(&coordinator).await;
            return Ok(());
        }
        command => apply(command, &repo, &preferences).await?,
    }

    let coordinator = TaskListCoordinator::new(repo, preferences);
    print_list(&coordinator).await;
    Ok(())
}

async fn apply(
    command: Command,
    repo: &TaskRepository,
    preferences: &Arc<PreferenceStore>,
) -> Result<(), Box<dyn Error>> {
    let coordinator = TaskListCoordinator::new(repo.clone(), Arc::clone(preferences));
    let mut notices = coordinator.notices();

    let outcome = match command {
        Command::Add {
            title,
            description,
            priority,
        } => {
            coordinator.update_task_fields(None);
            coordinator.set_title(title);
            coordinator.set_description(description);
            coordinator.set_priority(priority);
            coordinator.submit(Action::Add).map(drop)
        }
        Command::Update {
            id,
            title,
            description,
            priority,
        } => {
            let current = repo
                .store()
                .get_task(id)?
                .ok_or_else(|| format!("task {id} not found"))?;
            coordinator.update_task_fields(Some(&current));
            if let Some(title) = title {
                coordinator.set_title(title);
            }
            if let Some(description) = description {
                coordinator.set_description(description);
            }
            if let Some(priority) = priority {
                coordinator.set_priority(priority);
            }
            coordinator.submit(Action::Update).map(drop)
        }
        Command::Delete { id } => {
            let current = repo
                .store()
                .get_task(id)?
                .ok_or_else(|| format!("task {id} not found"))?;
            coordinator.request_delete(&current);
            Ok(())
        }
        Command::Clear => coordinator.submit(Action::DeleteAll).map(drop),
        Command::Sort { priority } => {
            coordinator.persist_sort_state(priority);
            Ok(())
        }
        Command::List | Command::Search { .. } | Command::Show { .. } => Ok(()),
    };

    coordinator.wait_for_pending_writes().await;
    while let Ok(notice) = notices.try_recv() {
        println!("{}", notice.message());
    }
    outcome.map_err(Into::into)
}

/// Prints what the coordinator presents once its channels have delivered.
///
/// Must run before anything else awaits on a fresh coordinator: the
/// projection receivers taken here rely on seeing the first delivery.
async fn print_list(coordinator: &TaskListCoordinator) {
    let view = coordinator.view();
    let mut sort = view.sort_state.clone();
    let mut low = view.low_priority_tasks.clone();
    let mut high = view.high_priority_tasks.clone();

    let resolved = match tokio::time::timeout(
        SETTLE_TIMEOUT,
        sort.wait_for(|state| !state.is_idle() && !state.is_loading()),
    )
    .await
    {
        Ok(Ok(state)) => state.data().copied(),
        Ok(Err(_)) | Err(_) => None,
    };
    let Some(priority) = resolved else {
        if let Some(cause) = view.sort_state.borrow().error() {
            warn!("event=cli_list module=cli status=error error={cause}");
            eprintln!("sort preference unavailable: {cause}");
        }
        return;
    };

    if *view.search_bar.borrow() == SearchBarState::Triggered {
        let mut searched = view.searched_tasks.clone();
        let wait = searched.wait_for(|state| !state.is_loading());
        settle("searched", SETTLE_TIMEOUT, wait).await;
    } else {
        match priority {
            Priority::None => {
                let mut all = view.all_tasks.clone();
                let wait = all.wait_for(|state| !state.is_loading());
                settle("all", SETTLE_TIMEOUT, wait).await;
            }
            // The projections publish nothing when their first read fails.
            Priority::Low => {
                settle("low", SETTLE_TIMEOUT, low.changed()).await;
            }
            Priority::High => {
                settle("high", SETTLE_TIMEOUT, high.changed()).await;
            }
            Priority::Medium => {}
        }
    }

    match view.displayed_tasks() {
        Some((source, tasks)) => {
            println!("{} ({} tasks)", source_label(source, priority), tasks.len());
            for task in &tasks {
                print_task(task);
            }
        }
        None => println!("nothing to show for sort {priority}"),
    }
}

/// Waits up to `limit` for `wait`; returns whether it finished in time.
async fn settle<F: Future>(channel: &str, limit: Duration, wait: F) -> bool {
    let settled = tokio::time::timeout(limit, wait).await.is_ok();
    if !settled {
        warn!("event=cli_list module=cli status=timeout channel={channel}");
    }
    settled
}

fn source_label(source: ListSource, priority: Priority) -> String {
    match source {
        ListSource::Searched => "search results".to_string(),
        ListSource::All => "all tasks".to_string(),
        ListSource::LowPriority | ListSource::HighPriority => format!("{priority} priority"),
    }
}

fn print_task(task: &Task) {
    println!(
        "#{:<4} [{:<6}] {} - {}",
        task.id,
        task.priority.as_str(),
        task.title,
        task.description
    );
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    value
        .trim()
        .to_ascii_uppercase()
        .parse::<Priority>()
        .map_err(|err| err.to_string())
}
