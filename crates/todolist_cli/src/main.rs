//! Command-line shell over `todolist_core`.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the configured storage.
//! - Map one subcommand to one `TodoList` call and print the outcome.
//! - Run `shell`: one subcommand per stdin line against a single open list,
//!   with the autosave timer polled between lines.
//!
//! Positions on the command line are 1-based and refer to the list as shown
//! by `list` under the same `--filter`.

use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use todolist_core::{
    core_version, init_logging, AutosaveTick, AutosaveTimer, CoreConfig, FilterMode, Priority,
    RecordChange, StorageBackend, StoreEvent, TodoList, TodoRecord, TodoStorage,
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "todolist", version, about = "Manage a todo list from the terminal")]
struct Cli {
    #[command(flatten)]
    settings: Settings,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Settings {
    /// JSON config file; values are overridden by TODOLIST_* variables and flags.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the data file and logs.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Storage backend: json or sqlite.
    #[arg(long, global = true)]
    backend: Option<StorageBackend>,
    /// Log level: trace, debug, info, warn or error.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Todo(TodoCommand),
    /// Read one command per line from stdin until EOF or `quit`.
    Shell,
    /// Print the core version.
    Version,
}

/// A single operation on the list, shared by the command line and `shell`.
#[derive(Debug, Subcommand)]
enum TodoCommand {
    /// Add a todo.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(long, default_value = "normal")]
        priority: Priority,
    },
    /// Show todos under a filter.
    List {
        #[arg(long, default_value = "all")]
        filter: FilterMode,
    },
    /// Flip completion of the todo at a position.
    Toggle {
        position: usize,
        #[arg(long, default_value = "all")]
        filter: FilterMode,
    },
    /// Remove the todo at a position.
    Remove {
        position: usize,
        #[arg(long, default_value = "all")]
        filter: FilterMode,
    },
    /// Remove a todo by id.
    RemoveId { id: Uuid },
    /// Change fields of the todo at a position.
    Edit {
        position: usize,
        #[arg(long, default_value = "all")]
        filter: FilterMode,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Mark every todo completed.
    CompleteAll,
    /// Mark every todo active again.
    ReopenAll,
    /// Remove every completed todo.
    ClearCompleted,
    /// Remove every todo.
    ClearAll,
    /// Print total/active/completed counts.
    Stats,
    /// Write all todos to a JSON document.
    Export { path: PathBuf },
    /// Append todos from a JSON document, skipping known ids.
    Import { path: PathBuf },
}

/// Parser for one `shell` line; the line carries no binary name.
#[derive(Debug, Parser)]
#[command(name = "todolist", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: TodoCommand,
}

#[derive(Debug)]
enum ShellInput {
    Blank,
    Quit,
    Run(TodoCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let command = match cli.command {
        Command::Version => {
            println!("todolist_core version={}", core_version());
            return Ok(());
        }
        Command::Shell => None,
        Command::Todo(command) => Some(command),
    };

    let config = resolve_config(&cli.settings)?;
    if let Err(err) = init_logging(&config.log_level, &config.log_dir()) {
        eprintln!("warning: file logging disabled: {err}");
    }
    log::info!(
        "event=cli_start module=cli status=ok backend={}",
        config.backend
    );

    let mut list = TodoList::open(config.open_storage()?);
    list.subscribe_store(|event| {
        if let StoreEvent::PersistenceFailed { reason } = event {
            eprintln!("warning: change kept in memory but not saved: {reason}");
        }
    });

    match command {
        Some(command) => execute(&mut list, command),
        None => run_shell(
            &mut list,
            config.autosave_interval(),
            std::io::stdin().lock(),
            Instant::now,
        ),
    }
}

fn resolve_config(cli: &Settings) -> Result<CoreConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path)?,
        None => CoreConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = std::path::absolute(dir)?;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config.validate()?)
}

/// Runs shell lines until EOF or `quit`, then saves once more.
///
/// A failing line is reported and the loop goes on.
fn run_shell<S: TodoStorage>(
    list: &mut TodoList<S>,
    autosave_interval: Duration,
    input: impl BufRead,
    mut now: impl FnMut() -> Instant,
) -> Result<(), Box<dyn Error>> {
    let mut timer = AutosaveTimer::new(autosave_interval);
    timer.poll(now(), list.store_mut());
    log::info!(
        "event=shell_start module=cli status=ok autosave_secs={}",
        autosave_interval.as_secs()
    );

    for line in input.lines() {
        match parse_shell_line(&line?) {
            Ok(ShellInput::Blank) => {}
            Ok(ShellInput::Quit) => break,
            Ok(ShellInput::Run(command)) => {
                if let Err(err) = execute(list, command) {
                    eprintln!("error: {err}");
                }
            }
            Err(err) => eprintln!("{err}"),
        }
        if let AutosaveTick::Failed(reason) = timer.poll(now(), list.store_mut()) {
            eprintln!("warning: autosave failed: {reason}");
        }
    }

    list.save()?;
    log::info!("event=shell_stop module=cli status=ok");
    Ok(())
}

fn parse_shell_line(line: &str) -> Result<ShellInput, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => Ok(ShellInput::Blank),
        ["quit"] | ["exit"] => Ok(ShellInput::Quit),
        _ => ShellLine::try_parse_from(words.iter().copied())
            .map(|parsed| ShellInput::Run(parsed.command)),
    }
}

fn execute<S: TodoStorage>(
    list: &mut TodoList<S>,
    command: TodoCommand,
) -> Result<(), Box<dyn Error>> {
    match command {
        TodoCommand::Add { title, priority } => {
            let record = list.add_with_priority(&title.join(" "), priority)?;
            println!("added {} ({})", record.title, record.id);
        }
        TodoCommand::List { filter } => {
            list.set_filter(filter);
            print_visible(list);
        }
        TodoCommand::Toggle { position, filter } => {
            list.set_filter(filter);
            let completed = list.toggle_at_visible(visible_index(position)?)?;
            println!("{}", if completed { "completed" } else { "reopened" });
        }
        TodoCommand::Remove { position, filter } => {
            list.set_filter(filter);
            let removed = list.remove_at_visible(visible_index(position)?)?;
            println!("removed {} ({})", removed.title, removed.id);
        }
        TodoCommand::RemoveId { id } => match list.remove_by_id(id) {
            Some(removed) => println!("removed {} ({})", removed.title, removed.id),
            None => return Err(format!("no todo with id {id}").into()),
        },
        TodoCommand::Edit {
            position,
            filter,
            title,
            priority,
            category,
        } => {
            list.set_filter(filter);
            let index = visible_index(position)?;
            let changes = title
                .map(RecordChange::Title)
                .into_iter()
                .chain(priority.map(RecordChange::Priority))
                .chain(category.map(RecordChange::Category))
                .collect::<Vec<_>>();
            if changes.is_empty() {
                return Err("nothing to edit; pass --title, --priority or --category".into());
            }
            // Resolve once so an edit that moves the record cannot retarget later changes.
            let id = list.visible_at(index)?.id;
            let mut changed = false;
            for change in changes {
                changed |= list.update(id, change)?;
            }
            println!("{}", if changed { "updated" } else { "unchanged" });
        }
        TodoCommand::CompleteAll => {
            println!("completed {}", list.set_all_completed(true));
        }
        TodoCommand::ReopenAll => {
            println!("reopened {}", list.set_all_completed(false));
        }
        TodoCommand::ClearCompleted => {
            println!("removed {} completed", list.clear_completed());
        }
        TodoCommand::ClearAll => {
            println!("removed {}", list.clear_all());
        }
        TodoCommand::Stats => {
            let counts = list.counts();
            println!(
                "total={} active={} completed={}",
                counts.total, counts.active, counts.completed
            );
        }
        TodoCommand::Export { path } => {
            let count = list.export_json(&path)?;
            println!("exported {count} to {}", path.display());
        }
        TodoCommand::Import { path } => {
            let summary = list.import_json(&path)?;
            println!(
                "imported {} (skipped {} duplicate, {} invalid)",
                summary.imported, summary.skipped_duplicates, summary.skipped_invalid
            );
        }
    }
    Ok(())
}

fn visible_index(position: usize) -> Result<usize, Box<dyn Error>> {
    position
        .checked_sub(1)
        .ok_or_else(|| "positions start at 1".into())
}

fn print_visible<S: TodoStorage>(list: &mut TodoList<S>) {
    let filter = list.filter();
    let visible = list.visible();
    if visible.is_empty() {
        println!("no {filter} todos");
        return;
    }
    for (index, record) in visible.into_iter().enumerate() {
        println!("{}", format_row(index + 1, record));
    }
}

fn format_row(position: usize, record: &TodoRecord) -> String {
    let mark = if record.completed { 'x' } else { ' ' };
    let mut row = format!("{position:>3}. [{mark}] {} ({})", record.title, record.priority);
    if !record.category.is_empty() {
        row.push_str(&format!(" #{}", record.category));
    }
    row
}
