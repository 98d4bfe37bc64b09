use clap::{Parser, Subcommand};
use eyre::Result;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use taskmaster::autosave::Autosave;
use taskmaster::display::{render_list, render_notice, render_stats};
use taskmaster::events::NoticeKind;
use taskmaster::export::write_export;
use taskmaster::{Config, Priority, StoreError, StoreEvent, TaskFilter, TaskId, TaskStore, now};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskmaster")]
#[command(about = "TaskMaster - Task list manager with filtering, search and local persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the task data (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Add a task
    Add {
        /// Task text
        #[arg(required = true)]
        text: Vec<String>,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
    },

    /// List tasks
    List {
        /// all, pending, completed, low, medium or high
        #[arg(short, long, default_value = "all")]
        filter: TaskFilter,

        /// Case-insensitive text to search for
        #[arg(short, long, default_value = "")]
        search: String,
    },

    /// Toggle a task between pending and completed
    Toggle { id: TaskId },

    /// Replace a task's text
    Edit {
        id: TaskId,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Delete a task
    Delete { id: TaskId },

    /// Mark every pending task completed
    CompleteAll,

    /// Delete every completed task
    DeleteCompleted,

    /// Delete all tasks and reset numbering
    Clear,

    /// Show totals and completion rate
    Stats,

    /// Export all tasks to a JSON file
    Export {
        /// Target file or directory (default: current directory)
        path: Option<PathBuf>,
    },

    /// Interactive session
    Shell,
}

/// Commands accepted inside `shell`
#[derive(Parser)]
#[command(name = "taskmaster", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    #[command(flatten)]
    Task(Commands),

    /// Set the current filter
    Filter { filter: TaskFilter },

    /// Set the current search text (empty clears it)
    Search { text: Vec<String> },

    /// Show tasks with the current filter and search
    Show,

    /// Save and leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Asks the user before destructive operations
trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

struct StdinConfirm {
    assume_yes: bool,
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn notify(kind: NoticeKind, message: &str) {
    println!("{}", render_notice(kind, message));
}

fn print_notice(event: &StoreEvent) {
    if let Some((kind, message)) = event.notice() {
        notify(kind, &message);
    }
}

/// Report a store error to the user; returns false so callers can propagate failure
fn report(err: StoreError) -> bool {
    notify(NoticeKind::Error, &err.to_string());
    false
}

fn show(store: &TaskStore) {
    println!("{}", render_list(&store.visible(), store.is_empty(), now()));
    println!();
    println!("{}", render_stats(&store.stats()));
}

/// Run one command against the store; returns whether it succeeded
///
/// Failures are reported to the user here, so a shell session keeps going.
fn execute(store: &mut TaskStore, command: Commands, confirm: &mut dyn Confirm) -> bool {
    match command {
        Commands::Add { text, priority } => {
            if let Err(e) = store.add(&text.join(" "), priority) {
                return report(e);
            }
        }
        Commands::List { filter, search } => {
            store.set_filter(filter);
            store.set_search(&search);
            show(store);
        }
        Commands::Toggle { id } => {
            if let Err(e) = store.toggle_complete(id) {
                return report(e);
            }
        }
        Commands::Edit { id, text } => {
            if let Err(e) = store.edit(id, &text.join(" ")) {
                return report(e);
            }
        }
        Commands::Delete { id } => {
            if store.get(id).is_none() {
                notify(NoticeKind::Info, &format!("No task #{}", id));
                return true;
            }
            if confirm.confirm("Are you sure you want to delete this task?") {
                store.delete(id);
            }
        }
        Commands::CompleteAll => {
            store.mark_all_complete();
        }
        Commands::DeleteCompleted => {
            let count = store.completed_count();
            if count == 0 || confirm.confirm(&format!("Delete {} completed tasks?", count)) {
                store.delete_completed();
            }
        }
        Commands::Clear => {
            if store.is_empty() {
                print_notice(&StoreEvent::Cleared(0));
                return true;
            }
            let prompt = format!("Delete all {} tasks? This cannot be undone!", store.len());
            if confirm.confirm(&prompt) {
                store.clear_all();
            }
        }
        Commands::Stats => {
            println!("{}", render_stats(&store.stats()));
        }
        Commands::Export { path } => {
            if store.is_empty() {
                notify(NoticeKind::Info, "No tasks to export!");
                return true;
            }
            let target = path.unwrap_or_else(|| PathBuf::from("."));
            match write_export(&target, &store.export()) {
                Ok(written) => notify(
                    NoticeKind::Success,
                    &format!("Tasks exported successfully! ({})", written.display()),
                ),
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!(error = %message, "Export failed");
                    notify(NoticeKind::Error, &message);
                    return false;
                }
            }
        }
        Commands::Shell => {
            notify(NoticeKind::Info, "Already in a shell");
        }
    }

    true
}

fn run_shell(store: &mut TaskStore, confirm: &mut dyn Confirm, autosave: &mut Autosave) -> Result<()> {
    println!("TaskMaster shell - type 'help' for commands, 'quit' to leave");
    show(store);

    let stdin = io::stdin();
    loop {
        print!("\ntaskmaster> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            autosave.tick(store);
            continue;
        }

        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match parsed.command {
            ShellCommand::Quit => break,
            ShellCommand::Filter { filter } => {
                store.set_filter(filter);
                show(store);
            }
            ShellCommand::Search { text } => {
                store.set_search(&text.join(" "));
                show(store);
            }
            ShellCommand::Show => show(store),
            ShellCommand::Task(command) => {
                let mutated = !matches!(
                    command,
                    Commands::List { .. } | Commands::Stats | Commands::Export { .. } | Commands::Shell
                );
                execute(store, command, confirm);
                if mutated {
                    show(store);
                }
            }
        }

        autosave.tick(store);
    }

    if let Err(e) = store.save() {
        warn!(error = %e, "Final save failed");
        print_notice(&StoreEvent::SaveFailed(e.to_string()));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Setup tracing
    init_tracing(&config.log_level);

    let backend = config.open_backend()?;
    let mut store = TaskStore::open(backend, config.store_options());
    store.subscribe(Box::new(print_notice));

    let mut confirm = StdinConfirm { assume_yes: cli.yes };

    let command = cli.command.unwrap_or(Commands::List {
        filter: TaskFilter::All,
        search: String::new(),
    });

    match command {
        Commands::Shell => {
            let mut autosave = Autosave::new(config.autosave_interval());
            run_shell(&mut store, &mut confirm, &mut autosave)?;
        }
        command => {
            if !execute(&mut store, command, &mut confirm) {
                process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmaster::{MemoryByteStore, StoreOptions};
    use tempfile::TempDir;

    /// Answers every prompt the same way and counts the prompts
    struct Answer {
        yes: bool,
        asked: usize,
    }

    impl Confirm for Answer {
        fn confirm(&mut self, _prompt: &str) -> bool {
            self.asked += 1;
            self.yes
        }
    }

    fn store_with(texts: &[&str]) -> TaskStore {
        let options = StoreOptions {
            welcome_task: None,
            ..StoreOptions::default()
        };
        let mut store = TaskStore::new(Box::new(MemoryByteStore::new()), options);
        for text in texts {
            store.add(text, Priority::Medium).unwrap();
        }
        store
    }

    #[test]
    fn test_export_failure_is_reported_not_propagated() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&["a"]);
        let mut confirm = Answer { yes: true, asked: 0 };

        let target = temp.path().join("no").join("such").join("x.json");
        assert!(!execute(&mut store, Commands::Export { path: Some(target) }, &mut confirm));
        assert_eq!(store.len(), 1);

        // The session keeps working after the failed export
        let written = temp.path().join("ok.json");
        assert!(execute(&mut store, Commands::Export { path: Some(written.clone()) }, &mut confirm));
        assert!(written.is_file());
    }

    #[test]
    fn test_delete_respects_confirmation() {
        let mut store = store_with(&["a", "b"]);

        let mut refuse = Answer { yes: false, asked: 0 };
        assert!(execute(&mut store, Commands::Delete { id: 1 }, &mut refuse));
        assert_eq!(refuse.asked, 1);
        assert_eq!(store.len(), 2);

        let mut accept = Answer { yes: true, asked: 0 };
        assert!(execute(&mut store, Commands::Delete { id: 1 }, &mut accept));
        assert!(store.get(1).is_none());

        // Unknown ids are reported without prompting
        assert!(execute(&mut store, Commands::Delete { id: 42 }, &mut accept));
        assert_eq!(accept.asked, 1);
    }

    #[test]
    fn test_failed_add_reports_failure() {
        let mut store = store_with(&[]);
        let mut confirm = Answer { yes: true, asked: 0 };
        let command = Commands::Add {
            text: vec!["   ".to_string()],
            priority: Priority::Low,
        };
        assert!(!execute(&mut store, command, &mut confirm));
        assert!(store.is_empty());
    }
}
