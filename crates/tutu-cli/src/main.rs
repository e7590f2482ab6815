use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tutu_core::report::{render_report, write_report, ReportSummary};
use tutu_core::runner::{start_item, BatchRunner, CommandAssistant};
use tutu_core::{ItemFilter, ItemStatus, NewItem, Scope, Store, TutuConfig};

mod format;

// ANSI color codes
pub(crate) const CYAN: &str = "\x1b[36m";
pub(crate) const GREEN: &str = "\x1b[32m";
pub(crate) const YELLOW: &str = "\x1b[33m";
pub(crate) const RED: &str = "\x1b[31m";
pub(crate) const BOLD: &str = "\x1b[1m";
pub(crate) const DIM: &str = "\x1b[2m";
pub(crate) const RESET: &str = "\x1b[0m";

#[derive(Parser)]
#[command(name = "tutu")]
#[command(about = "Track work items and hand them to a coding assistant")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new item recorded against the current directory
    Add {
        /// Short title
        title: String,
        /// Description (read from stdin until EOF when omitted)
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// Free-form context (read from stdin until EOF when omitted)
        #[arg(long = "context", short = 'x')]
        context: Option<String>,
    },

    /// List items that aren't done
    List {
        /// Include done items
        #[arg(long, short = 'a')]
        all: bool,
        /// Ignore the current directory scope
        #[arg(long, short = 'e')]
        everywhere: bool,
    },

    /// Show full status for an item
    Status {
        item_id: i64,
    },

    /// Start an assistant session with the item's context
    Start {
        item_id: i64,
    },

    /// Add a step to an item
    AddStep {
        item_id: i64,
        description: String,
    },

    /// Mark a step as done
    CompleteStep {
        step_id: i64,
    },

    /// Mark an item as done
    Done {
        item_id: i64,
    },

    /// Delete an item and all of its steps
    Delete {
        item_id: i64,
    },

    /// Run the assistant over every pending and in-progress item, then write a report
    Batch {
        /// Ignore the current directory scope
        #[arg(long, short = 'e')]
        everywhere: bool,
        /// Don't open the report in a browser
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    tutu_core::tracing_setup::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{RED}Error: {:#}{RESET}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = TutuConfig::load_or_default(cli.config.as_deref())?;
    let clock = config.clock()?;
    let db_path = config.database_path()?;
    let store = Store::open(&db_path, clock)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    match cli.command {
        Commands::Add {
            title,
            description,
            context,
        } => {
            let description = match description {
                Some(text) => text,
                None => read_block("📄 Description (press Ctrl+D when done):")?,
            };
            let context = match context {
                Some(text) => text,
                None => read_block("🌟 Context (press Ctrl+D when done):")?,
            };
            let item = store.create_item(
                NewItem::new(title)
                    .description(description)
                    .context(context)
                    .working_directory(&cwd),
            )?;
            println!("{GREEN}✅ Item created with ID: {}{RESET}", item.id);
            println!("{BOLD}Title:{RESET} {}", item.title);
            println!("{BOLD}Directory:{RESET} {}", cwd.display());
        }
        Commands::List { all, everywhere } => {
            let filter = ItemFilter::new(all, scope(everywhere, &cwd));
            let items = store.list_items(&filter)?;
            if items.is_empty() {
                println!("{YELLOW}🎉 No pending items!{RESET}");
                return Ok(());
            }
            let rows = items
                .iter()
                .map(|item| {
                    let steps = store.steps_for(item.id)?;
                    Ok((item, steps))
                })
                .collect::<Result<Vec<_>>>()?;
            print!("{}", format::item_table(&rows, store.clock()));
        }
        Commands::Status { item_id } => {
            let item = store.get_item(item_id)?;
            let steps = store.steps_for(item_id)?;
            print!("{}", format::item_status(&item, &steps, store.clock()));
        }
        Commands::Start { item_id } => {
            // Interactive sessions are never timed out
            let assistant = CommandAssistant::new(
                &config.assistant.program,
                config.assistant.args.clone(),
            );
            println!("{GREEN}🚀 Starting assistant session for item #{}{RESET}\n", item_id);
            let appendix = config.appendix();
            start_item(&store, &assistant, item_id, &cwd, appendix.as_deref())?;
        }
        Commands::AddStep {
            item_id,
            description,
        } => {
            let step = store.create_step(item_id, &description)?;
            println!("{GREEN}✅ Step added with ID: {}{RESET}", step.id);
        }
        Commands::CompleteStep { step_id } => {
            store.complete_step(step_id)?;
            println!("{GREEN}✅ Step #{} marked as done{RESET}", step_id);
        }
        Commands::Done { item_id } => {
            store.update_item_status(item_id, ItemStatus::Done)?;
            println!("{GREEN}✅ Item #{} marked as done! 🎉{RESET}", item_id);
        }
        Commands::Delete { item_id } => {
            store.delete_item(item_id)?;
            println!("{GREEN}🗑  Item #{} deleted{RESET}", item_id);
        }
        Commands::Batch {
            everywhere,
            no_open,
        } => run_batch(&store, &config, &cwd, everywhere, !no_open)?,
    }
    Ok(())
}

fn run_batch(
    store: &Store,
    config: &TutuConfig,
    cwd: &Path,
    everywhere: bool,
    open: bool,
) -> Result<()> {
    let selected = store.select_for_batch(&scope(everywhere, cwd))?;
    if selected.is_empty() {
        println!("{YELLOW}🎉 Nothing to process!{RESET}");
        return Ok(());
    }

    let assistant = CommandAssistant::from_config(&config.assistant);
    let runner = BatchRunner::new(store, &assistant, cwd).with_appendix(config.appendix());
    let total = selected.len();
    let results = runner.run_with(&selected, |index, item| {
        println!(
            "{CYAN}[{}/{}]{RESET} Processing #{} {}",
            index + 1,
            total,
            item.id,
            item.title
        );
    });

    for result in &results {
        let marker = if result.succeeded() {
            format!("{GREEN}✓{RESET}")
        } else {
            format!("{RED}✗ exit {}{RESET}", result.exit_code)
        };
        println!("  {} #{} {}", marker, result.item.id, result.item.title);
    }

    let now = store.clock().now_naive();
    let html = render_report(&results, &selected, now);
    let path = write_report(cwd, now, &html).context("Failed to write report")?;
    let summary = ReportSummary::from_results(&results, &selected);
    println!(
        "\n{BOLD}{} processed{RESET} {DIM}({} done, {} in progress, {} steps completed){RESET}",
        summary.total_selected, summary.done, summary.in_progress, summary.steps_completed
    );
    println!("📄 Report written to {}", path.display());

    if open {
        if let Err(e) = open_in_browser(&path) {
            tracing::warn!("{}", e);
        }
    }
    Ok(())
}

fn scope(everywhere: bool, cwd: &Path) -> Scope {
    if everywhere {
        Scope::Everywhere
    } else {
        Scope::current(cwd)
    }
}

/// Read lines from stdin until EOF.
fn read_block(prompt: &str) -> Result<String> {
    eprintln!("{}", prompt);
    io::stderr().flush().ok();
    let mut text = String::new();
    io::stdin()
        .lock()
        .read_to_string(&mut text)
        .context("Failed to read from stdin")?;
    Ok(text.trim_end_matches('\n').to_string())
}

fn open_in_browser(path: &Path) -> Result<(), String> {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(path).spawn();

    #[cfg(target_os = "linux")]
    let result = std::process::Command::new("xdg-open").arg(path).spawn();

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    let result: Result<std::process::Child, std::io::Error> =
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "Unsupported platform"));

    result.map(|_| ()).map_err(|e| format!("Failed to open browser: {}", e))
}
