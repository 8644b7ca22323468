//! Context Actions - command line entry point.
//!
//! Reads the items of every configured I/O provider and lets the user
//! inspect, check, import and export them:
//!
//! - `list`: every item with its validity and writability
//! - `formats`: export formats offered by the registered exporters
//! - `export`: serialize one item to stdout or into a folder
//! - `check`: run the edition status check on every item and its children
//! - `import`: merge items from a YAML file, resolving id collisions
//! - `preview`: command line of each profile of an action against a sample selection
//!
//! Preferences are read from `<config-dir>/preferences.yaml`, overridden by
//! `CONTEXT_ACTIONS__*` environment variables.

use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use context_actions::edition::{Duplicate, EditionTracker};
use context_actions::export::DesktopExporter;
use context_actions::io::{YamlExporter, YamlProvider};
use context_actions::models::{ImportMode, ObjectItem};
use context_actions::services::{ImportOutcome, Importer, owning_item_mut, parameters};
use context_actions::{
    APP_NAME, ConfigManager, ExportResolver, FormatId, Messages, Metrics, ProviderRegistry,
    VERSION,
};
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Manage file manager context menu actions.
#[derive(Parser, Debug)]
#[command(name = "context-actions")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration directory.
    #[arg(short, long, global = true, default_value = "context-actions")]
    config_dir: Utf8PathBuf,

    /// Also log to the console.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every item.
    List,
    /// List the available export formats.
    Formats,
    /// Export an item.
    Export {
        /// Id of the item.
        id: String,
        /// Export format; defaults to the preferred one.
        #[arg(short, long)]
        format: Option<String>,
        /// Target folder; the item is printed when omitted.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// Check the edition status of every item.
    Check,
    /// Import items from a YAML file.
    Import {
        path: Utf8PathBuf,
        /// Collision handling; defaults to the preferred mode.
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Show the command lines of an action.
    Preview { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    NoImport,
    Renumber,
    Override,
    Ask,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::NoImport => ImportMode::NoImport,
            ModeArg::Renumber => ImportMode::Renumber,
            ModeArg::Override => ImportMode::Override,
            ModeArg::Ask => ImportMode::Ask,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigManager::new(&args.config_dir)?;
    let preferences = config.load_preferences()?;
    let _guard = context_actions::logging::setup_logging(
        &config.logging_preferences(&preferences),
        "context-actions",
        args.verbose,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let metrics = Arc::new(Metrics::new());
    let mut registry = ProviderRegistry::with_metrics(preferences, Arc::clone(&metrics));
    registry.register_provider(Arc::new(YamlProvider::new(config.items_dir())));
    registry.register_exporter(Arc::new(YamlExporter::new()));
    registry.register_exporter(Arc::new(DesktopExporter::new()));

    let tracker = EditionTracker::with_metrics(Arc::clone(&metrics));

    let mut messages = Messages::new();
    let result = run(args.command, &registry, &tracker, &mut messages);

    for message in &messages {
        eprintln!("{message}");
    }

    tracker.shutdown();
    metrics.log_summary();
    tracing::info!("{} shutdown complete", APP_NAME);
    result
}

fn run(
    command: Command,
    registry: &ProviderRegistry,
    tracker: &EditionTracker,
    messages: &mut Messages,
) -> Result<()> {
    match command {
        Command::List => {
            for item in registry.read_items(messages) {
                println!(
                    "{}\t{}\t{}\t{}\t{:?}",
                    item.id(),
                    item.kind(),
                    item.label(),
                    if item.is_valid() { "valid" } else { "invalid" },
                    registry.writability(&item)
                );
            }
        }
        Command::Formats => {
            for format in ExportResolver::new(registry).get_formats() {
                println!(
                    "{}\t{}\t{:?}\t{}",
                    format.id(),
                    format.label(),
                    format.version(),
                    format.exporter().id()
                );
            }
        }
        Command::Export { id, format, output } => {
            let items = registry.read_items(messages);
            let item = find_item(&items, &id)?;
            let format = FormatId::new(
                format
                    .as_deref()
                    .unwrap_or(&registry.preferences().export.default_format),
            );
            let resolver = ExportResolver::new(registry);

            match output {
                Some(folder) => {
                    let uri = resolver
                        .to_file(item, folder.as_str(), &format, messages)
                        .with_context(|| format!("Export of {id} as {format} failed"))?;
                    println!("{uri}");
                }
                None => {
                    let buffer = resolver
                        .to_buffer(item, &format, messages)
                        .with_context(|| format!("Export of {id} as {format} failed"))?;
                    print!("{buffer}");
                }
            }
        }
        Command::Check => {
            let mut invalid = 0;
            for item in registry.read_items(messages) {
                invalid += check_item(tracker, item);
            }
            if invalid > 0 {
                bail!("{invalid} invalid item(s)");
            }
        }
        Command::Import { path, mode } => {
            let mode = mode
                .map(ImportMode::from)
                .unwrap_or(registry.preferences().import.mode);
            let mut items = registry.read_items(messages);
            let before = items.len();

            let mut importer = Importer::new(mode).with_ask(ask_on_stdin);
            let outcomes = importer.import_file(&mut items, &path, messages)?;

            for outcome in outcomes {
                let id = match &outcome {
                    ImportOutcome::Inserted { id } | ImportOutcome::Overridden { id } => id,
                    ImportOutcome::Renumbered { to, .. } => to,
                    ImportOutcome::Skipped { .. } => continue,
                };
                let Some(item) = owning_item_mut(&mut items, id) else {
                    messages.push(format!("{id}: imported item not found, not saved"));
                    continue;
                };
                let code = registry.write_item(item, messages);
                if item.id() == id {
                    println!("{id}\t{code}");
                } else {
                    println!("{id}\t{code} (saved with {})", item.id());
                }
            }
            tracing::info!("Import: {} item(s) before, {} after", before, items.len());
        }
        Command::Preview { id } => {
            let items = registry.read_items(messages);
            let ObjectItem::Action(action) = find_item(&items, &id)? else {
                bail!("{id} is not an action");
            };
            for profile in &action.profiles {
                println!("{}\t{}", profile.id(), parameters::preview(profile));
            }
        }
    }
    Ok(())
}

fn find_item<'a>(items: &'a [ObjectItem], id: &str) -> Result<&'a ObjectItem> {
    items
        .iter()
        .find(|item| item.id() == id)
        .with_context(|| format!("No item with id {id}"))
}

/// Check an item and, for menus, each child. Returns the number of invalid
/// items found.
fn check_item(tracker: &EditionTracker, item: ObjectItem) -> usize {
    let children = match &item {
        ObjectItem::Menu(menu) => menu.items.clone(),
        ObjectItem::Action(_) => Vec::new(),
    };

    let mut working: Duplicate<ObjectItem> = tracker.new_item(item);
    working.check_edition_status();
    let current = working.get();
    println!(
        "{}\t{}\t{}",
        current.id(),
        current.kind(),
        if working.is_valid() { "valid" } else { "invalid" }
    );

    let own = usize::from(!working.is_valid());
    own + children
        .into_iter()
        .map(|child| check_item(tracker, child))
        .sum::<usize>()
}

fn ask_on_stdin(imported: &ObjectItem, existing: &ObjectItem) -> ImportMode {
    eprint!(
        "{} \"{}\" already exists as \"{}\": [s]kip, [r]enumber or [o]verride? ",
        imported.id(),
        imported.label(),
        existing.label()
    );
    let _ = std::io::stderr().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return ImportMode::NoImport;
    }
    match answer.trim() {
        "r" | "renumber" => ImportMode::Renumber,
        "o" | "override" => ImportMode::Override,
        _ => ImportMode::NoImport,
    }
}
