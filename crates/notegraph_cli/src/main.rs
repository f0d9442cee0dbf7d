//! Command-line front end over `notegraph_core`.
//!
//! # Responsibility
//! - Load notes from a JSON dump or a SQLite database.
//! - Run search, tag completion, related notes, metrics, insights and exports.
//! - Import a JSON dump into a database through the workspace service.
//!
//! Output is JSON on stdout (CSV/GEXF for those exports); diagnostics go to
//! the file log when `--log-dir` / `NOTEGRAPH_LOG_DIR` is set.

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use notegraph_core::{
    default_log_level, export_csv, export_gexf, export_json, generate_insights, init_logging,
    open_db, GraphAnalytics, Note, NoteStore, NoteWorkspace, NotegraphConfig, RawNote,
    SearchIndex, SqliteNoteStore,
};
use serde_json::json;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(
    name = "notegraph",
    version,
    about = "Search and analyze a collection of linked notes",
    after_help = "<SOURCE> is a JSON array of notes (*.json) or a notegraph SQLite database."
)]
struct Cli {
    /// JSON file overriding index and analytics settings
    #[arg(long, global = true, env = "NOTEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging stays off when unset
    #[arg(long, global = true, env = "NOTEGRAPH_LOG_DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error (defaults to debug in debug builds, info otherwise)
    #[arg(long, global = true, env = "NOTEGRAPH_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ranked full-text search; supports `#tag`, `after:`, `before:` and `links:` directives
    Search {
        source: String,
        query: String,
        /// Maximum hits (defaults to the configured limit)
        limit: Option<usize>,
    },
    /// Tag completion by prefix
    Tags {
        source: String,
        prefix: String,
        limit: Option<usize>,
    },
    /// Notes sharing tags or links with a note
    Related {
        source: String,
        note_id: String,
        limit: Option<usize>,
    },
    /// Graph metrics for the whole collection
    Metrics { source: String },
    /// Structural insights derived from the graph metrics
    Insights { source: String },
    /// Export the graph with per-node metrics
    Export {
        source: String,
        #[arg(value_enum)]
        format: ExportFormat,
    },
    /// Import a JSON dump into a database, resolving `[[wiki-links]]`
    Import { dump: String, database: String },
    /// Print the core library version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
    Gexf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = setup_logging(&cli) {
        eprintln!("warning: logging disabled: {err}");
    }
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(cli: &Cli) -> CliResult<()> {
    let Some(log_dir) = cli.log_dir.as_deref() else {
        return Ok(());
    };
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, log_dir)?;
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    if let Commands::Version = cli.command {
        println!("notegraph_core version={}", notegraph_core::core_version());
        return Ok(());
    }
    let config = load_config(cli.config.as_deref())?;
    let default_limit = config.index.default_limit;
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Commands::Search {
            source,
            query,
            limit,
        } => {
            let index = build_index(&source, &config)?;
            let hits = index.search(&query, limit.unwrap_or(default_limit));
            print_json(&serde_json::to_value(&hits)?)
        }
        Commands::Tags {
            source,
            prefix,
            limit,
        } => {
            let index = build_index(&source, &config)?;
            print_json(&json!(
                index.search_by_tag(&prefix, limit.unwrap_or(default_limit))
            ))
        }
        Commands::Related {
            source,
            note_id,
            limit,
        } => {
            let index = build_index(&source, &config)?;
            if index.note(&note_id).is_none() {
                return Err(format!("note not found: {note_id}").into());
            }
            let related = index.related_notes(&note_id, limit.unwrap_or(default_limit));
            print_json(&serde_json::to_value(related)?)
        }
        Commands::Metrics { source } => {
            let notes = load_notes(&source)?;
            let metrics = GraphAnalytics::new(config.analytics).calculate_metrics(&notes);
            print_json(&serde_json::to_value(&metrics)?)
        }
        Commands::Insights { source } => {
            let notes = load_notes(&source)?;
            let metrics = GraphAnalytics::new(config.analytics).calculate_metrics(&notes);
            print_json(&serde_json::to_value(generate_insights(&metrics, &notes))?)
        }
        Commands::Export { source, format } => {
            let notes = load_notes(&source)?;
            let metrics = GraphAnalytics::new(config.analytics).calculate_metrics(&notes);
            match format {
                ExportFormat::Json => print_json(&export_json(&notes, &metrics)),
                ExportFormat::Csv => {
                    print!("{}", export_csv(&notes, &metrics));
                    Ok(())
                }
                ExportFormat::Gexf => {
                    print!("{}", export_gexf(&notes, &metrics));
                    Ok(())
                }
            }
        }
        Commands::Import { dump, database } => import_dump(&dump, &database, &config),
        Commands::Version => Ok(()),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Search { .. } => "search",
        Commands::Tags { .. } => "tags",
        Commands::Related { .. } => "related",
        Commands::Metrics { .. } => "metrics",
        Commands::Insights { .. } => "insights",
        Commands::Export { .. } => "export",
        Commands::Import { .. } => "import",
        Commands::Version => "version",
    }
}

fn load_config(path: Option<&Path>) -> CliResult<NotegraphConfig> {
    let Some(path) = path else {
        return Ok(NotegraphConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config `{}`: {err}", path.display()))?;
    Ok(NotegraphConfig::from_json_str(&raw)?)
}

fn is_json_dump(source: &str) -> bool {
    Path::new(source)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_dump(path: &str) -> CliResult<Vec<Note>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read notes `{path}`: {err}"))?;
    let raw_notes: Vec<RawNote> = serde_json::from_str(&raw)?;
    Ok(raw_notes.into_iter().map(Note::from_raw).collect())
}

fn load_notes(source: &str) -> CliResult<Vec<Note>> {
    if is_json_dump(source) {
        return read_dump(source);
    }
    let mut conn = open_db(source)?;
    let store = SqliteNoteStore::try_new(&mut conn)?;
    Ok(store.get_all_notes()?)
}

fn build_index(source: &str, config: &NotegraphConfig) -> CliResult<SearchIndex> {
    let notes = load_notes(source)?;
    let mut index = SearchIndex::new(config.index.clone());
    index.build_index(&notes);
    Ok(index)
}

/// Saves every dumped note through the workspace so `[[wiki-links]]` are
/// resolved against the notes imported before it.
fn import_dump(source: &str, database: &str, config: &NotegraphConfig) -> CliResult<()> {
    let notes = read_dump(source)?;
    let mut conn = open_db(database)?;
    let store = SqliteNoteStore::try_new(&mut conn)?;
    let mut workspace = NoteWorkspace::new(store, config);

    let mut imported = 0usize;
    let mut skipped = 0usize;
    for note in notes {
        let id = note.id.clone();
        match workspace.save_note(note) {
            Ok(_) => imported += 1,
            Err(err) => {
                skipped += 1;
                warn!("event=note_import module=cli status=skipped reason={err}");
                eprintln!("skipped note {id}: {err}");
            }
        }
    }
    let stats = workspace.stats()?;
    info!(
        "event=note_import module=cli status=ok imported={imported} skipped={skipped} notes={}",
        stats.note_count
    );
    print_json(&json!({
        "imported": imported,
        "skipped": skipped,
        "noteCount": stats.note_count,
    }))
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
