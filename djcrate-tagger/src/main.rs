//! djcrate-tagger - AI tag assignment for a personal music collection
//!
//! Subcommands:
//! - `analyze`: tag one track (named explicitly, or the first untagged one)
//! - `batch`: tag a run of untagged tracks with pacing between requests
//! - `clean`: strip AI-written fields from the store
//! - `playlists`: export one m3u8 playlist per taxonomy tag
//! - `status`: report tagging coverage

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use djcrate_common::config::{self, TomlConfig};
use djcrate_common::{Taxonomy, TrackStore};
use djcrate_tagger::backends::{create_backend, BackendConfig, BackendKind};
use djcrate_tagger::models::TrackOutcome;
use djcrate_tagger::services::{
    clean_collection, collection_status, export_playlists, Analyzer, PlaylistOptions,
    TaggingWorkflow,
};

const DEFAULT_OPENAI_MODEL: &str = "o3";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_PACING_SECS: u64 = 5;
const DEFAULT_INVALID_TAG_PENALTY: u32 = 5;
const DEFAULT_PLAYLIST_DIR: &str = "playlists";

#[derive(Parser, Debug)]
#[command(name = "djcrate-tagger")]
#[command(about = "Taxonomy-constrained AI tagging for a music collection")]
#[command(version)]
struct Args {
    /// Path to a TOML config file (default: ~/.config/djcrate/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collection store JSON file
    #[arg(short, long)]
    store: Option<String>,

    /// Tag taxonomy text file
    #[arg(short, long)]
    taxonomy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one track and write its tags back to the store
    Analyze {
        /// Track to analyze: a filename or relative-path suffix.
        /// Omit to pick the first untagged track.
        track: Option<String>,

        /// Analysis backend: "openai" or "anthropic"
        #[arg(short, long)]
        backend: Option<String>,

        /// Let the model consult web sources while analyzing
        #[arg(long)]
        research: bool,
    },
    /// Analyze a run of untagged tracks
    Batch {
        /// How many tracks to attempt
        count: usize,

        /// Analysis backend: "openai" or "anthropic"
        #[arg(short, long)]
        backend: Option<String>,

        /// Let the model consult web sources while analyzing
        #[arg(long)]
        research: bool,

        /// Seconds to wait between tracks
        #[arg(long)]
        pacing: Option<u64>,
    },
    /// Strip AI-written fields from every track (dry run unless --apply)
    Clean {
        /// Persist the cleaned store instead of only reporting
        #[arg(long)]
        apply: bool,
    },
    /// Export one m3u8 playlist per taxonomy tag, grouped by category
    Playlists {
        /// Output directory for the playlist tree
        #[arg(short, long)]
        output: Option<String>,

        /// Skip tags with fewer matching tracks than this
        #[arg(long, default_value = "1")]
        min_tracks: usize,
    },
    /// Report tagging coverage for the collection
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "djcrate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => TomlConfig::load(path).context("Failed to load config file")?,
        None => TomlConfig::load_default_location()?,
    };

    let store_path = config::resolve_path(
        args.store.as_deref(),
        config::STORE_ENV,
        file_config.store.as_deref(),
        config::DEFAULT_STORE,
    );
    let taxonomy_path = config::resolve_path(
        args.taxonomy.as_deref(),
        config::TAXONOMY_ENV,
        file_config.taxonomy.as_deref(),
        config::DEFAULT_TAXONOMY,
    );
    let store = TrackStore::new(&store_path);

    match args.command {
        Command::Analyze {
            track,
            backend,
            research,
        } => {
            let workflow =
                build_workflow(&store, &taxonomy_path, &file_config, backend.as_deref(), research)?;
            run_analyze(&workflow, track.as_deref()).await
        }
        Command::Batch {
            count,
            backend,
            research,
            pacing,
        } => {
            let workflow =
                build_workflow(&store, &taxonomy_path, &file_config, backend.as_deref(), research)?;
            let pacing = Duration::from_secs(
                pacing
                    .or(file_config.pacing_secs)
                    .unwrap_or(DEFAULT_PACING_SECS),
            );
            run_batch(&workflow, count, pacing).await
        }
        Command::Clean { apply } => run_clean(&store, apply),
        Command::Playlists { output, min_tracks } => run_playlists(
            &store,
            &taxonomy_path,
            &file_config,
            output.as_deref(),
            min_tracks,
        ),
        Command::Status => run_status(&store),
    }
}

/// Assembles the tagging workflow, validating the taxonomy, the store, and
/// the backend credentials before any request is sent.
fn build_workflow(
    store: &TrackStore,
    taxonomy_path: &Path,
    file_config: &TomlConfig,
    backend_arg: Option<&str>,
    research: bool,
) -> Result<TaggingWorkflow> {
    let taxonomy =
        Taxonomy::load(taxonomy_path).context("Failed to load tag taxonomy")?;
    let collection = store
        .load()
        .context("Failed to load collection store")?;
    info!(
        store = %store.path().display(),
        tracks = collection.tracks.len(),
        tagged = collection.tagged_count(),
        taxonomy_tags = taxonomy.len(),
        "Startup validation passed"
    );

    let backend_name = config::resolve_string(
        backend_arg,
        config::BACKEND_ENV,
        file_config.backend.as_deref(),
        BackendKind::OpenAi.as_str(),
    );
    let kind: BackendKind = backend_name
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let timeout = Duration::from_secs(
        file_config
            .request_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );
    let (api_key, model) = match kind {
        BackendKind::OpenAi => (
            config::resolve_api_key(
                "OpenAI",
                "OPENAI_API_KEY",
                file_config.openai_api_key.as_deref(),
                "openai_api_key",
            )?,
            file_config
                .openai_model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        ),
        BackendKind::Anthropic => (
            config::resolve_api_key(
                "Anthropic",
                "ANTHROPIC_API_KEY",
                file_config.anthropic_api_key.as_deref(),
                "anthropic_api_key",
            )?,
            file_config
                .anthropic_model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
        ),
    };

    let backend = create_backend(
        kind,
        BackendConfig {
            api_key,
            model,
            timeout,
            web_research: research,
        },
    )?;
    let penalty = file_config
        .invalid_tag_penalty
        .unwrap_or(DEFAULT_INVALID_TAG_PENALTY);

    Ok(TaggingWorkflow::new(
        store.clone(),
        taxonomy,
        Analyzer::new(backend),
        penalty,
    ))
}

async fn run_analyze(workflow: &TaggingWorkflow, track: Option<&str>) -> Result<()> {
    match workflow.run_one(track).await? {
        TrackOutcome::Updated(report) => {
            println!("Updated: {}", report.filename);
            println!("  Mode:          {}", report.mode.as_str());
            println!("  Previous tags: {}", format_tags(&report.previous_tags));
            println!("  New tags:      {}", format_tags(&report.new_tags));
            println!("  Confidence:    {}", report.confidence);
            if !report.discarded.is_empty() {
                println!("  Discarded:     {}", report.discarded.join(", "));
            }
            println!("  Notes: {}", report.research_notes);
            Ok(())
        }
        TrackOutcome::NothingToDo => {
            println!("Every track is already tagged.");
            Ok(())
        }
        TrackOutcome::AnalysisFailed { filename, notes } => {
            eprintln!("Analysis failed for {filename}: {notes}");
            std::process::exit(1);
        }
        TrackOutcome::NotFound { identity } => {
            eprintln!("No track matched '{identity}'.");
            std::process::exit(1);
        }
    }
}

async fn run_batch(workflow: &TaggingWorkflow, count: usize, pacing: Duration) -> Result<()> {
    let cancel = CancellationToken::new();
    tokio::spawn(watch_for_interrupt(cancel.clone()));

    let summary = workflow.run_batch(count, pacing, cancel).await?;
    println!("Batch finished: {}", summary.stop_reason.as_str());
    println!("  Attempted: {}", summary.attempted);
    println!("  Updated:   {}", summary.updated);
    println!("  Failed:    {}", summary.failed);
    Ok(())
}

/// First Ctrl-C asks the batch to stop once the in-flight track is persisted;
/// a second Ctrl-C exits immediately.
async fn watch_for_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupt received: finishing the current track (Ctrl-C again to force quit)");
    cancel.cancel();
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Second interrupt: exiting now");
        std::process::exit(130);
    }
}

fn run_clean(store: &TrackStore, apply: bool) -> Result<()> {
    let mut collection = store.load().context("Failed to load collection store")?;
    let report = clean_collection(&mut collection);
    println!(
        "Cleaned {} tracks, removed {} AI-written fields.",
        report.tracks_cleaned, report.fields_removed
    );
    if apply {
        store.save(&collection)?;
        println!("Store updated: {}", store.path().display());
    } else {
        println!("Dry run only. Re-run with --apply to persist.");
    }
    Ok(())
}

fn run_playlists(
    store: &TrackStore,
    taxonomy_path: &Path,
    file_config: &TomlConfig,
    output: Option<&str>,
    min_tracks: usize,
) -> Result<()> {
    let taxonomy =
        Taxonomy::load(taxonomy_path).context("Failed to load tag taxonomy")?;
    let collection = store.load().context("Failed to load collection store")?;
    let output_dir = config::resolve_path(
        output,
        config::PLAYLIST_DIR_ENV,
        file_config.playlist_dir.as_deref(),
        DEFAULT_PLAYLIST_DIR,
    );

    let options = PlaylistOptions {
        output_dir,
        min_tracks,
    };
    let report = export_playlists(&collection, &taxonomy, &options)?;
    println!(
        "Wrote {} playlists under {} ({} tags below the {} track threshold).",
        report.written,
        options.output_dir.display(),
        report.skipped,
        options.min_tracks
    );
    for (category, written) in &report.by_category {
        println!("  {category}: {written}");
    }
    Ok(())
}

fn run_status(store: &TrackStore) -> Result<()> {
    let collection = store.load().context("Failed to load collection store")?;
    let report = collection_status(&collection);
    println!("Collection: {}", store.path().display());
    println!("  Tracks:        {}", report.total_tracks);
    println!(
        "  Tagged:        {} ({:.1}%)",
        report.tagged,
        report.tagged_percent()
    );
    println!("  Untagged:      {}", report.untagged);
    println!("  Distinct tags: {}", report.distinct_tags);
    match &report.next_untagged {
        Some(filename) => println!("  Next untagged: {filename}"),
        None => println!("  Next untagged: (none)"),
    }
    Ok(())
}

fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        "(none)".to_string()
    } else {
        tags.join(", ")
    }
}
