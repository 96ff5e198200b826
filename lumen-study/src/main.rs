//! Lumen study tools (lumen-study) - Main entry point
//!
//! Command-line front end for the study core: flashcard scheduling, the
//! review queue, embedding job tracking and mindmap cache checks.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumen_common::config::{resolve_config_path, LoggingConfig, TomlConfig, CONFIG_ENV_VAR};
use lumen_common::events::{EventBus, JobStatus, LumenEvent};
use lumen_study::cache::{
    cache_key, needs_refresh, MindmapSession, ResultCache, SelectionStep, StepOutcome,
};
use lumen_study::embedding::{EmbeddingStatusClient, EmbeddingTracker, TrackerConfig};
use lumen_study::srs::{due_cards, schedule, CardSchedule, ReviewRecord};
use serde::de::DeserializeOwned;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for lumen-study
#[derive(Parser, Debug)]
#[command(name = "lumen-study")]
#[command(about = "Study tools for Lumen: flashcard scheduling and embedding tracking")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Embedding service base URL (overrides config file)
    #[arg(long, global = true, env = "LUMEN_EMBED_URL")]
    base_url: Option<String>,

    /// User id sent with embedding status queries (overrides config file)
    #[arg(long, global = true, env = "LUMEN_USER_ID")]
    user_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule the next review of a card and print the new record as JSON
    Review {
        /// Recall quality, 0 (blackout) to 5 (perfect)
        #[arg(short, long, value_parser = clap::value_parser!(i32).range(0..=5))]
        quality: i32,

        /// JSON file holding the card's current record; omit for a new card
        #[arg(short, long)]
        record: Option<PathBuf>,
    },

    /// List the cards of a deck that are due for review
    Due {
        /// JSON array of cards with optional review records
        #[arg(short, long)]
        deck: PathBuf,

        /// Maximum number of cards to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Follow an embedding job until it completes or fails
    Track {
        /// Job (document) id to track
        job_id: String,
    },

    /// Check whether a mindmap cached for one selection is stale
    RefreshCheck {
        /// Document ids the cached mindmap was built from
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        previous: Vec<String>,

        /// Currently selected document ids
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        current: Vec<String>,
    },

    /// Replay a sequence of document selections through the mindmap cache
    Mindmap {
        /// JSON array of selection steps
        #[arg(short, long)]
        session: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command-line arguments
    let args = Args::parse();

    // Config file priority: CLI > env > platform config dir > defaults
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);

    // Logging level comes from the config file unless RUST_LOG is set
    let log_level = config_path
        .as_deref()
        .and_then(|path| TomlConfig::load(path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| LoggingConfig::default().level);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = TomlConfig::load_or_default(config_path.as_deref());
    if let Some(base_url) = args.base_url {
        config.embedding.base_url = base_url;
    }
    if let Some(user_id) = args.user_id {
        config.embedding.user_id = Some(user_id);
    }

    match args.command {
        Command::Review { quality, record } => run_review(quality, record.as_deref()),
        Command::Due { deck, limit } => run_due(&deck, limit),
        Command::Track { job_id } => run_track(job_id, &config).await,
        Command::RefreshCheck { previous, current } => run_refresh_check(&previous, &current),
        Command::Mindmap { session } => {
            let cache = ResultCache::new(config.cache.ttl());
            run_mindmap(&session, &cache)
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> lumen_study::Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn run_review(quality: i32, record: Option<&Path>) -> Result<ExitCode> {
    let existing: Option<ReviewRecord> = record
        .map(|path| {
            read_json(path)
                .with_context(|| format!("Failed to read review record {}", path.display()))
        })
        .transpose()?;

    let next = schedule(existing.as_ref(), quality, lumen_common::time::now());
    info!(
        quality,
        interval = next.interval,
        ease_factor = next.ease_factor,
        "Scheduled next review"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&next).context("Failed to serialize review record")?
    );
    Ok(ExitCode::SUCCESS)
}

fn run_due(deck: &Path, limit: Option<usize>) -> Result<ExitCode> {
    let cards: Vec<CardSchedule> =
        read_json(deck).with_context(|| format!("Failed to read deck {}", deck.display()))?;

    let due = due_cards(&cards, lumen_common::time::now(), limit);
    info!("{} of {} cards due", due.len(), cards.len());

    for card in due {
        println!("{}", card.card_id);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_track(job_id: String, config: &TomlConfig) -> Result<ExitCode> {
    let embedding = &config.embedding;
    let user_id = embedding
        .user_id
        .clone()
        .context("No user id configured (use --user-id, LUMEN_USER_ID or embedding.user_id)")?;

    let client =
        EmbeddingStatusClient::new(&embedding.base_url, user_id, embedding.request_timeout())
            .context("Failed to create embedding status client")?;

    let event_bus = EventBus::new(100);
    let mut events = event_bus.subscribe();
    debug!(
        subscribers = event_bus.subscriber_count(),
        capacity = event_bus.capacity(),
        "Event bus ready"
    );
    let tracker = EmbeddingTracker::with_event_bus(
        Arc::new(client),
        TrackerConfig::from(embedding),
        event_bus,
    );

    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event logger lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut state_rx = tracker.subscribe();
    tracker.start(job_id.clone());

    let final_state = tokio::select! {
        result = state_rx.wait_for(|state| state.status.is_terminal()) => {
            result.context("Embedding tracker stopped unexpectedly")?.clone()
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, giving up on job {}", job_id);
            tracker.fail();
            tracker.state()
        }
    };

    // Let the logger drain the terminal event before shutting it down
    tokio::task::yield_now().await;
    event_logger.abort();

    println!("{}: {:?} ({:.1}%)", job_id, final_state.status, final_state.progress);

    if final_state.status == JobStatus::Failed {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn log_event(event: &LumenEvent) {
    debug!(event_type = event.event_type(), "Tracker event");
    match event {
        LumenEvent::EmbeddingStarted { job_id, .. } => info!("Embedding job {} started", job_id),
        LumenEvent::EmbeddingProgress { job_id, progress, .. } => {
            info!("Embedding job {}: ~{:.1}%", job_id, progress)
        }
        LumenEvent::EmbeddingCompleted { job_id, reason, .. } => {
            info!("Embedding job {} completed ({:?})", job_id, reason)
        }
        LumenEvent::EmbeddingFailed { job_id, progress, .. } => {
            warn!("Embedding job {} failed at ~{:.1}%", job_id, progress)
        }
    }
}

fn run_refresh_check(previous: &[String], current: &[String]) -> Result<ExitCode> {
    let stale = needs_refresh(previous, current);
    match cache_key(current) {
        Some(key) => info!(key = %key, stale, "Checked mindmap cache"),
        None => info!(stale, "Checked mindmap cache with empty selection"),
    }

    println!("{}", if stale { "refresh" } else { "up-to-date" });
    Ok(ExitCode::SUCCESS)
}

fn run_mindmap(session_file: &Path, cache: &ResultCache) -> Result<ExitCode> {
    let steps: Vec<SelectionStep> = read_json(session_file)
        .with_context(|| format!("Failed to read session {}", session_file.display()))?;

    let mut session = MindmapSession::new(cache);
    for step in &steps {
        let key = cache_key(&step.document_ids).unwrap_or_default();
        let outcome = match session.apply(step) {
            StepOutcome::Reused(_) => "reused",
            StepOutcome::Cached(_) => "cached",
            StepOutcome::Stored => "stored",
            StepOutcome::Missing => "missing",
        };
        println!("[{}] {}", key, outcome);
    }

    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.entry_count,
        "Mindmap cache hit rate {:.0}%",
        stats.hit_rate() * 100.0
    );
    Ok(ExitCode::SUCCESS)
}
