//! Encore Replay (encore-replay) - Main entry point
//!
//! Loads a music library, attaches a simulated engine to a playback state
//! manager and replays a session script against it. Every playback event is
//! printed to stdout as one JSON line, followed by the final queue. Logs go to
//! stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use encore_common::{EncoreConfig, Library, MusicRepository};
use encore_playback::db::{MemoryPersistence, PersistenceRepository, SqlitePersistence};
use encore_playback::playback::{
    CommandFactory, EngineStateHolder, PlaybackEvent, PlaybackStateManager, Queue, SimulatedEngine,
};
use encore_playback::replay::{parse_script, Replay};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for encore-replay
#[derive(Parser, Debug)]
#[command(name = "encore-replay")]
#[command(about = "Replay a scripted playback session against a simulated engine")]
#[command(version)]
struct Args {
    /// Library records (JSON)
    #[arg(short, long)]
    library: PathBuf,

    /// Session script, one command per line
    #[arg(short, long)]
    script: PathBuf,

    /// Configuration file (overrides ENCORE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for queue shuffling
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config =
        EncoreConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Logs on stderr; stdout carries the event stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let library = Library::from_json_file(&args.library)
        .with_context(|| format!("Failed to load library from {}", args.library.display()))?;
    info!(songs = library.songs().len(), "Library loaded");
    let music = MusicRepository::with_library(library);

    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let commands = parse_script(&script).context("Invalid session script")?;

    let persistence: Arc<dyn PersistenceRepository> = match &config.persistence.database_path {
        Some(path) => Arc::new(
            SqlitePersistence::open(path)
                .await
                .with_context(|| format!("Failed to open database {}", path.display()))?,
        ),
        None => Arc::new(MemoryPersistence::new()),
    };

    let manager = Arc::new(PlaybackStateManager::with_persistence(&config.playback, persistence));
    let mut events = manager.subscribe();

    let factory = CommandFactory::new(
        music.clone(),
        config.sort.clone(),
        config.playback.keep_shuffle,
        manager.reader(),
    );
    let queue = match args.seed {
        Some(seed) => Queue::with_seed(seed),
        None => Queue::new(),
    };
    let holder = EngineStateHolder::new(
        SimulatedEngine::new(),
        music.clone(),
        factory.clone(),
        config.playback.clone(),
    )
    .with_queue(queue);

    let handle = manager
        .register_holder(Box::new(holder))
        .await
        .context("Failed to attach playback state holder")?;
    print_events(&mut events)?;

    let replay = Replay::new(manager.clone(), handle, factory, music);
    let run = async {
        for (line, command) in &commands {
            if let Err(e) = replay.run(command).await {
                warn!(line, "Command {:?} failed: {}", command, e);
            }
            print_events(&mut events)?;
        }
        anyhow::Ok(())
    };

    tokio::select! {
        result = run => result?,
        _ = shutdown_signal() => info!("Interrupted, stopping replay"),
    }

    let snapshot = manager.snapshot();
    // An ended session was already saved
    if !snapshot.queue.is_empty() {
        manager.save_now().await.context("Failed to save playback state")?;
    }

    let final_queue = serde_json::json!({
        "queue": snapshot.queue.resolve().iter().map(|s| s.id).collect::<Vec<_>>(),
        "index": snapshot.queue.index,
        "shuffled": snapshot.is_shuffled(),
        "repeat_mode": snapshot.repeat_mode,
        "phase": snapshot.phase,
    });
    println!("{}", final_queue);
    Ok(())
}

/// Print every event received so far as a JSON line
fn print_events(events: &mut broadcast::Receiver<PlaybackEvent>) -> Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => println!("{}", serde_json::to_string(&event)?),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                warn!(missed, "Event stream lagged, some events were not printed");
            }
            Err(_) => return Ok(()),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
