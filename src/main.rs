//! DALI Monitor: DALI-2 telemetry collection and analytics service
//!
//! Receives gateway broadcasts on UDP (or replays a hex capture), stores one
//! sample per frame and serves the analytics API over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Listen for gateway broadcasts on the configured port
//! dali-monitor
//!
//! # Replay a capture file into an in-memory store
//! dali-monitor --replay frames.hex --memory
//! ```

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dali_monitor::acquisition::bind_udp;
use dali_monitor::analytics::{AnalyticsService, Calendar};
use dali_monitor::api::{create_app, ApiState};
use dali_monitor::config::{defaults, MonitorConfig, StorageBackend};
use dali_monitor::pipeline::{FrameSource, IngestPipeline, ProcessingLoop, ReplaySource, UdpSource};
use dali_monitor::registry::{GearRegistry, StaticRegistry};
use dali_monitor::storage::{InMemorySampleStore, SampleStore, SledSampleStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "dali-monitor")]
#[command(about = "DALI-2 lighting telemetry monitor")]
#[command(version)]
struct CliArgs {
    /// Configuration file (default search: $DALI_MONITOR_CONFIG, ./dali_monitor.toml)
    #[arg(short, long, env = "DALI_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the UDP listener address (default: "0.0.0.0:6666")
    #[arg(long, value_name = "HOST:PORT")]
    udp_bind: Option<String>,

    /// Override the HTTP server address (default: "0.0.0.0:8000")
    #[arg(short, long)]
    addr: Option<String>,

    /// Replay hex-encoded frames from a file instead of listening on UDP
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Delay between replayed frames in milliseconds
    #[arg(long, default_value_t = defaults::REPLAY_DELAY_MS)]
    replay_delay_ms: u64,

    /// Override the gear registry file
    #[arg(long, value_name = "FILE")]
    registry: Option<PathBuf>,

    /// Keep samples in memory only (nothing is written to disk)
    #[arg(long)]
    memory: bool,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    FrameProcessor,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::FrameProcessor => write!(f, "FrameProcessor"),
        }
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn load_config(args: &CliArgs) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MonitorConfig::load(),
    };

    if let Some(bind) = &args.udp_bind {
        config.listener.bind = bind.clone();
    }
    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }
    if let Some(path) = &args.registry {
        config.registry.path = path.clone();
    }
    if args.memory {
        config.storage.backend = StorageBackend::Memory;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_registry(config: &MonitorConfig) -> Result<Arc<dyn GearRegistry>> {
    let path = &config.registry.path;
    let registry = if path.exists() {
        StaticRegistry::load(path).context("Failed to load gear registry")?
    } else {
        warn!(
            path = %path.display(),
            "Registry file not found, every frame will be dropped as unknown gear"
        );
        StaticRegistry::empty()
    };
    info!(gears = registry.len(), backend = registry.backend_name(), "Gear registry ready");
    Ok(Arc::new(registry))
}

fn open_store(config: &MonitorConfig) -> Result<Arc<dyn SampleStore>> {
    let store: Arc<dyn SampleStore> = match config.storage.backend {
        StorageBackend::Sled => {
            let path = &config.storage.path;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Arc::new(
                SledSampleStore::open(path)
                    .with_context(|| format!("Failed to open sample store {}", path.display()))?,
            )
        }
        StorageBackend::Memory => {
            warn!("In-memory sample store: data is lost on restart");
            Arc::new(InMemorySampleStore::new())
        }
    };
    info!(backend = store.backend_name(), "Sample store ready");
    Ok(store)
}

// ============================================================================
// Task Spawning
// ============================================================================

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Spawn the frame processing loop over any frame source.
fn spawn_frame_processor<S: FrameSource>(
    task_set: &mut JoinSet<Result<TaskName>>,
    mut source: S,
    pipeline: IngestPipeline,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[FrameProcessor] Task starting ({})", source.source_name());
        match ProcessingLoop::new(pipeline, cancel_token).run(&mut source).await {
            Ok(stats) => {
                info!(
                    received = stats.received,
                    stored = stats.stored,
                    invalid = stats.invalid,
                    unknown_gear = stats.unknown_gear,
                    source_errors = stats.source_errors,
                    "[FrameProcessor] Stopped"
                );
                Ok(TaskName::FrameProcessor)
            }
            Err(e) => {
                error!("[FrameProcessor] Frame source failed: {:#}", e);
                Err(e.context("frame processor stopped"))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    info!("DALI Monitor v{}", env!("CARGO_PKG_VERSION"));

    let calendar = Calendar::new(config.analytics.utc_offset_minutes)
        .context("UTC offset out of range")?;
    let registry = open_registry(&config)?;
    let store = open_store(&config)?;

    let pipeline = IngestPipeline::new(Arc::clone(&registry), Arc::clone(&store));
    let analytics = AnalyticsService::new(
        registry,
        Arc::clone(&store),
        calendar,
        config.analytics.clone(),
    );
    let app = create_app(ApiState::new(analytics, calendar, Arc::clone(&store), pipeline.stats()));

    let server_addr = config.server.bind_addr().context("Invalid HTTP bind address")?;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {}", server_addr))?;
    info!("HTTP API listening on http://{}", server_addr);

    let cancel_token = CancellationToken::new();
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    match &args.replay {
        Some(path) => {
            let source = ReplaySource::from_file(path, args.replay_delay_ms)?;
            info!(path = %path.display(), "Replaying capture file");
            spawn_frame_processor(&mut task_set, source, pipeline, cancel_token.clone());
        }
        None => {
            let udp_addr = config.listener.bind_addr().context("Invalid UDP bind address")?;
            let socket = bind_udp(udp_addr, config.listener.recv_buffer_bytes)
                .with_context(|| format!("Failed to bind UDP listener to {}", udp_addr))?;
            spawn_frame_processor(&mut task_set, UdpSource::new(socket), pipeline, cancel_token.clone());
        }
    }

    // Ctrl+C cancels every task
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    let outcome = run_supervisor(&mut task_set, cancel_token).await;

    // Drain remaining tasks so in-flight frames reach the store before flushing
    while task_set.join_next().await.is_some() {}

    if let Err(e) = store.flush() {
        error!(error = %e, "Failed to flush sample store");
    }
    info!("DALI Monitor shut down");
    outcome
}
