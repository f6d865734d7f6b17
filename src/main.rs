use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use domfuzz::config as cfg;
use domfuzz::dom::{FamilyEventFactory, MemoryWordlists, SimDocument};
use domfuzz::engine::{RunConfig, RunController, RunNotice, RunOutcome};
use domfuzz::sources::{self, ControlRequest};

/// Domfuzz CLI
#[derive(Debug, Parser)]
#[command(
    name = domfuzz::PKG_NAME,
    version = domfuzz::PKG_VERSION,
    about = "A data-driven fuzzing engine for live documents"
)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config", default_value = "config/default.json")]
    config: PathBuf,

    /// Run a single action (by id or name) against the simulated document and exit
    #[arg(long = "action")]
    action: Option<String>,

    /// Override the action's concurrency limit
    #[arg(long = "concurrency")]
    concurrency: Option<u32>,

    /// Log the owning combination whenever a side effect runs
    #[arg(long = "log-combinations")]
    log_combinations: bool,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Print the JSON Schema for the configuration and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Honor --log-level by initializing tracing directly at that level.
    if let Some(level) = &args.log_level {
        let level = match level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        };
        let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    }

    if args.log_level.is_none() {
        domfuzz::init_tracing();
    }
    info!(
        version = domfuzz::PKG_VERSION,
        config = %args.config.display(),
        "Starting Domfuzz"
    );

    if args.print_schema {
        let schema = cfg::generate_schema();
        let json = serde_json::to_string_pretty(&schema)?;
        println!("{json}");
        return Ok(());
    }

    // Load configuration
    let config = cfg::load_from_path_async(&args.config).await?;
    debug!(target: "domfuzz", "Configuration loaded successfully");

    // Build the collaborators and the controller around them. The simulated
    // document records what a live integration would mutate.
    let document = Arc::new(SimDocument::new(&config.elements));
    let wordlists = Arc::new(MemoryWordlists::new(&config.wordlists));
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<RunNotice>();
    let controller = Arc::new(RunController::new(
        wordlists,
        document.clone(),
        Arc::new(FamilyEventFactory),
        Arc::new(notice_tx),
    ));

    // One-shot mode: run one action to a terminal state and exit.
    if let Some(key) = &args.action {
        let Some(action) = config.action(key) else {
            bail!("No action with id or name '{key}' in the configuration");
        };
        let run_config = RunConfig {
            concurrency_override: args.concurrency,
            log_combinations: args.log_combinations,
        };

        let outcome = controller.start(action.clone(), run_config).await?;
        info!(
            side_effects = document.side_effect_count(),
            outcome = %outcome,
            "Action finished"
        );
        if let RunOutcome::Failed(detail) = outcome {
            bail!("Run failed: {detail}");
        }
        return Ok(());
    }

    // Source-driven mode: serve control requests until the sources dry up or
    // Ctrl+C arrives.
    let source_list = sources::build_sources_from_config(&config);
    if source_list.is_empty() {
        warn!("No control sources configured. The engine will wait for Ctrl+C and then exit.");
    }

    let (tx, mut rx) = mpsc::channel::<ControlRequest>(256);
    let _handles = sources::spawn_all_sources(&source_list, tx);

    loop {
        tokio::select! {
            maybe_request = rx.recv() => {
                let Some(request) = maybe_request else { break };
                dispatch_request(request, &config, &controller);
            }

            Some(notice) = notice_rx.recv() => {
                match &notice.outcome {
                    RunOutcome::Completed => info!(
                        action_id = %notice.action_id,
                        side_effects = document.side_effect_count(),
                        "Run completed"
                    ),
                    RunOutcome::Aborted => info!(action_id = %notice.action_id, "Run aborted"),
                    RunOutcome::Failed(detail) => error!(
                        action_id = %notice.action_id,
                        detail = %detail,
                        "Run failed"
                    ),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    info!("Domfuzz exited");
    Ok(())
}

/// Route one control request to the controller.
fn dispatch_request(
    request: ControlRequest,
    config: &cfg::Config,
    controller: &Arc<RunController>,
) {
    match request {
        ControlRequest::Run {
            action_id,
            concurrency,
            log_combinations,
        } => {
            let Some(action) = config.action(&action_id) else {
                error!(%action_id, "Run request for unknown action");
                return;
            };
            let action = action.clone();
            let run_config = RunConfig {
                concurrency_override: concurrency,
                log_combinations,
            };
            let controller = controller.clone();
            // The run owns its own task; the main loop stays responsive for
            // cancel/status requests. Rejections (AlreadyRunning) are logged
            // here, terminal outcomes arrive via the notice channel.
            tokio::spawn(async move {
                if let Err(e) = controller.start(action, run_config).await {
                    error!(error = %e, "Run request rejected");
                }
            });
        }

        ControlRequest::Cancel { action_id } => {
            if let Err(e) = controller.cancel() {
                warn!(%action_id, error = %e, "Cancel request ignored");
            }
        }

        ControlRequest::Status => {
            info!(
                running = controller.is_running(),
                last_combination = ?controller.last_combination(),
                "Status"
            );
        }
    }
}
