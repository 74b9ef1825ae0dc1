/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Running wall keeping bots with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use pegwall_mm_strategy::{BotConfig, TaskManager};

#[derive(Parser, Debug)]
#[command(name = "pegwall-mm-strategy", version, about = "Pegged unit wall keeping bot runner")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Also write daily rolling log files into this directory
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let _log_guard = init_tracing(&args.log_level, args.log_dir.as_deref())?;

    info!(
        config_path = %args.config_path.display(),
        dry_run = args.dry_run,
        "starting pegwall-mm-strategy"
    );

    let config = load_config(&args.config_path)?;
    info!(bot_count = config.bots.len(), "configuration loaded");

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let mut task_manager = TaskManager::new();
    let stop = CancellationToken::new();
    setup_signal_handlers(stop.clone(), task_manager.interrupt_token());

    info!("spawning bots");
    task_manager
        .spawn_from_config(&config)
        .context("spawn bots from config")?;
    info!("bots started");

    let mut poll = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                info!("shutdown signal received");
                break;
            }
            _ = poll.tick() => {
                if task_manager.all_finished() {
                    warn!("all bots exited on their own");
                    break;
                }
            }
        }
    }

    task_manager
        .shutdown_and_wait()
        .await
        .context("shutdown bots")?;
    info!("bots shutdown complete");

    Ok(())
}

fn init_tracing(log_level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create log dir {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "pegwall.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(guard)
}

fn load_config(path: &Path) -> Result<BotConfig> {
    let path_str = path
        .to_str()
        .context("config path must be valid utf-8")?;
    BotConfig::from_file(path_str).context("load config")
}

/// First signal stops bots gracefully; a second one interrupts them.
fn setup_signal_handlers(stop: CancellationToken, interrupt: CancellationToken) {
    let escalate = move |source: &'static str| {
        if stop.is_cancelled() {
            warn!(source, "second signal; interrupting bots");
            interrupt.cancel();
        } else {
            info!(source, "graceful stop requested");
            stop.cancel();
        }
    };

    let on_sigint = escalate.clone();
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to install SIGINT handler");
                return;
            }
            on_sigint("SIGINT");
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let on_sigterm = escalate;
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    while stream.recv().await.is_some() {
                        on_sigterm("SIGTERM");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
