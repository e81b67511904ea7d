use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use passivedns_domain::config::CliOverrides;
use passivedns_domain::Config;
use passivedns_infrastructure::CaptureServer;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

mod bootstrap;

#[derive(Parser)]
#[command(name = "passivedns")]
#[command(version)]
#[command(about = "Passive DNS capture daemon - collects resolver responses over dnstap")]
struct Cli {
    /// Path to the dnstap Unix socket to create, or a frame file to replay
    #[arg(short = 'i', long, value_name = "PATH")]
    input: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Dump every decoded message to stdout
    #[arg(long)]
    text: bool,

    /// Write one JSON object per extracted answer to stdout
    #[arg(long)]
    json: bool,

    /// Write answers to this SQLite database
    #[arg(long, value_name = "FILE")]
    sqlite: Option<String>,

    /// Answers buffered per worker before a flush
    #[arg(long)]
    batch_size: Option<usize>,

    /// Worker task count (0 = one per logical CPU)
    #[arg(long)]
    workers: Option<usize>,

    /// Ingestion queue capacity (0 = eight slots per worker)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        input: cli.input,
        text: cli.text,
        json: cli.json,
        sqlite_path: cli.sqlite,
        batch_size: cli.batch_size,
        workers: cli.workers,
        queue_capacity: cli.queue_capacity,
        log_level: cli.log_level,
    };

    let config = Config::load(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);
    config.validate()?;

    info!("Starting passivedns v{}", env!("CARGO_PKG_VERSION"));

    let pool = if config.sinks.sqlite {
        Some(bootstrap::init_database(&config).await?)
    } else {
        None
    };
    let factory = bootstrap::sink_factory(&config, pool);

    let server = Arc::new(CaptureServer::new(
        config.capture.effective_workers(),
        config.capture.effective_queue_capacity(),
        config.capture.max_frame_size,
        factory,
    ));

    // Stop the server on SIGINT and SIGTERM; workers drain and flush
    // before the process exits.
    {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let mut sigint = signal(SignalKind::interrupt()).expect("signal handler");
            let mut sigterm = signal(SignalKind::terminate()).expect("signal handler");
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            info!("Signal received, shutting down");
            server.shutdown().await;
        });
    }

    let input = config.input.clone().expect("input validated");
    let idle_timeout = match config.capture.idle_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    if replay_file(&input) {
        run_file(&server, &input).await?;
    } else {
        run_socket(&server, &input, idle_timeout).await?;
    }

    server.wait().await;
    info!("passivedns stopped");
    Ok(())
}

/// An input path that exists as a regular file is replayed; anything else
/// (a stale socket, or nothing yet) means socket mode.
fn replay_file(path: &str) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.file_type().is_file())
        .unwrap_or(false)
}

/// Removes a stale socket left by a previous run; refuses to clobber
/// anything that is not a socket.
fn prepare_socket_path(path: &str) -> anyhow::Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) => {
            if meta.file_type().is_socket() {
                std::fs::remove_file(path)?;
            } else {
                anyhow::bail!("\"{path}\" exists and is not a Unix socket");
            }
        }
        Err(_) => {
            let parent = Path::new(path).parent().unwrap_or_else(|| Path::new("."));
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!("\"{}\" invalid path", parent.display());
            }
        }
    }
    Ok(())
}

async fn run_socket(
    server: &Arc<CaptureServer>,
    path: &str,
    idle_timeout: Option<Duration>,
) -> anyhow::Result<()> {
    prepare_socket_path(path)?;
    let listener = UnixListener::bind(path)?;
    info!(socket = path, "Unix socket created, waiting for connections");

    loop {
        tokio::select! {
            _ = server.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    info!("Connection accepted");
                    if server.attach(stream, true, idle_timeout).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!(error = %e, "Accept failed"),
            }
        }
    }

    let _ = std::fs::remove_file(path);
    Ok(())
}

async fn run_file(server: &Arc<CaptureServer>, path: &str) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(path).await?;
    info!(file = path, "Replaying frame file");
    server
        .attach(file, false, None)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    // Drain the file completely, then run the normal shutdown so every
    // buffered answer flushes.
    server.wait_sources().await;
    server.shutdown().await;
    Ok(())
}
