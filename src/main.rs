//! Cache Proxy - A cache-aside HTTP proxy backed by Redis
//!
//! `cache-proxy start` serves the proxy and records its PID;
//! `cache-proxy stop` signals the recorded process.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cache_proxy::api::{create_router, AppState};
use cache_proxy::config::ServerConfig;
use cache_proxy::lifecycle;
use cache_proxy::CacheProxy;

#[derive(Parser, Debug)]
#[command(name = "cache-proxy", version, about = "Cache-aside HTTP proxy backed by Redis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the proxy server (default)
    Start(StartArgs),
    /// Stop the server recorded in the PID file
    Stop(StopArgs),
}

#[derive(Args, Debug, Default)]
struct StartArgs {
    /// Listener host (overrides HTTP_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listener port (overrides HTTP_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct StopArgs {
    /// Kill the process instead of asking it to shut down
    #[arg(short, long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server_config = ServerConfig::from_env().context("Invalid server configuration")?;
    let _log_guard = init_tracing(server_config.log_file.as_deref());

    match cli.command.unwrap_or(Command::Start(StartArgs::default())) {
        Command::Start(args) => run_server(server_config, args).await,
        Command::Stop(args) => {
            let pid = lifecycle::stop_server(
                &server_config.pid_file,
                args.force,
                env!("CARGO_BIN_NAME"),
            )?;
            info!("Stopped server process {}", pid);
            Ok(())
        }
    }
}

/// Console logging filtered by `RUST_LOG`, plus a plain-text file layer
/// when `LOG_FILE` is set. The returned guard flushes the file on drop.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cache_proxy=info,tower_http=info".into());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "cache-proxy.log".into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Startup sequence:
/// 1. Connect the shared proxy (validates config, applies store settings)
/// 2. Bind the listener
/// 3. Record the PID
/// 4. Serve until SIGINT/SIGTERM, then remove the PID file
async fn run_server(config: ServerConfig, args: StartArgs) -> Result<()> {
    info!("Starting cache proxy");

    let proxy = CacheProxy::instance()
        .await
        .context("Failed to initialize the proxy")?;
    let app = create_router(AppState::new(proxy));

    let host = args.host.unwrap_or_else(|| config.http_host.clone());
    let port = args.port.unwrap_or(config.http_port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    let addr = listener.local_addr()?;

    let pid = lifecycle::write_pid_file(&config.pid_file)?;
    info!("Server listening on http://{} (pid {})", addr, pid);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    lifecycle::remove_pid_file(&config.pid_file)?;
    served?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
