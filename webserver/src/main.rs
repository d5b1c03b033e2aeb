//! Render service entry point
//!
//! Wires a worker-process session into the lifecycle supervisor, exposes it
//! over HTTP, and registers the OS-signal shutdown hooks that drain the
//! supervisor before exit.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;

use renderer::config::ProcessConfig;
use renderer::traits::Renderer;
use renderer::{Lifetime, ProcessRenderer};
use webserver::{AppState, WebServerError, WebServerResult};

/// Grace period granted to the supervisor on SIGINT/SIGTERM.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "HTTP front door for a supervised external render worker")]
struct Args {
    /// Port for the HTTP server
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Path to the worker executable
    #[arg(long)]
    executable: PathBuf,

    /// Extra argument passed to the worker (repeatable)
    #[arg(long = "worker-arg")]
    worker_args: Vec<String>,

    /// Timezone exported to the worker process environment
    #[arg(long, default_value = "UTC")]
    timezone: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds of inactivity before the worker is retired
    #[arg(long)]
    idle_shutdown_sec: Option<f64>,

    /// Maximum seconds a single worker instance may live
    #[arg(long)]
    max_lifetime_sec: Option<f64>,

    /// Steady-state page-load budget in seconds
    #[arg(long)]
    page_load_sec: Option<f64>,
}

impl Args {
    fn process_config(&self) -> ProcessConfig {
        let mut config = ProcessConfig {
            executable: self.executable.clone(),
            args: self.worker_args.clone(),
            ..Default::default()
        };
        config
            .env
            .insert("TZ".to_string(), self.timezone.clone());

        if let Some(idle) = self.idle_shutdown_sec {
            config.lifetime.idle_shutdown_sec = idle;
        }
        if let Some(max) = self.max_lifetime_sec {
            config.lifetime.max_lifetime_sec = max;
        }
        if let Some(page_load) = self.page_load_sec {
            config.timeouts.page_load = page_load;
        }

        config
    }
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    let args = Args::parse();
    renderer::logging::init_tracing(Some(&args.log_level));

    // configuration faults surface here, before the server binds
    let session = ProcessRenderer::new(args.process_config())?;
    let supervisor = Arc::new(Lifetime::new(session));

    let state = Arc::new(AppState::new(Arc::clone(&supervisor)));
    let app = webserver::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|error| WebServerError::startup(format!("failed to bind {addr}: {error}")))?;
    tracing::info!(%addr, "render service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(supervisor))
        .await
        .map_err(|error| WebServerError::startup(error.to_string()))?;

    tracing::info!("render service stopped");
    Ok(())
}

/// Shutdown hooks live at this boundary, not in the core: SIGINT/SIGTERM
/// drain the supervisor (monitor and worker process) before the server
/// finishes.
async fn shutdown_signal<R: Renderer + 'static>(supervisor: Arc<Lifetime<R>>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received; stopping renderer");
    supervisor.shutdown(Some(SHUTDOWN_GRACE)).await;
}
