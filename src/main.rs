//! am-access-filter
//!
//! An HTTP server that runs every request past an identity-provider agent
//! before it reaches the upstream.
//!
//! ```text
//!     Client ──▶ listener ──▶ access filter ──▶ agent decision
//!                                 │                  │
//!                                 │  declined        │ 302 / 403 / 500
//!                                 ▼                  ▼
//!                             upstream           response
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use am_access_filter::agent::{AgentRuntime, LocalAgent};
use am_access_filter::config::load_config;
use am_access_filter::http::HttpServer;
use am_access_filter::lifecycle::{signals::wait_for_signal, Shutdown};
use am_access_filter::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "am-access-filter")]
#[command(about = "Access filter delegating decisions to an identity-provider agent", long_about = None)]
struct Cli {
    /// Path to the filter configuration file
    #[arg(short, long, default_value = "am-access-filter.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    if cli.check {
        tracing::info!(path = ?cli.config, "Configuration is valid");
        return Ok(());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "am-access-filter starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        upstream = ?config.upstream.address,
        cookie_merge = ?config.filter.cookie_merge,
        "Configuration loaded"
    );

    let runtime = Arc::new(AgentRuntime::start(LocalAgent::new(), &config.agent)?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, runtime.clone());
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let early_exit = tokio::select! {
        _ = wait_for_signal() => None,
        finished = &mut server_task => Some(finished),
    };
    let finished = match early_exit {
        Some(finished) => finished,
        None => {
            shutdown.trigger();
            server_task.await
        }
    };

    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Server exited with error"),
        Err(e) => tracing::error!(error = %e, "Server task failed"),
    }

    runtime.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}
