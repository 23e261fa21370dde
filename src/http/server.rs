//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the downstream handler
//! - Wire up middleware (request ID, tracing, timeout, access filter)
//! - Serve plain HTTP or TLS on the given listener
//! - Stop gracefully when shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::agent::oracle::DecisionOracle;
use crate::agent::runtime::AgentRuntime;
use crate::config::FilterConfig;
use crate::filter::handler::AccessHandler;
use crate::http::middleware::{access_filter_middleware, AccessFilterState};
use crate::http::request::MakeRequestUuid;
use crate::http::upstream::{upstream_handler, UpstreamState};

/// HTTP server fronted by the access filter.
pub struct HttpServer {
    router: Router,
    config: FilterConfig,
}

impl HttpServer {
    /// Create a new HTTP server deciding access with `runtime`'s agent.
    pub fn new<O: DecisionOracle>(config: FilterConfig, runtime: Arc<AgentRuntime<O>>) -> Self {
        let handler = Arc::new(AccessHandler::new(
            runtime,
            config.filter.cookie_merge,
            config.filter.arena_bytes,
        ));
        let filter = AccessFilterState {
            handler,
            is_secure: config.listener.tls.is_some(),
        };

        let upstream_address = config.upstream.address.as_deref().and_then(|address| {
            address
                .parse::<SocketAddr>()
                .map_err(|e| tracing::warn!(upstream = %address, error = %e, "Ignoring invalid upstream address"))
                .ok()
        });
        let upstream = UpstreamState::new(upstream_address, Duration::from_secs(config.timeouts.connect_secs));

        let router = Self::build_router(&config, filter, upstream);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<O: DecisionOracle>(
        config: &FilterConfig,
        filter: AccessFilterState<O>,
        upstream: UpstreamState,
    ) -> Router {
        Router::new()
            .route("/", any(upstream_handler))
            .route("/{*path}", any(upstream_handler))
            .with_state(upstream)
            .layer(middleware::from_fn_with_state(filter, access_filter_middleware::<O>))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match &self.config.listener.tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                        tracing::info!("Shutdown signal received");
                    })
                    .await?;
            }
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
                let handle = axum_server::Handle::new();
                let grace = Duration::from_secs(self.config.timeouts.shutdown_secs);

                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    tracing::info!("Shutdown signal received");
                    shutdown_handle.graceful_shutdown(Some(grace));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// A copy of the router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}
