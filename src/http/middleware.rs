//! Access filter middleware.
//! Runs the agent decision before any handler sees the request.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::agent::oracle::DecisionOracle;
use crate::filter::descriptor::HostRequest;
use crate::filter::handler::AccessHandler;
use crate::filter::render::HttpOutcome;
use crate::http::request::request_id;
use crate::observability::metrics;

/// State required for access filtering.
pub struct AccessFilterState<O: DecisionOracle> {
    pub handler: Arc<AccessHandler<O>>,
    /// Whether the listener terminates TLS.
    pub is_secure: bool,
}

impl<O: DecisionOracle> Clone for AccessFilterState<O> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            is_secure: self.is_secure,
        }
    }
}

pub async fn access_filter_middleware<O: DecisionOracle>(
    State(state): State<AccessFilterState<O>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let id = request_id(&parts.headers).to_string();

    // The agent call blocks; keep it off the async workers.
    let handler = state.handler.clone();
    let is_secure = state.is_secure;
    let span = tracing::debug_span!("access_filter", request_id = %id);
    let decided = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let outcome = handler.handle(&HostRequest::new(&parts, peer, is_secure));
        (parts, outcome)
    })
    .await;

    let (parts, outcome) = match decided {
        Ok(decided) => decided,
        Err(e) => {
            tracing::error!(request_id = %id, error = %e, "Access decision task failed");
            metrics::record_failure("task_join");
            metrics::record_request(&method, Some(500), start);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    metrics::record_request(&method, outcome.status_code().map(|s| s.as_u16()), start);

    match outcome {
        HttpOutcome::Declined => next.run(Request::from_parts(parts, body)).await,
        respond => {
            tracing::debug!(request_id = %id, status = ?respond.status_code(), "Request answered by access filter");
            respond.into_response()
        }
    }
}
