//! Forwarding of allowed requests.
//!
//! # Responsibilities
//! - Forward requests the agent allowed to the configured upstream
//! - Preserve method, headers, body and request target
//! - Map upstream failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - No retries: a failed forward is answered immediately
//! - Without an upstream, allowed requests get 404

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::request_id;

/// State for the downstream handler.
#[derive(Clone)]
pub struct UpstreamState {
    pub address: Option<SocketAddr>,
    pub client: Client<HttpConnector, Body>,
}

impl UpstreamState {
    pub fn new(address: Option<SocketAddr>, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { address, client }
    }
}

/// Forward the request to the upstream.
pub async fn upstream_handler(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let id = request_id(request.headers()).to_string();

    let Some(address) = state.address else {
        tracing::debug!(request_id = %id, path = %request.uri().path(), "No upstream configured");
        return (StatusCode::NOT_FOUND, "No upstream configured").into_response();
    };

    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    match Authority::from_str(&address.to_string()) {
        Ok(authority) => uri_parts.authority = Some(authority),
        Err(e) => {
            tracing::error!(request_id = %id, upstream = %address, error = %e, "Invalid upstream authority");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    }
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %id, error = %e, "Cannot build upstream URI");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    // The upstream connection is plain HTTP/1.1 whatever the client spoke.
    parts.version = Version::HTTP_11;

    tracing::debug!(request_id = %id, upstream = %address, uri = %parts.uri, "Forwarding request");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %id, upstream = %address, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
