//! Per-request access decision.
//!
//! # State Machine
//! ```text
//! START → METHOD_CHECK ──(not GET/HEAD/POST)──────────────→ 405
//!       → DESCRIPTOR_BUILT ──(allocation failure)─────────→ 500
//!       → CONFIG_ACQUIRED ──(no configuration)────────────→ 500
//!       → NOTIFICATION_CHECK ──(notification url)─────────→ 200 "OK\n"
//!       → DECISION_CALLED ──(agent status not success)────→ 500
//!       → RENDERED ─────────────────────────────────────────→ verdict outcome
//! ```
//!
//! Once acquired, the configuration handle is released exactly once on
//! every path after it. [`ConfigurationGuard`] owns that guarantee.

use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::agent::callbacks::RequestCallbacks;
use crate::agent::oracle::{AgentStatus, DecisionOracle};
use crate::agent::runtime::AgentRuntime;
use crate::filter::arena::RequestArena;
use crate::filter::cookie::CookieMergePolicy;
use crate::filter::descriptor::{DescriptorBuilder, HostRequest};
use crate::filter::error::FilterError;
use crate::filter::render::{render_result, HttpOutcome};
use crate::observability::metrics;

/// Holds an acquired configuration handle and releases it on drop.
pub struct ConfigurationGuard<'a, O: DecisionOracle> {
    oracle: &'a O,
    handle: Option<O::Handle>,
}

impl<'a, O: DecisionOracle> ConfigurationGuard<'a, O> {
    /// Acquire a handle; `None` when the agent has none to give.
    pub fn acquire(oracle: &'a O) -> Option<Self> {
        oracle.acquire_configuration().map(|handle| Self {
            oracle,
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> &O::Handle {
        // Only `drop` takes the handle out.
        self.handle
            .as_ref()
            .unwrap_or_else(|| unreachable!("configuration handle used after release"))
    }
}

impl<O: DecisionOracle> Drop for ConfigurationGuard<'_, O> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.oracle.release_configuration(handle);
        }
    }
}

/// Runs the access decision for one request at a time.
pub struct AccessHandler<O: DecisionOracle> {
    runtime: Arc<AgentRuntime<O>>,
    builder: DescriptorBuilder,
    arena_bytes: usize,
}

impl<O: DecisionOracle> AccessHandler<O> {
    pub fn new(runtime: Arc<AgentRuntime<O>>, cookie_policy: CookieMergePolicy, arena_bytes: usize) -> Self {
        Self {
            runtime,
            builder: DescriptorBuilder::new(cookie_policy),
            arena_bytes,
        }
    }

    /// Decide on `request`. Never fails; errors become status responses.
    pub fn handle(&self, request: &HostRequest<'_>) -> HttpOutcome {
        match self.decide(request) {
            Ok(outcome) => outcome,
            Err(FilterError::MethodNotAllowed(method)) => {
                tracing::debug!(method = %method, "Method not handled by the access filter");
                metrics::record_failure("method_not_allowed");
                HttpOutcome::status(StatusCode::METHOD_NOT_ALLOWED)
            }
            Err(e) => {
                tracing::error!(error = %e, "Access decision failed");
                metrics::record_failure(e.kind());
                HttpOutcome::status(e.status_code())
            }
        }
    }

    fn decide(&self, request: &HostRequest<'_>) -> Result<HttpOutcome, FilterError> {
        let method = request.method();
        if !(method == Method::GET || method == Method::HEAD || method == Method::POST) {
            return Err(FilterError::MethodNotAllowed(method.clone()));
        }

        let mut arena = RequestArena::with_capacity(self.arena_bytes);
        let descriptor = self.builder.build(request, &mut arena)?;

        let oracle = self.runtime.oracle();
        let config = ConfigurationGuard::acquire(oracle).ok_or(FilterError::ConfigurationUnavailable)?;

        if oracle.is_notification_url(&descriptor.url(), config.handle()) {
            tracing::debug!(url = %descriptor.url(), "Notification request");
            return Ok(HttpOutcome::notification());
        }

        // Nothing has rendered yet: an agent that never reports a verdict
        // leaves the request at 500.
        let mut rendered: Result<HttpOutcome, FilterError> =
            Ok(HttpOutcome::status(StatusCode::INTERNAL_SERVER_ERROR));
        let mut render_calls = 0usize;

        let status = {
            let mut callbacks = RequestCallbacks::new(
                |user| {
                    tracing::debug!(user = %user, "Agent bound identity");
                    AgentStatus::Success
                },
                |verdict, target| {
                    render_calls += 1;
                    if render_calls > 1 {
                        tracing::warn!(result = %verdict, calls = render_calls, "Agent rendered more than once");
                    }
                    metrics::record_verdict(verdict.name());
                    rendered = render_result(verdict, target);
                    if rendered.is_ok() {
                        AgentStatus::Success
                    } else {
                        AgentStatus::Failure
                    }
                },
            );
            oracle.decide(&descriptor, &mut callbacks, config.handle())
        };

        // A rejected render is what made the agent fail; report that first.
        let outcome = rendered?;
        if !status.is_success() {
            return Err(FilterError::OracleInternal(status));
        }

        drop(config);
        tracing::debug!(status = ?outcome.status_code(), "Access decision rendered");
        Ok(outcome)
    }
}
