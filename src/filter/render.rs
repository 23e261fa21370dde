//! Mapping agent verdicts onto HTTP.
//!
//! | Verdict   | Outcome                          |
//! |-----------|----------------------------------|
//! | OK        | declined (downstream decides)    |
//! | OK_DONE   | declined, logged as unexpected   |
//! | REDIRECT  | 302 with `Location`              |
//! | FORBIDDEN | 403                              |
//! | ERROR     | 500                              |
//! | unknown   | 500, logged                      |
//!
//! A redirect without a target is a contract violation and yields 500
//! without any `Location` header.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::agent::oracle::Verdict;
use crate::filter::error::FilterError;

/// Body of the notification endpoint response.
pub const NOTIFICATION_BODY: &str = "OK\n";

/// What the filter wants the host to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    /// Let downstream handlers produce the response.
    Declined,
    /// Answer the request here.
    Respond {
        status: StatusCode,
        headers: HeaderMap,
        body: &'static str,
    },
}

impl HttpOutcome {
    /// A bare status response.
    pub fn status(status: StatusCode) -> Self {
        Self::Respond {
            status,
            headers: HeaderMap::new(),
            body: "",
        }
    }

    /// The fixed reply to the agent's notification endpoint.
    pub fn notification() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self::Respond {
            status: StatusCode::OK,
            headers,
            body: NOTIFICATION_BODY,
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Declined => None,
            Self::Respond { status, .. } => Some(*status),
        }
    }
}

impl IntoResponse for HttpOutcome {
    fn into_response(self) -> Response {
        match self {
            // Only reachable if a caller forgot to run the downstream handler.
            Self::Declined => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::Respond {
                status,
                headers,
                body,
            } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                response.headers_mut().extend(headers);
                response
            }
        }
    }
}

/// Translate a verdict into an outcome.
pub fn render_result(verdict: Verdict, redirect_target: Option<&str>) -> Result<HttpOutcome, FilterError> {
    tracing::debug!(result = %verdict, "Agent verdict");

    match verdict {
        Verdict::Ok => Ok(HttpOutcome::Declined),
        Verdict::OkDone => {
            tracing::warn!(result = %verdict, "Agent answered OK_DONE; treating as OK");
            Ok(HttpOutcome::Declined)
        }
        Verdict::Redirect => {
            let target = redirect_target.ok_or(FilterError::ContractViolation("redirect without a target"))?;
            let location = HeaderValue::from_str(target)
                .map_err(|_| FilterError::ContractViolation("redirect target is not a valid header value"))?;
            let mut headers = HeaderMap::new();
            headers.insert(header::LOCATION, location);
            Ok(HttpOutcome::Respond {
                status: StatusCode::FOUND,
                headers,
                body: "",
            })
        }
        Verdict::Forbidden => Ok(HttpOutcome::status(StatusCode::FORBIDDEN)),
        Verdict::Error => {
            tracing::error!(result = %verdict, "Agent returned an error verdict");
            Ok(HttpOutcome::status(StatusCode::INTERNAL_SERVER_ERROR))
        }
        Verdict::Unknown(_) => {
            tracing::error!(result = %verdict, "Unknown agent verdict");
            Ok(HttpOutcome::status(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}
