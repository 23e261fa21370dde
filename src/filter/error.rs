//! Failures that end a request inside the access filter.

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::agent::oracle::AgentStatus;
use crate::filter::arena::AllocationError;

/// Why the filter answered on its own instead of using a verdict.
///
/// None of these are retried.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("agent configuration unavailable")]
    ConfigurationUnavailable,

    #[error("agent decision failed: status={0}")]
    OracleInternal(AgentStatus),

    #[error("agent contract violation: {0}")]
    ContractViolation(&'static str),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
}

impl FilterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Allocation(_)
            | Self::ConfigurationUnavailable
            | Self::OracleInternal(_)
            | Self::ContractViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Allocation(_) => "allocation",
            Self::ConfigurationUnavailable => "configuration_unavailable",
            Self::OracleInternal(_) => "oracle_internal",
            Self::ContractViolation(_) => "contract_violation",
            Self::MethodNotAllowed(_) => "method_not_allowed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            FilterError::MethodNotAllowed(Method::PUT).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            FilterError::ConfigurationUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FilterError::OracleInternal(AgentStatus::Failure).to_string(),
            "agent decision failed: status=AM_FAILURE(1)"
        );
        let alloc = FilterError::from(AllocationError {
            site: "url",
            requested: 10,
            remaining: 2,
        });
        assert_eq!(alloc.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(alloc.kind(), "allocation");
    }
}
