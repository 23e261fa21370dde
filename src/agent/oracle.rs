//! Boundary to the identity-provider agent.
//!
//! The agent is an opaque decision oracle: it is booted once per process,
//! hands out configuration snapshots per request, and reports its verdict
//! through the callbacks in [`RequestCallbacks`].

use std::fmt;
use std::path::Path;

use crate::agent::callbacks::RequestCallbacks;
use crate::filter::descriptor::RequestDescriptor;

/// Internal status returned by agent calls, separate from any verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Success,
    Failure,
    InvalidArgument,
    NoMemory,
    NotFound,
    ServiceNotAvailable,
    /// A status code this filter has no name for.
    Other(i32),
}

impl AgentStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::InvalidArgument => 3,
            Self::NoMemory => 8,
            Self::NotFound => 12,
            Self::ServiceNotAvailable => 21,
            Self::Other(code) => *code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Success => "AM_SUCCESS",
            Self::Failure => "AM_FAILURE",
            Self::InvalidArgument => "AM_INVALID_ARGUMENT",
            Self::NoMemory => "AM_NO_MEMORY",
            Self::NotFound => "AM_NOT_FOUND",
            Self::ServiceNotAvailable => "AM_SERVICE_NOT_AVAILABLE",
            Self::Other(_) => "AM_UNKNOWN",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// The agent's decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    OkDone,
    Forbidden,
    Redirect,
    Error,
    Unknown(i32),
}

impl Verdict {
    /// Decode a numeric verdict; unrecognized codes become `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::OkDone,
            2 => Self::Forbidden,
            3 => Self::Redirect,
            4 => Self::Error,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::OkDone => 1,
            Self::Forbidden => 2,
            Self::Redirect => 3,
            Self::Error => 4,
            Self::Unknown(code) => *code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ok => "AM_WEB_RESULT_OK",
            Self::OkDone => "AM_WEB_RESULT_OK_DONE",
            Self::Forbidden => "AM_WEB_RESULT_FORBIDDEN",
            Self::Redirect => "AM_WEB_RESULT_REDIRECT",
            Self::Error => "AM_WEB_RESULT_ERROR",
            Self::Unknown(_) => "AM_WEB_RESULT_UNKNOWN",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// An identity-provider agent that decides on requests.
///
/// Every method is synchronous. `decide` may block and may call back into
/// `callbacks` any number of times before returning, on the calling thread.
pub trait DecisionOracle: Send + Sync + 'static {
    /// Per-request configuration snapshot.
    type Handle;

    /// Load the agent's boot and configuration files.
    fn init(&self, boot_file: &Path, conf_file: &Path) -> AgentStatus;

    /// Start the agent once `init` succeeded.
    fn agent_init(&self) -> AgentStatus;

    /// Tear the agent down. Called once, at process exit.
    fn cleanup(&self);

    /// `None` when the agent cannot provide a configuration right now.
    fn acquire_configuration(&self) -> Option<Self::Handle>;

    fn release_configuration(&self, handle: Self::Handle);

    /// Whether `url` is the agent's notification endpoint.
    fn is_notification_url(&self, url: &str, handle: &Self::Handle) -> bool;

    /// Evaluate `descriptor`. The verdict arrives through
    /// [`RequestCallbacks::render_result`]; the return value only reports
    /// whether the evaluation itself worked.
    fn decide(
        &self,
        descriptor: &RequestDescriptor,
        callbacks: &mut RequestCallbacks<'_>,
        handle: &Self::Handle,
    ) -> AgentStatus;
}
