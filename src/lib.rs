//! Access-phase filter that asks an identity-provider agent whether each
//! HTTP request may proceed.

pub mod agent;
pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use agent::{AgentRuntime, DecisionOracle, LocalAgent};
pub use config::FilterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
