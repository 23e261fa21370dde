//! Identity-provider agent subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     runtime.rs → oracle.init(boot, conf) → oracle.agent_init()
//!
//! Per request (driven by filter::handler):
//!     acquire_configuration → is_notification_url
//!     → decide(descriptor, callbacks.rs, handle)
//!         ↳ set_user / render_result, synchronously
//!     → release_configuration
//!
//! Shutdown:
//!     runtime.rs → oracle.cleanup()
//! ```
//!
//! # Design Decisions
//! - The agent is a trait; the filter never sees how decisions are made
//! - `local.rs` is a file-driven agent so the server runs standalone
//! - Policy reloads swap whole snapshots; requests keep the one they hold

pub mod callbacks;
pub mod local;
pub mod oracle;
pub mod runtime;
pub mod watcher;

pub use callbacks::RequestCallbacks;
pub use local::LocalAgent;
pub use oracle::{AgentStatus, DecisionOracle, Verdict};
pub use runtime::{AgentRuntime, AgentStartError};
