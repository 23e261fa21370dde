//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FilterConfig (validated, immutable)
//!     → handed to the server and the agent runtime at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the agent's own policy file reloads
//!   separately (see `agent::watcher`)
//! - All fields have defaults except the agent's two files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AgentSettings;
pub use schema::DescriptorConfig;
pub use schema::FilterConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::UpstreamConfig;
