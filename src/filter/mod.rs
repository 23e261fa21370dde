//! Access-phase request filter.
//!
//! # Data Flow
//! ```text
//! HostRequest
//!     → descriptor.rs (arena.rs copies, url.rs, cookie.rs)
//!     → handler.rs (method check, configuration, notification, decision)
//!     → render.rs (verdict → HttpOutcome)
//! ```
//!
//! # Design Decisions
//! - The core is synchronous; the HTTP layer decides where it runs
//! - Every failure becomes one well-formed response; nothing is retried

pub mod arena;
pub mod cookie;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod render;
pub mod url;

pub use cookie::CookieMergePolicy;
pub use descriptor::{DescriptorBuilder, HostRequest, RequestDescriptor, RequestMethod};
pub use error::FilterError;
pub use handler::AccessHandler;
pub use render::HttpOutcome;
