//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, TLS, graceful shutdown)
//!     → request.rs (request ID)
//!     → middleware.rs (access filter: agent decision off the async workers)
//!         ├─ answered here: 302 / 403 / 405 / 500 / notification 200
//!         └─ declined → upstream.rs (forward to upstream)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;
pub mod upstream;

pub use middleware::{access_filter_middleware, AccessFilterState};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
