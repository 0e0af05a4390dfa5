//! HTTP host subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, reduce to resolution::Request)
//!     → resolution::Resolver::resolve (per-request RequestContext)
//!     → response.rs (JSON route, or status mapped from ResolveError)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ContentSummary, ErrorBody, ResolvedRoute};
pub use server::{AppState, HttpServer};
