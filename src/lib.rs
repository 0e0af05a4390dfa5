//! Route resolution engine.
//!
//! Maps an inbound request (path, verb, context, optional capability token)
//! to a handler identifier plus params, consulting tokens, addressable
//! content, configured URL rules and public template paths in that order.
//! Also generates URLs from handler + params using the same rules.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resolution;
pub mod routing;
pub mod store;

pub use config::schema::ResolverConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resolution::{RequestContext, ResolveError, Resolver};
pub use routing::{ParamMap, ParamValue, RouteResult};
