//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, rule compilation)
//!     → ResolverConfig (validated, immutable)
//!     → http::build_resolver → frozen Resolver
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server rebuilds the Resolver and swaps it atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - An invalid reload is logged and discarded; the running rules stay live

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, ContentConfig, ListenerConfig, ObservabilityConfig, ResolverConfig,
    RoutingConfig, TimeoutConfig, TokenConfig,
};
pub use validation::{validate_config, ValidationError};
