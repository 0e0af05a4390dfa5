//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build resolver → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → listeners drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then resolver, then listeners
//! - Config reload is driven by the file watcher, not by signals

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_resolver, build_resolver_with, rebuild_resolver};
