//! In-memory collaborators backed by the configuration file.
//!
//! # Responsibilities
//! - Serve content records by (site, URI)
//! - Redeem capability tokens, enforcing expiry and usage limits
//! - Hand configured rule declarations to the resolver builder
//!
//! # Design Decisions
//! - Each store is a cheap clone around an `Arc<DashMap>`; no global lock
//! - Stores are rebuilt from config on reload, never patched in place

pub mod content;
pub mod rules;
pub mod tokens;

pub use content::{MemoryContentStore, StoredContent};
pub use rules::ConfigRuleSource;
pub use tokens::{MemoryTokenStore, StoredToken};
