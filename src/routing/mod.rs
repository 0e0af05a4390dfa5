//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Rule Compilation (at startup / on reload):
//!     RawRuleDeclaration[]
//!     → compiler.rs (split verbs, normalize, infer mode)
//!     → pattern.rs (compile placeholders to anchored regexes)
//!     → Freeze as immutable RuleSet (router.rs)
//!
//! Incoming Request (path, verb)
//!     → router.rs (declaration-order scan)
//!     → matcher.rs (verb + pattern conditions)
//!     → Return: RouteResult or no match
//!
//! URL generation:
//!     handler + params → router.rs → first usable non-parsing-only rule
//! ```
//!
//! # Design Decisions
//! - Rules compiled once, immutable at runtime
//! - Regexes are built at compile time only; the hot path just runs them
//! - Deterministic: same declarations always produce the same rule list
//! - First match wins (declaration order)

pub mod compiler;
pub mod gate;
pub mod matcher;
pub mod pattern;
pub mod router;
pub mod rule;
pub mod value;

pub use compiler::{compile, CompileError};
pub use gate::PublicPathGate;
pub use router::{RuleSet, UrlOptions};
pub use rule::{RawRuleDeclaration, RouteResult, Rule, RuleConfig, RuleMode, Verb};
pub use value::{merge_params, ParamMap, ParamValue};
