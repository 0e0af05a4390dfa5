//! Request resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Host builds Request (path, verb, kind, token, site)
//!     → RequestContext::new (per request, owns all memoized state)
//!     → pipeline.rs Resolver::resolve(&mut ctx)
//!         → collaborators.rs TokenResolver      (token present)
//!         → collaborators.rs ContentResolver    (site request, memoized)
//!         → routing::RuleSet                    (compiled rules)
//!         → routing::PublicPathGate             (fallback)
//!     → RouteResult or ResolveError
//!
//! After resolution:
//!     ctx.params() / ctx.set_params()   accumulated params
//!     Resolver::matched_content(&mut ctx)  which record served the request
//! ```
//!
//! # Design Decisions
//! - Collaborators are injected at build time, never looked up ambiently
//! - The resolver is immutable and shared; the context is never shared
//! - "No route" is an ordinary error variant, not a panic or a default route

pub mod collaborators;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod request;

pub use collaborators::{
    CollaboratorError, ContentRecord, ContentResolver, RuleContributor, RuleScope, RuleSource,
    TokenError, TokenRejection, TokenResolver,
};
pub use context::{ContentMatch, RequestContext};
pub use error::{BuildError, ResolveError};
pub use pipeline::{Resolver, ResolverBuilder, ResolverSettings, Stage};
pub use request::{Request, RequestKind, SiteId};
