//! Resolution error taxonomy.

use thiserror::Error;

use crate::resolution::collaborators::{CollaboratorError, RuleScope, TokenRejection};
use crate::routing::compiler::CompileError;

/// Per-request resolution failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No stage produced a route. Expected; hosts usually answer 404.
    #[error("no route matches the request")]
    NoRoute,

    /// A token was supplied but refused. Never falls through to other stages.
    #[error("invalid token: {0}")]
    InvalidToken(TokenRejection),

    /// A collaborator failed; propagated untouched.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl ResolveError {
    pub fn is_no_route(&self) -> bool {
        matches!(self, ResolveError::NoRoute)
    }
}

/// Start-up failures while building a resolver.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{} rules failed to compile: {source}", .scope.as_str())]
    Compile {
        scope: RuleScope,
        #[source]
        source: CompileError,
    },

    #[error("could not load rules: {0}")]
    Source(#[from] CollaboratorError),
}
