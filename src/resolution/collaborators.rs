//! Interfaces to the systems the resolver consults.
//!
//! Content records, capability tokens and persisted rules all live outside
//! this crate. The resolver only sees these traits, handed to it at build
//! time; it never looks a collaborator up on its own.
//!
//! Collaborator calls may block on I/O. The resolver holds no lock while
//! awaiting them.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resolution::request::SiteId;
use crate::routing::rule::{RawRuleDeclaration, RouteResult};

/// Infrastructure failure inside a collaborator (storage down, timeout, ...).
#[derive(Debug, Error)]
#[error("{collaborator} failed: {source}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl CollaboratorError {
    pub fn new(
        collaborator: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            collaborator,
            source: source.into(),
        }
    }
}

/// Why a capability token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Unknown,
    Expired,
    /// Usage limit reached.
    Exhausted,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TokenRejection::Unknown => "unknown token",
            TokenRejection::Expired => "token expired",
            TokenRejection::Exhausted => "token usage limit reached",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token rejected: {0}")]
    Rejected(TokenRejection),

    #[error(transparent)]
    Unavailable(#[from] CollaboratorError),
}

/// A stored, addressable piece of content.
pub trait ContentRecord: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    /// Canonical URI, without surrounding slashes.
    fn uri(&self) -> &str;

    /// Route serving this record, `None` when it is not routable.
    fn route(&self) -> Option<RouteResult>;
}

/// Finds content records by URI.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn find_by_uri(
        &self,
        uri: &str,
        site_id: SiteId,
        enabled_only: bool,
    ) -> Result<Option<Arc<dyn ContentRecord>>, CollaboratorError>;
}

/// Resolves capability tokens to pre-authorized routes.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    async fn route_for_token(&self, token: &str) -> Result<RouteResult, TokenError>;
}

/// Which rule set a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    Site,
    ControlPanel,
}

impl RuleScope {
    pub const ALL: [RuleScope; 2] = [RuleScope::Site, RuleScope::ControlPanel];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Site => "site",
            RuleScope::ControlPanel => "cp",
        }
    }
}

impl std::str::FromStr for RuleScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site" => Ok(RuleScope::Site),
            "cp" | "control_panel" => Ok(RuleScope::ControlPanel),
            other => Err(format!("unknown rule scope '{}'", other)),
        }
    }
}

/// Supplies configured rule declarations (files, database, ...).
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn configured_rules(
        &self,
        scope: RuleScope,
    ) -> Result<Vec<RawRuleDeclaration>, CollaboratorError>;
}

/// Adds declarations once, while a resolver is being built.
///
/// Contributors run in registration order and see everything gathered so far.
pub trait RuleContributor: Send + Sync {
    fn contribute(&self, scope: RuleScope, existing: &[RawRuleDeclaration]) -> Vec<RawRuleDeclaration>;
}

impl<F> RuleContributor for F
where
    F: Fn(RuleScope, &[RawRuleDeclaration]) -> Vec<RawRuleDeclaration> + Send + Sync,
{
    fn contribute(&self, scope: RuleScope, existing: &[RawRuleDeclaration]) -> Vec<RawRuleDeclaration> {
        self(scope, existing)
    }
}

/// Content resolver for installations without addressable content.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

#[async_trait]
impl ContentResolver for NoContent {
    async fn find_by_uri(
        &self,
        _uri: &str,
        _site_id: SiteId,
        _enabled_only: bool,
    ) -> Result<Option<Arc<dyn ContentRecord>>, CollaboratorError> {
        Ok(None)
    }
}

/// Token resolver that knows no tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTokens;

#[async_trait]
impl TokenResolver for NoTokens {
    async fn route_for_token(&self, _token: &str) -> Result<RouteResult, TokenError> {
        Err(TokenError::Rejected(TokenRejection::Unknown))
    }
}
