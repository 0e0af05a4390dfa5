//! The request as seen by the resolver.
//!
//! # Responsibilities
//! - Normalize the raw path (no surrounding slashes, no empty segments)
//! - Carry the verb, context kind, capability token and site id
//!
//! # Design Decisions
//! - Read-only once built; the resolver never mutates it
//! - Context flags are a single enum instead of independent booleans

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::routing::rule::Verb;

/// Identifier of the site a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u32);

impl Default for SiteId {
    fn default() -> Self {
        SiteId(1)
    }
}

impl From<u32> for SiteId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site-{}", self.0)
    }
}

/// Which surface the request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Public front-end site.
    Site,
    /// Administrative control panel.
    ControlPanel,
    /// Command line; never routed.
    Console,
}

/// An inbound request, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    raw_path: String,
    path: String,
    segments: Vec<String>,
    verb: Verb,
    kind: RequestKind,
    token: Option<String>,
    site_id: SiteId,
}

impl Request {
    /// A `GET` request against the public site.
    pub fn site(path: impl Into<String>) -> Self {
        Self::new(RequestKind::Site, path)
    }

    /// A `GET` request against the control panel.
    pub fn control_panel(path: impl Into<String>) -> Self {
        Self::new(RequestKind::ControlPanel, path)
    }

    pub fn console() -> Self {
        Self::new(RequestKind::Console, "")
    }

    pub fn new(kind: RequestKind, path: impl Into<String>) -> Self {
        let raw_path = path.into();
        let segments: Vec<String> = raw_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let path = segments.join("/");

        Self {
            raw_path,
            path,
            segments,
            verb: Verb::Get,
            kind,
            token: None,
            site_id: SiteId::default(),
        }
    }

    pub fn with_verb(mut self, verb: Verb) -> Self {
        self.verb = verb;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_site(mut self, site_id: SiteId) -> Self {
        self.site_id = site_id;
        self
    }

    /// Path as received.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Path without surrounding or doubled slashes.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    pub fn is_console(&self) -> bool {
        self.kind == RequestKind::Console
    }

    pub fn is_control_panel(&self) -> bool {
        self.kind == RequestKind::ControlPanel
    }

    pub fn is_site(&self) -> bool {
        self.kind == RequestKind::Site
    }
}
