//! Request-scoped resolution state.
//!
//! One [`RequestContext`] per in-flight request. It owns everything the
//! resolver memoizes for that request, so nothing can leak between requests
//! served concurrently by the same [`Resolver`](crate::resolution::Resolver).

use std::sync::Arc;
use uuid::Uuid;

use crate::resolution::collaborators::{ContentRecord, TokenRejection};
use crate::resolution::error::ResolveError;
use crate::resolution::request::Request;
use crate::routing::rule::RouteResult;
use crate::routing::value::{merge_params, ParamMap};

/// Memoized outcome of the content lookup for the request path.
#[derive(Debug, Clone, Default)]
pub enum ContentMatch {
    #[default]
    NotAttempted,
    Attempted {
        record: Option<Arc<dyn ContentRecord>>,
        route: Option<RouteResult>,
    },
}

impl ContentMatch {
    pub fn is_attempted(&self) -> bool {
        matches!(self, ContentMatch::Attempted { .. })
    }

    pub fn record(&self) -> Option<&Arc<dyn ContentRecord>> {
        match self {
            ContentMatch::Attempted { record, .. } => record.as_ref(),
            ContentMatch::NotAttempted => None,
        }
    }
}

/// Params layered over the course of a request.
#[derive(Debug, Clone, Default)]
pub struct ParamAccumulator {
    params: ParamMap,
    resolved: bool,
}

impl ParamAccumulator {
    /// Merge `params` over the current set.
    pub fn set(&mut self, params: ParamMap) {
        merge_params(&mut self.params, params);
    }

    /// Current params, or `None` until a route has been resolved.
    pub fn get(&self) -> Option<&ParamMap> {
        self.resolved.then_some(&self.params)
    }

    pub(crate) fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    pub(crate) fn snapshot(&self) -> ParamMap {
        self.params.clone()
    }
}

/// Cached result of the primary resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Routed(RouteResult),
    NoRoute,
    InvalidToken(TokenRejection),
}

impl Outcome {
    pub(crate) fn to_result(&self) -> Result<RouteResult, ResolveError> {
        match self {
            Outcome::Routed(route) => Ok(route.clone()),
            Outcome::NoRoute => Err(ResolveError::NoRoute),
            Outcome::InvalidToken(reason) => Err(ResolveError::InvalidToken(*reason)),
        }
    }
}

/// Everything the resolver knows about one request.
#[derive(Debug)]
pub struct RequestContext {
    id: Uuid,
    request: Request,
    pub(crate) content: ContentMatch,
    pub(crate) params: ParamAccumulator,
    pub(crate) outcome: Option<Outcome>,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self::with_id(Uuid::new_v4(), request)
    }

    /// Reuse an id assigned upstream (e.g. the `x-request-id` header).
    pub fn with_id(id: Uuid, request: Request) -> Self {
        Self {
            id,
            request,
            content: ContentMatch::NotAttempted,
            params: ParamAccumulator::default(),
            outcome: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Accumulated route params, `None` before a successful resolution.
    pub fn params(&self) -> Option<&ParamMap> {
        self.params.get()
    }

    /// Layer extra params over the accumulated set.
    pub fn set_params(&mut self, params: ParamMap) {
        self.params.set(params);
    }

    pub fn content_match(&self) -> &ContentMatch {
        &self.content
    }

    /// The resolved route, if resolution has succeeded.
    pub fn route(&self) -> Option<&RouteResult> {
        match &self.outcome {
            Some(Outcome::Routed(route)) => Some(route),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}
