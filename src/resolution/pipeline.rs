//! The route resolution pipeline.
//!
//! # Precedence
//! ```text
//! console request          → NoRoute (never routed)
//! 1. capability token      → token route, or InvalidToken (final either way)
//! 2. content record by URI → record route (memoized with the record)
//! 3. compiled rules        → first matching rule; its literal params are accumulated
//! 4. public template path  → fallback render route carrying the path
//! otherwise                → NoRoute
//! ```
//!
//! # Design Decisions
//! - One `Resolver` is shared by every worker; it is immutable once built
//! - All per-request state lives in the `RequestContext` passed in by the caller
//! - The primary resolution runs once per context; later calls return the cached outcome
//! - Collaborator failures propagate untouched and are not cached

use std::collections::HashMap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::resolution::collaborators::{
    ContentRecord, ContentResolver, NoContent, NoTokens, RuleContributor, RuleScope, RuleSource,
    TokenError, TokenResolver,
};
use crate::resolution::context::{ContentMatch, Outcome, RequestContext};
use crate::resolution::error::{BuildError, ResolveError};
use crate::resolution::request::{Request, RequestKind};
use crate::routing::compiler::compile;
use crate::routing::gate::PublicPathGate;
use crate::routing::router::{RuleSet, UrlOptions};
use crate::routing::rule::{RawRuleDeclaration, RouteResult};
use crate::routing::value::{ParamMap, ParamValue};

/// Which pipeline stage produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Token,
    Content,
    Rules,
    Fallback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Token => "token",
            Stage::Content => "content",
            Stage::Rules => "rules",
            Stage::Fallback => "fallback",
        }
    }
}

/// Behavior switches for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Content lookup only runs on a fully installed system.
    pub installed: bool,
    /// Segment prefix marking site paths private.
    pub private_template_trigger: String,
    /// Handler of the public-template fallback route.
    pub fallback_handler: String,
    /// Param carrying the path on the fallback route.
    pub fallback_param: String,
    pub urls: UrlOptions,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            installed: true,
            private_template_trigger: "_".to_string(),
            fallback_handler: "templates/render".to_string(),
            fallback_param: "template".to_string(),
            urls: UrlOptions::default(),
        }
    }
}

/// Resolves requests to routes. Shared read-only across requests.
pub struct Resolver {
    rules: HashMap<RuleScope, Arc<RuleSet>>,
    content: Arc<dyn ContentResolver>,
    tokens: Arc<dyn TokenResolver>,
    gate: PublicPathGate,
    settings: ResolverSettings,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("site_rules", &self.rules(RuleScope::Site).len())
            .field("cp_rules", &self.rules(RuleScope::ControlPanel).len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Compiled rules for `scope`.
    pub fn rules(&self, scope: RuleScope) -> &RuleSet {
        self.rules
            .get(&scope)
            .map(Arc::as_ref)
            .unwrap_or(&EMPTY_RULES)
    }

    /// Resolve the request held by `ctx`.
    pub async fn resolve(&self, ctx: &mut RequestContext) -> Result<RouteResult, ResolveError> {
        if let Some(outcome) = &ctx.outcome {
            return outcome.to_result();
        }

        if ctx.request().is_console() {
            ctx.outcome = Some(Outcome::NoRoute);
            return Err(ResolveError::NoRoute);
        }

        match self.run_stages(ctx).await {
            Ok(Some((stage, route))) => {
                ctx.params.set(route.params);
                ctx.params.mark_resolved();
                let route = RouteResult::new(route.handler, ctx.params.snapshot());

                tracing::debug!(
                    request_id = %ctx.id(),
                    path = %ctx.request().path(),
                    stage = stage.as_str(),
                    handler = %route.handler,
                    "Request resolved"
                );
                metrics::record_resolution(stage.as_str(), "routed");

                ctx.outcome = Some(Outcome::Routed(route.clone()));
                Ok(route)
            }
            Ok(None) => {
                tracing::debug!(request_id = %ctx.id(), path = %ctx.request().path(), "No route matched");
                metrics::record_resolution("none", "no_route");
                ctx.outcome = Some(Outcome::NoRoute);
                Err(ResolveError::NoRoute)
            }
            Err(ResolveError::InvalidToken(reason)) => {
                tracing::warn!(request_id = %ctx.id(), reason = %reason, "Capability token rejected");
                metrics::record_resolution(Stage::Token.as_str(), "invalid_token");
                ctx.outcome = Some(Outcome::InvalidToken(reason));
                Err(ResolveError::InvalidToken(reason))
            }
            Err(e) => {
                tracing::error!(request_id = %ctx.id(), error = %e, "Resolution failed");
                metrics::record_resolution("none", "error");
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Option<(Stage, RouteResult)>, ResolveError> {
        // 1. Token
        if let Some(token) = ctx.request().token().map(str::to_owned) {
            return match self.tokens.route_for_token(&token).await {
                Ok(route) => Ok(Some((Stage::Token, route))),
                Err(TokenError::Rejected(reason)) => Err(ResolveError::InvalidToken(reason)),
                Err(TokenError::Unavailable(e)) => Err(e.into()),
            };
        }

        // 2. Content record
        if let Some(route) = self.content_route(ctx).await? {
            return Ok(Some((Stage::Content, route)));
        }

        // 3. Compiled rules
        let rules = self.rules(scope_for(ctx.request()));
        // Literals enter the accumulator here; the route carries captures only.
        if let Some((rule, captured)) = rules.match_captures(ctx.request()) {
            if !rule.params.is_empty() {
                ctx.params.set(rule.params.clone());
            }
            return Ok(Some((Stage::Rules, RouteResult::new(rule.route.clone(), captured))));
        }

        // 4. Public template path
        if self.gate.is_public(ctx.request()) {
            let mut params = ParamMap::new();
            params.insert(
                self.settings.fallback_param.clone(),
                ParamValue::String(ctx.request().path().to_string()),
            );
            return Ok(Some((
                Stage::Fallback,
                RouteResult::new(self.settings.fallback_handler.clone(), params),
            )));
        }

        Ok(None)
    }

    /// The content record served by this request, if any.
    ///
    /// Shares the memoized lookup with resolution; the collaborator is asked
    /// at most once per context.
    pub async fn matched_content(
        &self,
        ctx: &mut RequestContext,
    ) -> Result<Option<Arc<dyn ContentRecord>>, ResolveError> {
        if !ctx.request().is_site() {
            return Ok(None);
        }
        self.content_route(ctx).await?;
        Ok(ctx.content.record().cloned())
    }

    async fn content_route(&self, ctx: &mut RequestContext) -> Result<Option<RouteResult>, ResolveError> {
        if let ContentMatch::Attempted { route, .. } = &ctx.content {
            return Ok(route.clone());
        }

        if !self.settings.installed || !ctx.request().is_site() {
            ctx.content = ContentMatch::Attempted {
                record: None,
                route: None,
            };
            return Ok(None);
        }

        let request = ctx.request();
        let found = self
            .content
            .find_by_uri(request.path(), request.site_id(), true)
            .await?;
        metrics::record_content_lookup(found.is_some());

        let (record, route) = match found {
            Some(record) => match record.route() {
                Some(route) => (Some(record), Some(route)),
                None => {
                    tracing::debug!(record = %record.id(), "Content record is not routable");
                    (None, None)
                }
            },
            None => (None, None),
        };

        ctx.content = ContentMatch::Attempted {
            record,
            route: route.clone(),
        };
        Ok(route)
    }

    /// Build a URL for `handler` using the rules of `scope`.
    pub fn build_url(&self, scope: RuleScope, handler: &str, params: &ParamMap) -> String {
        self.rules(scope).build_url(handler, params, &self.settings.urls)
    }
}

static EMPTY_RULES: RuleSet = RuleSet::empty();

fn scope_for(request: &Request) -> RuleScope {
    match request.kind() {
        RequestKind::ControlPanel => RuleScope::ControlPanel,
        RequestKind::Site | RequestKind::Console => RuleScope::Site,
    }
}

/// Assembles a [`Resolver`]: gathers and compiles rules for every scope.
#[derive(Default)]
pub struct ResolverBuilder {
    content: Option<Arc<dyn ContentResolver>>,
    tokens: Option<Arc<dyn TokenResolver>>,
    sources: Vec<Arc<dyn RuleSource>>,
    contributors: Vec<Arc<dyn RuleContributor>>,
    settings: ResolverSettings,
}

impl ResolverBuilder {
    pub fn content(mut self, content: Arc<dyn ContentResolver>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn tokens(mut self, tokens: Arc<dyn TokenResolver>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Add a rule source. Sources are concatenated in registration order.
    pub fn rule_source(mut self, source: Arc<dyn RuleSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Register a contributor, invoked once per scope after every source.
    pub fn contributor(mut self, contributor: Arc<dyn RuleContributor>) -> Self {
        self.contributors.push(contributor);
        self
    }

    pub fn settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Gather, compile and freeze every rule set.
    ///
    /// Fails without producing a resolver if any scope fails to compile.
    pub async fn build(self) -> Result<Resolver, BuildError> {
        let mut rules = HashMap::new();

        for scope in RuleScope::ALL {
            let mut declarations: Vec<RawRuleDeclaration> = Vec::new();
            for source in &self.sources {
                declarations.extend(source.configured_rules(scope).await?);
            }
            for contributor in &self.contributors {
                let extra = contributor.contribute(scope, &declarations);
                declarations.extend(extra);
            }

            let set = compile(declarations).map_err(|source| BuildError::Compile { scope, source })?;
            tracing::info!(scope = scope.as_str(), rules = set.len(), "Rules compiled");
            rules.insert(scope, Arc::new(set));
        }

        Ok(Resolver {
            rules,
            content: self.content.unwrap_or_else(|| Arc::new(NoContent)),
            tokens: self.tokens.unwrap_or_else(|| Arc::new(NoTokens)),
            gate: PublicPathGate::new(self.settings.private_template_trigger.clone()),
            settings: self.settings,
        })
    }
}
