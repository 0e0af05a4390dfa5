//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the resolution handler
//! - Wire up middleware (tracing, timeout, limits, request ID normalization)
//! - Bind server to listener
//! - Swap in a freshly built resolver when the config changes
//! - Observability (metrics, correlation IDs)

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    middleware,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::ResolverConfig;
use crate::http::request::{self, ExtractError};
use crate::http::response::{ContentSummary, HttpError, ResolvedRoute};
use crate::lifecycle::shutdown::wait_for;
use crate::lifecycle::startup::rebuild_resolver;
use crate::observability::metrics;
use crate::resolution::collaborators::RuleScope;
use crate::resolution::context::RequestContext;
use crate::resolution::error::BuildError;
use crate::resolution::pipeline::Resolver;
use crate::store::MemoryTokenStore;

/// Requests only carry a path and query; bodies are never read.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// The configuration and the resolver built from it, swapped together.
pub struct InnerState {
    pub config: ResolverConfig,
    pub resolver: Arc<Resolver>,
    /// Token table shared by every resolver this host builds.
    pub tokens: MemoryTokenStore,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
}

impl AppState {
    pub fn new(config: ResolverConfig, resolver: Resolver, tokens: MemoryTokenStore) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(InnerState {
                config,
                resolver: Arc::new(resolver),
                tokens,
            })),
        }
    }

    /// Replace config and resolver in one step. The token table stays.
    pub fn swap(&self, config: ResolverConfig, resolver: Resolver) {
        let tokens = self.inner.load().tokens.clone();
        self.inner.store(Arc::new(InnerState {
            config,
            resolver: Arc::new(resolver),
            tokens,
        }));
    }
}

/// HTTP host for the resolver.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Build the resolver described by `config` and wrap it in a server.
    pub async fn new(config: ResolverConfig) -> Result<Self, BuildError> {
        let tokens = MemoryTokenStore::new();
        let resolver = rebuild_resolver(&config, &tokens).await?;
        Ok(Self {
            state: AppState::new(config, resolver, tokens),
        })
    }

    /// Serve an already built resolver (custom collaborators).
    ///
    /// A config update still replaces it with one built from the new config.
    pub fn with_resolver(config: ResolverConfig, resolver: Resolver) -> Self {
        Self {
            state: AppState::new(config, resolver, MemoryTokenStore::new()),
        }
    }

    /// Shared state, for the admin API.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let inner = self.state.inner.load();
        let config = &inner.config;

        Router::new()
            .route("/{*path}", any(resolve_handler))
            .route("/", any(resolve_handler))
            .with_state(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(ConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(request::propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(request::set_request_id_layer())
            .layer(middleware::from_fn(request::normalize_request_id))
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Every config received on `updates` is compiled into a new resolver;
    /// one that fails to build is logged and the running rules stay live.
    pub async fn run(
        self,
        listener: TcpListener,
        updates: mpsc::UnboundedReceiver<ResolverConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_shutdown = shutdown.resubscribe();
        tokio::spawn(reload_loop(self.state.clone(), updates, reload_shutdown));

        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn reload_loop(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<ResolverConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                let tokens = state.inner.load().tokens.clone();
                match rebuild_resolver(&config, &tokens).await {
                    Ok(resolver) => {
                        tracing::info!(
                            site_rules = resolver.rules(RuleScope::Site).len(),
                            cp_rules = resolver.rules(RuleScope::ControlPanel).len(),
                            "Resolver reloaded"
                        );
                        state.swap(config, resolver);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected config update, keeping current rules");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Resolve the request and answer with the route as JSON.
async fn resolve_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let request_id = request::request_id(&headers);
    let inner = state.inner.load_full();

    let response = match request::extract(&method, &uri, &headers, &inner.config.routing) {
        Ok(req) => {
            let mut ctx = RequestContext::with_id(request_id, req);
            resolve(&inner.resolver, &mut ctx).await
        }
        Err(ExtractError::UnsupportedMethod(m)) => HttpError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            request_id,
            "method_not_allowed",
            format!("method {} is not routable", m),
        )
        .into_response(),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn resolve(resolver: &Resolver, ctx: &mut RequestContext) -> Response {
    let route = match resolver.resolve(ctx).await {
        Ok(route) => route,
        Err(e) => return HttpError::from_resolve(ctx.id(), &e).into_response(),
    };

    // Memoized: no second lookup when the content stage already ran.
    let content = match resolver.matched_content(ctx).await {
        Ok(record) => record.map(|r| ContentSummary::of(r.as_ref())),
        Err(e) => return HttpError::from_resolve(ctx.id(), &e).into_response(),
    };

    Json(ResolvedRoute {
        request_id: ctx.id(),
        handler: route.handler,
        params: route.params,
        content,
    })
    .into_response()
}
