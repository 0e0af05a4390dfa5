//! Shared collaborators and server helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use route_resolver::config::ResolverConfig;
use route_resolver::http::HttpServer;
use route_resolver::lifecycle::Shutdown;
use route_resolver::resolution::{
    CollaboratorError, ContentRecord, ContentResolver, SiteId, TokenError, TokenResolver,
};
use route_resolver::store::{MemoryContentStore, MemoryTokenStore};

/// Wraps a content store, counting lookups and optionally failing them.
#[derive(Clone, Default)]
pub struct CountingContent {
    pub store: MemoryContentStore,
    pub calls: Arc<AtomicUsize>,
    pub failing: Arc<AtomicBool>,
}

impl CountingContent {
    pub fn new(store: MemoryContentStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentResolver for CountingContent {
    async fn find_by_uri(
        &self,
        uri: &str,
        site_id: SiteId,
        enabled_only: bool,
    ) -> Result<Option<Arc<dyn ContentRecord>>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("content", "storage offline"));
        }
        self.store.find_by_uri(uri, site_id, enabled_only).await
    }
}

/// Wraps a token store, counting redemptions and optionally failing them.
#[derive(Clone, Default)]
pub struct CountingTokens {
    pub store: MemoryTokenStore,
    pub calls: Arc<AtomicUsize>,
    pub failing: Arc<AtomicBool>,
}

impl CountingTokens {
    pub fn new(store: MemoryTokenStore) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenResolver for CountingTokens {
    async fn route_for_token(&self, token: &str) -> Result<route_resolver::RouteResult, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("tokens", "storage offline").into());
        }
        self.store.route_for_token(token).await
    }
}

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<ResolverConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start `server` on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_server(server: HttpServer) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        shutdown,
        updates,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
