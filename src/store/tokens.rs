//! Capability tokens held in memory.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::schema::TokenConfig;
use crate::resolution::collaborators::{TokenError, TokenRejection, TokenResolver};
use crate::routing::rule::RouteResult;

/// A redeemable token.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub route: RouteResult,
    /// Expiry timestamp (seconds since epoch).
    pub expires_at: Option<u64>,
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
}

impl StoredToken {
    pub fn new(route: RouteResult) -> Self {
        Self {
            route,
            expires_at: None,
            usage_limit: None,
            usage_count: 0,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.usage_count >= limit)
    }
}

impl From<TokenConfig> for StoredToken {
    fn from(config: TokenConfig) -> Self {
        Self {
            route: RouteResult::new(config.handler, config.params),
            expires_at: config.expires_at,
            usage_limit: config.usage_limit,
            usage_count: 0,
        }
    }
}

/// A thread-safe token table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<DashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let store = Self::new();
        for token in tokens {
            store.insert(token.token.clone(), token.clone().into());
        }
        tracing::debug!(tokens = store.len(), "Token store loaded");
        store
    }

    /// Bring the table in line with `tokens`.
    ///
    /// Tokens still configured keep their usage count; routes, expiry and
    /// limits are taken from the new configuration. Tokens no longer
    /// configured are dropped.
    pub fn sync(&self, tokens: &[TokenConfig]) {
        let configured: HashSet<&str> = tokens.iter().map(|t| t.token.as_str()).collect();
        self.inner.retain(|token, _| configured.contains(token.as_str()));

        for token in tokens {
            let mut fresh = StoredToken::from(token.clone());
            self.inner
                .entry(token.token.clone())
                .and_modify(|stored| {
                    fresh.usage_count = stored.usage_count;
                    *stored = fresh.clone();
                })
                .or_insert_with(|| fresh.clone());
        }
        tracing::debug!(tokens = self.len(), "Token store synced");
    }

    pub fn insert(&self, token: impl Into<String>, stored: StoredToken) {
        self.inner.insert(token.into(), stored);
    }

    /// Times `token` has been redeemed.
    pub fn usage_count(&self, token: &str) -> Option<u32> {
        self.inner.get(token).map(|entry| entry.usage_count)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Check and count one use of `token`.
    fn redeem(&self, token: &str, now: u64) -> Result<RouteResult, TokenRejection> {
        let mut entry = self.inner.get_mut(token).ok_or(TokenRejection::Unknown)?;
        if entry.is_expired(now) {
            return Err(TokenRejection::Expired);
        }
        if entry.is_exhausted() {
            return Err(TokenRejection::Exhausted);
        }
        entry.usage_count += 1;
        Ok(entry.route.clone())
    }
}

#[async_trait]
impl TokenResolver for MemoryTokenStore {
    async fn route_for_token(&self, token: &str) -> Result<RouteResult, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.redeem(token, now).map_err(TokenError::Rejected)
    }
}
