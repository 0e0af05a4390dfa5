//! Content records held in memory.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::config::schema::ContentConfig;
use crate::resolution::collaborators::{CollaboratorError, ContentRecord, ContentResolver};
use crate::resolution::request::SiteId;
use crate::routing::rule::RouteResult;
use crate::routing::value::ParamMap;

/// A content record with the route that serves it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContent {
    pub id: String,
    pub uri: String,
    pub site_id: SiteId,
    pub enabled: bool,
    pub handler: Option<String>,
    pub params: ParamMap,
}

impl From<ContentConfig> for StoredContent {
    fn from(config: ContentConfig) -> Self {
        Self {
            id: config.id,
            uri: normalize_uri(&config.uri),
            site_id: config.site_id,
            enabled: config.enabled,
            handler: config.handler,
            params: config.params,
        }
    }
}

impl ContentRecord for StoredContent {
    fn id(&self) -> &str {
        &self.id
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    fn route(&self) -> Option<RouteResult> {
        self.handler
            .as_ref()
            .map(|handler| RouteResult::new(handler.clone(), self.params.clone()))
    }
}

/// A thread-safe map of content records keyed by site and URI.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<DashMap<(SiteId, String), Arc<StoredContent>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from configured records.
    pub fn from_config(records: &[ContentConfig]) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record.clone().into());
        }
        tracing::debug!(records = store.len(), "Content store loaded");
        store
    }

    /// Insert or replace a record.
    pub fn insert(&self, mut record: StoredContent) {
        record.uri = normalize_uri(&record.uri);
        let key = (record.site_id, record.uri.clone());
        self.inner.insert(key, Arc::new(record));
    }

    pub fn remove(&self, site_id: SiteId, uri: &str) -> Option<Arc<StoredContent>> {
        self.inner
            .remove(&(site_id, normalize_uri(uri)))
            .map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ContentResolver for MemoryContentStore {
    async fn find_by_uri(
        &self,
        uri: &str,
        site_id: SiteId,
        enabled_only: bool,
    ) -> Result<Option<Arc<dyn ContentRecord>>, CollaboratorError> {
        let found = self
            .inner
            .get(&(site_id, normalize_uri(uri)))
            .map(|entry| Arc::clone(entry.value()));

        Ok(found
            .filter(|record| record.enabled || !enabled_only)
            .map(|record| record as Arc<dyn ContentRecord>))
    }
}

fn normalize_uri(uri: &str) -> String {
    uri.trim_matches('/').to_string()
}
