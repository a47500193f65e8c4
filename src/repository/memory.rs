//! In-memory implementation of [`Repository`]

use super::Repository;
use crate::error::{Error, Result};
use crate::types::Identifier;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Repository serving documents from memory
///
/// Useful for embedding applications that already hold the object graph, and
/// for exercising the crawler without a Fedora instance. Fetches are counted so
/// callers can tell how much repository traffic an export caused.
#[derive(Default)]
pub struct MemoryRepository {
    relationships: DashMap<String, String>,
    metadata: DashMap<String, String>,
    unreachable: DashSet<String>,
    latency: Option<Duration>,
    relationship_fetches: AtomicUsize,
    metadata_fetches: AtomicUsize,
    reachability_checks: AtomicUsize,
}

impl MemoryRepository {
    /// Empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store the relationship document of `id`
    pub fn insert_relationships(&self, id: impl Into<String>, xml: impl Into<String>) {
        self.relationships.insert(id.into(), xml.into());
    }

    /// Store the descriptive-metadata document of `id`
    pub fn insert_metadata(&self, id: impl Into<String>, xml: impl Into<String>) {
        self.metadata.insert(id.into(), xml.into());
    }

    /// Make `check_reachable` answer `false` for `url`
    pub fn mark_unreachable(&self, url: impl Into<String>) {
        self.unreachable.insert(url.into());
    }

    /// Relationship documents served so far
    pub fn relationship_fetches(&self) -> usize {
        self.relationship_fetches.load(Ordering::SeqCst)
    }

    /// Metadata documents served so far
    pub fn metadata_fetches(&self) -> usize {
        self.metadata_fetches.load(Ordering::SeqCst)
    }

    /// Reachability checks answered so far
    pub fn reachability_checks(&self) -> usize {
        self.reachability_checks.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lookup(store: &DashMap<String, String>, id: &Identifier, what: &str) -> Result<String> {
        store
            .get(id.as_str())
            .map(|doc| doc.value().clone())
            .ok_or_else(|| Error::Repository {
                identifier: id.to_string(),
                reason: format!("no {what} document"),
            })
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn fetch_relationships(&self, id: &Identifier) -> Result<String> {
        self.relationship_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Self::lookup(&self.relationships, id, "relationship")
    }

    async fn fetch_descriptive_metadata(&self, id: &Identifier) -> Result<String> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Self::lookup(&self.metadata, id, "metadata")
    }

    async fn check_reachable(&self, url: &str) -> Result<bool> {
        self.reachability_checks.fetch_add(1, Ordering::SeqCst);
        Ok(!self.unreachable.contains(url))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
