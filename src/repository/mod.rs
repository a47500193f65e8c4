//! Digital-repository access
//!
//! The exporter only needs three things from the repository: an object's
//! relationship document (RELS-EXT), its descriptive metadata (MODS), and a way
//! to check that an image-server URL answers. The [`Repository`] trait captures
//! exactly that, so the crawler can run against the live Fedora REST endpoint
//! ([`FedoraRepository`]) or an in-memory object graph ([`MemoryRepository`]).
//!
//! Document parsing lives in [`document`]; it is independent of transport.

pub mod document;
mod fedora;
mod memory;

pub use document::{RelsExt, Relation, first_element_text};
pub use fedora::FedoraRepository;
pub use memory::MemoryRepository;

use crate::error::Result;
use crate::types::Identifier;
use async_trait::async_trait;

/// Read access to the object repository
///
/// Every method may fail with a transport error at any time. Callers treat
/// such failures as fatal to whatever they were resolving; nothing is retried.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch the relationship document (RELS-EXT) of an object
    async fn fetch_relationships(&self, id: &Identifier) -> Result<String>;

    /// Fetch the descriptive-metadata document (MODS) of an object
    async fn fetch_descriptive_metadata(&self, id: &Identifier) -> Result<String>;

    /// Whether an image-server URL answers with success
    async fn check_reachable(&self, url: &str) -> Result<bool>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
