//! Object-model resolution: what an identifier is and what it contains

use crate::error::{Error, Result};
use crate::repository::{RelsExt, Repository, first_element_text};
use crate::types::{Identifier, ObjectModel};
use std::sync::Arc;
use tracing::debug;

/// Relation from a periodical to its volumes
pub const HAS_VOLUME: &str = "kramerius:hasVolume";
/// Relation from a periodical volume to its issues
pub const HAS_ITEM: &str = "kramerius:hasItem";
/// Relation from a flat container to its pages
pub const HAS_PAGE: &str = "kramerius:hasPage";

/// Answers structural questions about repository objects
#[derive(Clone)]
pub struct ModelResolver {
    repository: Arc<dyn Repository>,
    check_image_exists: bool,
}

impl ModelResolver {
    /// Resolver over `repository`; with `check_image_exists` every image-server
    /// address is probed before it is handed out
    pub fn new(repository: Arc<dyn Repository>, check_image_exists: bool) -> Self {
        Self {
            repository,
            check_image_exists,
        }
    }

    /// Fetch and parse the relationship document of `id`
    pub async fn relationships(&self, id: &Identifier) -> Result<RelsExt> {
        let xml = self.repository.fetch_relationships(id).await?;
        RelsExt::parse(&xml)
    }

    /// Classify `id` from its relationship document
    pub async fn resolve_model(&self, id: &Identifier) -> Result<ObjectModel> {
        let rels = self.relationships(id).await?;
        Self::model_of(id, &rels)
    }

    /// Classify an already fetched relationship document.
    ///
    /// Exactly one model relation must be present.
    pub fn model_of(id: &Identifier, rels: &RelsExt) -> Result<ObjectModel> {
        match rels.models().as_slice() {
            [model] => {
                let resolved = ObjectModel::from_model_name(model);
                debug!(identifier = %id, model = %model, ?resolved, "resolved model");
                Ok(resolved)
            }
            models => Err(Error::ModelResolution {
                identifier: id.to_string(),
                found: models.len(),
            }),
        }
    }

    /// Child references of `id` under `relation`, in document order
    pub async fn resolve_children(&self, id: &Identifier, relation: &str) -> Result<Vec<String>> {
        Ok(self.relationships(id).await?.children(relation))
    }

    /// First value of a descriptive-metadata element, if the element exists
    pub async fn metadata_value(&self, id: &Identifier, element: &str) -> Result<Option<String>> {
        let xml = self.repository.fetch_descriptive_metadata(id).await?;
        first_element_text(&xml, element)
    }

    /// Image-server address of a page
    pub async fn image_url(&self, page: &Identifier) -> Result<String> {
        let rels = self.relationships(page).await?;
        let url = rels
            .tiles_url()
            .ok_or_else(|| Error::Repository {
                identifier: page.to_string(),
                reason: "no image-server address in relationships".to_string(),
            })?
            .to_string();

        if self.check_image_exists && !self.repository.check_reachable(&url).await? {
            return Err(Error::Repository {
                identifier: page.to_string(),
                reason: format!("image at {url} does not exist"),
            });
        }

        Ok(url)
    }
}
