//! Fedora REST implementation of [`Repository`]

use super::Repository;
use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use crate::types::Identifier;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

/// Datastreams the exporter reads
#[derive(Clone, Copy, Debug)]
enum Datastream {
    Relationships,
    Metadata,
}

impl Datastream {
    fn id(&self) -> &'static str {
        match self {
            Datastream::Relationships => "RELS-EXT",
            Datastream::Metadata => "BIBLIO_MODS",
        }
    }
}

/// Repository backed by the Fedora Commons REST API
///
/// Datastream content is read from
/// `{base_url}/objects/{id}/datastreams/{datastream}/content`.
pub struct FedoraRepository {
    client: reqwest::Client,
    base_url: String,
}

impl FedoraRepository {
    /// Create a client for the configured endpoint
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn datastream_url(&self, id: &Identifier, datastream: Datastream) -> String {
        format!(
            "{}/objects/{}/datastreams/{}/content",
            self.base_url,
            id,
            datastream.id()
        )
    }

    async fn load(&self, id: &Identifier, datastream: Datastream) -> Result<String> {
        let url = self.datastream_url(id, datastream);
        debug!(%url, "fetching datastream");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Repository {
                identifier: id.to_string(),
                reason: format!("{} returned HTTP {}", datastream.id(), status),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Repository for FedoraRepository {
    async fn fetch_relationships(&self, id: &Identifier) -> Result<String> {
        self.load(id, Datastream::Relationships).await
    }

    async fn fetch_descriptive_metadata(&self, id: &Identifier) -> Result<String> {
        self.load(id, Datastream::Metadata).await
    }

    async fn check_reachable(&self, url: &str) -> Result<bool> {
        let response = self.client.get(url).send().await?;
        Ok(response.status() == StatusCode::OK)
    }

    fn name(&self) -> &'static str {
        "fedora"
    }
}
