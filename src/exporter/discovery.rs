//! Discovery: crawls every root of a job into one shared tree.

use super::Exporter;
use crate::crawler::Crawler;
use crate::error::{Error, Result};
use crate::paths::PathResolver;
use crate::resolver::ModelResolver;
use crate::tree::{ExportTree, PageCounter, TreeNode};
use crate::types::{Identifier, JobConfig};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

impl Exporter {
    /// Expand every root of `job`, returning the finished root subtrees.
    ///
    /// Roots are crawled concurrently, at most `discovery_workers` at a time,
    /// all counting into one [`PageCounter`]. The whole phase is bounded by
    /// `discovery_timeout`; on expiry every outstanding crawl is aborted.
    pub(crate) async fn discover(&self, job: &JobConfig) -> Result<Vec<TreeNode>> {
        if job.roots.is_empty() {
            return Err(Error::EmptyRequest);
        }
        let roots = job
            .roots
            .iter()
            .map(|root| Identifier::parse(root.as_str()))
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| warn!(job = %job.name, error = %e, "invalid root identifier"))?;

        let limits = &self.config.limits;
        let counter = PageCounter::new();
        let crawler = Arc::new(Crawler::new(
            ModelResolver::new(
                Arc::clone(&self.repository),
                self.config.repository.check_image_exists,
            ),
            PathResolver::new(&self.config.storage),
            job.ranges.clone(),
            counter.clone(),
            limits.page_ceiling,
        ));
        let tree = Arc::new(ExportTree::new());
        let workers = Arc::new(Semaphore::new(limits.discovery_workers));

        let mut tasks = JoinSet::new();
        for (position, root) in roots.into_iter().enumerate() {
            if !tree.reserve(position, &root) {
                debug!(job = %job.name, root = %root, "duplicate root skipped");
                continue;
            }

            let crawler = Arc::clone(&crawler);
            let tree = Arc::clone(&tree);
            let workers = Arc::clone(&workers);
            tasks.spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Worker(format!("discovery pool closed: {e}")))?;

                let mut node = TreeNode::new(root);
                crawler.crawl(&mut node).await?;
                debug!(root = %node.name(), pages = node.total_pages(), "root crawled");
                tree.publish(node);
                Ok::<(), Error>(())
            });
        }

        let finished = tokio::time::timeout(limits.discovery_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                joined.map_err(|e| Error::Worker(format!("crawl task failed: {e}")))??;
            }
            Ok::<(), Error>(())
        })
        .await;

        match finished {
            Ok(result) => result?,
            Err(_) => {
                tasks.abort_all();
                return Err(Error::DiscoveryTimeout(limits.discovery_timeout));
            }
        }

        let count = counter.get();
        if count > limits.page_ceiling {
            return Err(Error::PageCeilingExceeded {
                count,
                ceiling: limits.page_ceiling,
            });
        }

        let tree = Arc::try_unwrap(tree)
            .map_err(|_| Error::Worker("export tree still shared after discovery".into()))?;
        let roots = tree.into_roots();
        let pages: usize = roots.iter().map(TreeNode::total_pages).sum();
        if pages == 0 {
            return Err(Error::EmptyResult);
        }

        info!(job = %job.name, roots = roots.len(), pages, "discovery complete");
        Ok(roots)
    }
}
