//! Job orchestration and the caller-facing operations.
//!
//! The `Exporter` struct and its methods are organized by stage:
//! - [`discovery`] - Fan-out of root crawls over a bounded worker pool
//! - [`pipeline`] - Job lifecycle: markers, discovery, packaging slot, archive commit

mod discovery;
mod pipeline;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::{Config, ToolsConfig};
use crate::converter::{CommandConverter, Converter, NoOpConverter};
use crate::error::{Error, Result};
use crate::packaging::PackagingLimiter;
use crate::repository::{FedoraRepository, Repository};
use crate::store::JobStore;
use crate::types::{JobConfig, JobInfo, JobRequest, JobStatus, normalize_job_name};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main exporter instance (cloneable - all fields are Arc-wrapped)
///
/// Jobs run in background tasks; the only way to observe them is through the
/// job directory ([`Exporter::list_jobs`], [`Exporter::job_status`]).
#[derive(Clone)]
pub struct Exporter {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Object repository the crawler reads from
    pub(crate) repository: Arc<dyn Repository>,
    /// Format converter used while packaging
    pub(crate) converter: Arc<dyn Converter>,
    /// Marker-file job state
    pub(crate) store: JobStore,
    /// Process-wide bound on concurrent archive writes
    pub(crate) packaging: PackagingLimiter,
}

/// Handle to a submitted job
#[derive(Debug)]
pub struct JobHandle {
    name: String,
    store: JobStore,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Normalized job name (the archive file name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the job to reach a terminal state and return it
    pub async fn wait(self) -> Result<JobStatus> {
        self.task
            .await
            .map_err(|e| Error::Worker(format!("job {} task failed: {e}", self.name)))?;
        self.store
            .status(&self.name)
            .await?
            .ok_or_else(|| Error::Worker(format!("job {} left no artifacts", self.name)))
    }
}

impl Exporter {
    /// Create an exporter talking to the configured Fedora repository
    ///
    /// The converter is chosen from `config.tools`: an explicit binary, else
    /// ImageMagick found in PATH, else a converter that refuses every
    /// conversion (exports in the stored format still work).
    pub async fn new(config: Config) -> Result<Self> {
        let repository: Arc<dyn Repository> = Arc::new(FedoraRepository::new(&config.repository)?);
        let converter = select_converter(&config.tools);
        Self::with_collaborators(config, repository, converter).await
    }

    /// Create an exporter over caller-supplied collaborators
    pub async fn with_collaborators(
        config: Config,
        repository: Arc<dyn Repository>,
        converter: Arc<dyn Converter>,
    ) -> Result<Self> {
        config.validate()?;
        create_dir(&config.storage.job_dir, "job").await?;
        create_dir(&config.storage.temp_dir, "temp").await?;

        info!(
            repository = repository.name(),
            converter = converter.name(),
            can_convert = converter.can_convert(),
            job_dir = %config.storage.job_dir.display(),
            "exporter initialized"
        );

        Ok(Self {
            store: JobStore::new(config.storage.job_dir.clone()),
            packaging: PackagingLimiter::new(config.limits.packaging_slots),
            config: Arc::new(config),
            repository,
            converter,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Job directory access
    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Accept a job and start it in the background.
    ///
    /// Fails before any crawling when the name is invalid or already used by
    /// any artifact in the job directory. Everything after acceptance is
    /// reported through the job directory only.
    pub async fn submit(&self, request: JobRequest) -> Result<JobHandle> {
        let job = JobConfig::from_request(request)?;
        self.store.claim(&job.name).await?;
        info!(job = %job.name, roots = job.roots.len(), format = %job.format, "job accepted");

        let name = job.name.clone();
        let exporter = self.clone();
        let task = tokio::spawn(async move { exporter.run_job(job).await });

        Ok(JobHandle {
            name,
            store: self.store.clone(),
            task,
        })
    }

    /// Every job artifact with its status and, where known, archive size
    pub async fn list_jobs(&self) -> Result<Vec<JobInfo>> {
        self.store.list().await
    }

    /// Status of one job (`.zip` is appended to `name` when missing)
    pub async fn job_status(&self, name: &str) -> Result<Option<JobStatus>> {
        self.store.status(&normalize_job_name(name)?).await
    }

    /// Path of a completed archive, if it exists
    pub async fn archive(&self, name: &str) -> Result<Option<PathBuf>> {
        self.store.completed_archive(&normalize_job_name(name)?).await
    }

    /// Delete one job artifact by file name; `false` if it did not exist
    pub async fn delete(&self, file_name: &str) -> Result<bool> {
        let deleted = self.store.delete(file_name).await?;
        info!(file = file_name, deleted, "delete requested");
        Ok(deleted)
    }
}

fn select_converter(tools: &ToolsConfig) -> Arc<dyn Converter> {
    if let Some(ref path) = tools.converter_path {
        // Use explicitly configured binary
        Arc::new(CommandConverter::new(path.clone()).with_args(tools.converter_args.clone()))
    } else if tools.search_path {
        CommandConverter::from_path()
            .map(|c| Arc::new(c.with_args(tools.converter_args.clone())) as Arc<dyn Converter>)
            .unwrap_or_else(|| Arc::new(NoOpConverter))
    } else {
        Arc::new(NoOpConverter)
    }
}

async fn create_dir(path: &Path, what: &str) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to create {what} directory '{}': {}",
                path.display(),
                e
            ),
        ))
    })
}
