//! Job lifecycle from searching to a committed archive or a failure report.

use super::Exporter;
use crate::error::Result;
use crate::packaging::Packager;
use crate::store::Marker;
use crate::tree::TreeNode;
use crate::types::JobConfig;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, info};

impl Exporter {
    /// Run an accepted job to completion.
    ///
    /// The searching marker was created by [`Exporter::submit`]. Every exit
    /// leaves exactly one artifact: the archive or the failure report.
    pub(crate) async fn run_job(&self, job: JobConfig) {
        let roots = match self.discover(&job).await {
            Ok(roots) => roots,
            Err(e) => {
                self.fail(&job.name, Marker::Searching, &e.to_string()).await;
                return;
            }
        };

        let permit = match self.enter_packaging(&job.name).await {
            Ok(permit) => permit,
            Err(e) => {
                // failed mid-handoff: any of the transient markers may exist
                self.fail(&job.name, Marker::Waiting, &e.to_string()).await;
                self.remove_quietly(&job.name, Marker::Searching).await;
                self.remove_quietly(&job.name, Marker::Packing).await;
                return;
            }
        };

        let result = self.package(&job, &roots).await;
        drop(permit);

        match result {
            Ok(entries) => info!(job = %job.name, entries, "job done"),
            Err(e) => self.fail(&job.name, Marker::Packing, &e.to_string()).await,
        }
    }

    /// Move the job from searching to packing, waiting for a slot if none is free.
    ///
    /// The next marker is always created before the previous one is removed, so
    /// the job is never invisible in the job directory.
    async fn enter_packaging(&self, name: &str) -> Result<OwnedSemaphorePermit> {
        if let Some(permit) = self.packaging.try_admit() {
            self.store.create_marker(name, Marker::Packing).await?;
            self.store.remove_marker(name, Marker::Searching).await?;
            return Ok(permit);
        }

        self.store.create_marker(name, Marker::Waiting).await?;
        self.store.remove_marker(name, Marker::Searching).await?;
        info!(job = %name, "waiting for packaging slot");

        let permit = self.packaging.admit().await?;
        self.store.create_marker(name, Marker::Packing).await?;
        self.store.remove_marker(name, Marker::Waiting).await?;
        Ok(permit)
    }

    async fn package(&self, job: &JobConfig, roots: &[TreeNode]) -> Result<usize> {
        let packer = Packager::new(
            std::sync::Arc::clone(&self.converter),
            self.config.storage.temp_dir.clone(),
        );
        let target = self.store.marker_path(&job.name, Marker::Packing);

        info!(job = %job.name, format = %job.format, "packing");
        let entries = packer.write_archive(roots, job.format, &target).await?;
        self.store.commit(&job.name).await?;
        Ok(entries)
    }

    /// Persist the report, then drop the marker the job held
    async fn fail(&self, name: &str, held: Marker, report: &str) {
        error!(job = %name, report, "job failed");
        if let Err(e) = self.store.write_report(name, report).await {
            error!(job = %name, error = %e, "could not write failure report");
        }
        self.remove_quietly(name, held).await;
    }

    async fn remove_quietly(&self, name: &str, marker: Marker) {
        if let Err(e) = self.store.remove_marker(name, marker).await {
            error!(job = %name, marker = ?marker, error = %e, "could not remove marker");
        }
    }
}
