//! Job state persisted as marker files in the job directory
//!
//! For a job named `name.zip` the artifacts are:
//!
//! | File | State |
//! |---|---|
//! | `name.zip_s` | searching |
//! | `name.zip_w` | waiting for a packaging slot |
//! | `name.zip_p` | packing (the archive being written) |
//! | `name.zip_e` | failed; holds a one-line report |
//! | `name.zip` | done |
//!
//! Nothing else records job state, so a listing of the directory is enough to
//! reconstruct every job, including after a restart.

use crate::error::{Error, Result};
use crate::types::{JobInfo, JobStatus};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Report shown for a failed job whose report is empty
const EMPTY_REPORT: &str = "nok";
/// Report shown for a failed job whose report cannot be read
const UNREADABLE_REPORT: &str = "unknown";

/// Intermediate job states, each backed by one marker file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// Discovery running
    Searching,
    /// Waiting for a packaging slot
    Waiting,
    /// Archive being written
    Packing,
    /// Job failed
    Failed,
}

impl Marker {
    /// Every marker, in the order status lookups check them
    pub const ALL: [Marker; 4] = [
        Marker::Failed,
        Marker::Packing,
        Marker::Waiting,
        Marker::Searching,
    ];

    /// Suffix appended to the job name
    pub fn suffix(&self) -> &'static str {
        match self {
            Marker::Searching => "_s",
            Marker::Waiting => "_w",
            Marker::Packing => "_p",
            Marker::Failed => "_e",
        }
    }

    fn from_file_name(file_name: &str) -> Option<(Marker, &str)> {
        Self::ALL
            .into_iter()
            .find_map(|m| file_name.strip_suffix(m.suffix()).map(|job| (m, job)))
    }
}

/// Job directory holding archives and markers
#[derive(Clone, Debug)]
pub struct JobStore {
    dir: PathBuf,
}

impl JobStore {
    /// Store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The job directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final archive path of `name`
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Marker path of `name`
    pub fn marker_path(&self, name: &str, marker: Marker) -> PathBuf {
        self.dir.join(format!("{name}{}", marker.suffix()))
    }

    /// Reserve `name` for a new job by creating its searching marker.
    ///
    /// Fails with [`Error::JobExists`] if any artifact of `name` exists. The
    /// marker is created before the other artifacts are checked: a running job
    /// creates its next marker before removing the previous one, so it is seen
    /// by one of the two steps.
    pub async fn claim(&self, name: &str) -> Result<()> {
        let searching = self.marker_path(name, Marker::Searching);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&searching)
            .await
        {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(job = %name, artifact = %searching.display(), "job name taken");
                return Err(Error::JobExists(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let mut taken = vec![self.archive_path(name)];
        taken.extend(
            [Marker::Waiting, Marker::Packing, Marker::Failed]
                .into_iter()
                .map(|m| self.marker_path(name, m)),
        );
        for path in &taken {
            if fs::try_exists(path).await? {
                debug!(job = %name, artifact = %path.display(), "job name taken");
                remove_if_exists(&searching).await?;
                return Err(Error::JobExists(name.to_string()));
            }
        }
        Ok(())
    }

    /// Create an empty marker
    pub async fn create_marker(&self, name: &str, marker: Marker) -> Result<()> {
        fs::write(self.marker_path(name, marker), b"").await?;
        Ok(())
    }

    /// Remove a marker; a missing marker is not an error
    pub async fn remove_marker(&self, name: &str, marker: Marker) -> Result<()> {
        remove_if_exists(&self.marker_path(name, marker)).await?;
        Ok(())
    }

    /// Persist the failure report of `name` as a single line
    pub async fn write_report(&self, name: &str, message: &str) -> Result<()> {
        let line = message.lines().collect::<Vec<_>>().join(" ");
        fs::write(self.marker_path(name, Marker::Failed), format!("{line}\n")).await?;
        Ok(())
    }

    /// Publish the packing archive under the final name with one rename
    pub async fn commit(&self, name: &str) -> Result<()> {
        fs::rename(
            self.marker_path(name, Marker::Packing),
            self.archive_path(name),
        )
        .await?;
        Ok(())
    }

    /// Current status of `name`, or `None` if it has no artifacts
    pub async fn status(&self, name: &str) -> Result<Option<JobStatus>> {
        let failed = self.marker_path(name, Marker::Failed);
        if fs::try_exists(&failed).await? {
            return Ok(Some(JobStatus::Failed(read_report(&failed).await)));
        }
        if fs::try_exists(self.archive_path(name)).await? {
            return Ok(Some(JobStatus::Done));
        }
        for (marker, status) in [
            (Marker::Packing, JobStatus::Packing),
            (Marker::Waiting, JobStatus::Waiting),
            (Marker::Searching, JobStatus::Searching),
        ] {
            if fs::try_exists(self.marker_path(name, marker)).await? {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    /// Every job artifact in the directory, sorted by file name
    pub async fn list(&self) -> Result<Vec<JobInfo>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut jobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            if !file_name.contains(".zip") {
                continue;
            }

            let (job, status) = match Marker::from_file_name(&file_name) {
                Some((Marker::Failed, job)) => {
                    (job.to_string(), JobStatus::Failed(read_report(&entry.path()).await))
                }
                Some((Marker::Packing, job)) => (job.to_string(), JobStatus::Packing),
                Some((Marker::Waiting, job)) => (job.to_string(), JobStatus::Waiting),
                Some((Marker::Searching, job)) => (job.to_string(), JobStatus::Searching),
                None if file_name.ends_with(".zip") => (file_name.clone(), JobStatus::Done),
                None => continue,
            };

            let metadata = match entry.metadata().await {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "could not stat job artifact");
                    None
                }
            };
            let size_bytes = match status {
                JobStatus::Done | JobStatus::Packing => metadata.as_ref().map(|m| m.len()),
                _ => None,
            };
            let modified = metadata
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from);

            jobs.push(JobInfo {
                file_name,
                job,
                status,
                size_bytes,
                modified,
            });
        }

        jobs.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(jobs)
    }

    /// Path of the finished archive of `name`, if it exists
    pub async fn completed_archive(&self, name: &str) -> Result<Option<PathBuf>> {
        let path = self.archive_path(name);
        Ok(fs::try_exists(&path).await?.then_some(path))
    }

    /// Delete one job artifact by file name; `false` if it did not exist
    pub async fn delete(&self, file_name: &str) -> Result<bool> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.contains("..")
            || !file_name.contains(".zip")
        {
            return Err(Error::InvalidJobName(file_name.to_string()));
        }
        remove_if_exists(&self.dir.join(file_name)).await
    }
}

async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn read_report(path: &Path) -> String {
    match fs::read_to_string(path).await {
        Ok(text) if text.trim().is_empty() => EMPTY_REPORT.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read failure report");
            UNREADABLE_REPORT.to_string()
        }
    }
}
