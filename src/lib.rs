//! # pagepack
//!
//! Batch export of digital-library page images into zip archives.
//!
//! ## Design Philosophy
//!
//! pagepack is designed to be:
//! - **Library-first** - No HTTP or UI layer, purely a Rust crate for embedding
//! - **Restart-safe** - Job state lives in marker files next to the archives
//! - **Bounded** - Page ceiling, discovery timeout and packaging slots cap every job
//! - **Pluggable** - Repository access and image conversion sit behind traits
//!
//! ## How a job runs
//!
//! A job names one or more root objects of a Fedora/Kramerius repository. Each
//! root is crawled down to its pages (monographs, maps, periodicals with their
//! volumes and issues), every page is mapped onto its image file in storage,
//! and the files are streamed into one archive, converted on the fly when a
//! different format was requested. While that happens the job directory shows
//! `name.zip_s` (searching), `name.zip_w` (waiting), `name.zip_p` (packing),
//! and finally `name.zip` or a one-line failure report in `name.zip_e`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagepack::{Config, Exporter, ImageFormat, JobRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = Exporter::new(Config::from_env()?).await?;
//!
//!     let request = JobRequest::single("atlas", "uuid:4f359870-e163-11e5-b1e2-005056825209", ImageFormat::Jpg)
//!         .with_pages(Some(1), Some(20));
//!     let job = exporter.submit(request).await?;
//!     let name = job.name().to_string();
//!     println!("{name} finished: {:?}", job.wait().await?);
//!
//!     for info in exporter.list_jobs().await? {
//!         println!("{} {:?} {:?}", info.file_name, info.status, info.size_bytes);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Image format conversion
pub mod converter;
/// Recursive hierarchy crawler
pub mod crawler;
/// Error types
pub mod error;
/// Job orchestration and caller-facing operations
pub mod exporter;
/// Archive packaging
pub mod packaging;
/// Image-server URL to storage path mapping
pub mod paths;
/// Digital-repository access
pub mod repository;
/// Object-model resolution
pub mod resolver;
/// Marker-file job state
pub mod store;
/// Export tree and page counter
pub mod tree;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, LimitsConfig, NdkMount, RepositoryConfig, StorageConfig, ToolsConfig};
pub use converter::{CommandConverter, Converter, NoOpConverter};
pub use error::{Error, PackagingError, Result};
pub use exporter::{Exporter, JobHandle};
pub use repository::{FedoraRepository, MemoryRepository, Repository};
pub use types::{
    Bounds, Identifier, ImageFormat, JobConfig, JobInfo, JobRequest, JobStatus, ObjectModel,
    RangeFilter,
};
