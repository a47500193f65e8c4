//! Configuration types for pagepack

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Storage layout: where archives go and where page images live
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding archives and job markers (default: "./batches")
    #[serde(default = "default_job_dir")]
    pub job_dir: PathBuf,

    /// Directory for temporary converted images (default: system temp dir)
    #[serde(default = "std::env::temp_dir")]
    pub temp_dir: PathBuf,

    /// Mount root for images served from the main image server
    #[serde(default)]
    pub mzk_base: PathBuf,

    /// Mount root for images served from the NDK digitisation storage
    #[serde(default)]
    pub ndk_base: PathBuf,

    /// Year bands routing NDK images onto mount aliases
    #[serde(default = "default_ndk_mounts")]
    pub ndk_mounts: Vec<NdkMount>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            job_dir: default_job_dir(),
            temp_dir: std::env::temp_dir(),
            mzk_base: PathBuf::new(),
            ndk_base: PathBuf::new(),
            ndk_mounts: default_ndk_mounts(),
        }
    }
}

/// One contiguous band of years stored under a mount alias
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdkMount {
    /// First year of the band (inclusive)
    pub from_year: u16,
    /// Last year of the band (inclusive)
    pub to_year: u16,
    /// Directory name replacing the `NDK` segment
    pub alias: String,
}

impl NdkMount {
    /// Band covering `from_year..=to_year`
    pub fn new(from_year: u16, to_year: u16, alias: impl Into<String>) -> Self {
        Self {
            from_year,
            to_year,
            alias: alias.into(),
        }
    }

    /// Whether `year` falls in this band
    pub fn covers(&self, year: u16) -> bool {
        (self.from_year..=self.to_year).contains(&year)
    }
}

/// Repository access
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Base URL of the Fedora REST endpoint (default: "http://localhost:8080/fedora")
    #[serde(default = "default_repository_url")]
    pub base_url: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout: Duration,

    /// Verify every image-server URL answers before accepting a page (default: false)
    #[serde(default)]
    pub check_image_exists: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_repository_url(),
            timeout: default_request_timeout(),
            check_image_exists: false,
        }
    }
}

/// Resource bounds of discovery and packaging
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum pages per job (default: 2000)
    #[serde(default = "default_page_ceiling")]
    pub page_ceiling: usize,

    /// Concurrent root crawls within one job (default: 4)
    #[serde(default = "default_discovery_workers")]
    pub discovery_workers: usize,

    /// Wall-clock limit on discovery (default: 60 seconds)
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout: Duration,

    /// Archives written at the same time across all jobs (default: 2)
    #[serde(default = "default_packaging_slots")]
    pub packaging_slots: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            page_ceiling: default_page_ceiling(),
            discovery_workers: default_discovery_workers(),
            discovery_timeout: default_discovery_timeout(),
            packaging_slots: default_packaging_slots(),
        }
    }
}

/// External image converter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the converter executable (auto-detected if None)
    #[serde(default)]
    pub converter_path: Option<PathBuf>,

    /// Arguments placed before the source and target paths
    #[serde(default)]
    pub converter_args: Vec<String>,

    /// Whether to search PATH for a converter if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            converter_path: None,
            converter_args: Vec::new(),
            search_path: true,
        }
    }
}

/// Main configuration for [`Exporter`](crate::Exporter)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Repository access
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Discovery and packaging bounds
    #[serde(default)]
    pub limits: LimitsConfig,

    /// External converter
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Build a configuration from the deployment environment.
    ///
    /// Required: `BASE_PATH_MZK`, `BASE_PATH_NDK`, `BATCH_PATH`.
    /// Optional: `FEDORA_URL`, `JP2_TO_JPG_CONVERT` (a command line; the first
    /// word is the program, the rest are leading arguments).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::config(format!("{key} is not set"), key))
        };

        let mut config = Config::default();
        config.storage.mzk_base = PathBuf::from(required("BASE_PATH_MZK")?);
        config.storage.ndk_base = PathBuf::from(required("BASE_PATH_NDK")?);
        config.storage.job_dir = PathBuf::from(required("BATCH_PATH")?);

        if let Some(url) = lookup("FEDORA_URL").filter(|v| !v.is_empty()) {
            config.repository.base_url = url;
        }

        if let Some(command) = lookup("JP2_TO_JPG_CONVERT") {
            let mut words = command.split_whitespace();
            if let Some(program) = words.next() {
                config.tools.converter_path = Some(PathBuf::from(program));
                config.tools.converter_args = words.map(str::to_string).collect();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject bounds that would stall every job
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.page_ceiling == 0 {
            return Err(Error::config("page_ceiling must be positive", "page_ceiling"));
        }
        if limits.discovery_workers == 0 {
            return Err(Error::config(
                "discovery_workers must be positive",
                "discovery_workers",
            ));
        }
        if limits.packaging_slots == 0 {
            return Err(Error::config(
                "packaging_slots must be positive",
                "packaging_slots",
            ));
        }
        if self.storage.ndk_mounts.iter().any(|m| m.from_year > m.to_year) {
            return Err(Error::config(
                "ndk_mounts contains an inverted year band",
                "ndk_mounts",
            ));
        }
        Ok(())
    }
}

fn default_job_dir() -> PathBuf {
    PathBuf::from("./batches")
}

fn default_ndk_mounts() -> Vec<NdkMount> {
    vec![
        NdkMount::new(2012, 2013, "ndk01"),
        NdkMount::new(2014, 2014, "ndk02"),
        NdkMount::new(2015, 2016, "ndk03"),
        NdkMount::new(2017, 2018, "ndk04"),
        NdkMount::new(2019, 2019, "ndk2019"),
    ]
}

fn default_repository_url() -> String {
    "http://localhost:8080/fedora".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_ceiling() -> usize {
    2000
}

fn default_discovery_workers() -> usize {
    4
}

fn default_discovery_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_packaging_slots() -> usize {
    2
}

fn default_true() -> bool {
    true
}
