//! Core types for pagepack

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix every repository object reference must carry
pub const IDENTIFIER_PREFIX: &str = "uuid:";

/// Reference to a repository object, guaranteed to carry [`IDENTIFIER_PREFIX`]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parse an identifier, rejecting values without the required prefix
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if Self::has_prefix(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidIdentifier(value))
        }
    }

    /// Whether `value` carries the identifier prefix
    pub fn has_prefix(value: &str) -> bool {
        value.starts_with(IDENTIFIER_PREFIX)
    }

    /// The full identifier, prefix included
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Structural classification of a repository object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectModel {
    /// A single page
    Page,
    /// Monograph, map or periodical item: holds pages directly
    FlatContainer,
    /// Periodical: holds year-keyed volumes
    PeriodicalRoot,
    /// Periodical volume: holds issue-keyed items
    PeriodicalVolume,
    /// Anything else; never crawled
    Unknown,
}

impl ObjectModel {
    /// Map a repository model name (e.g. `model:monograph`) to a classification
    pub fn from_model_name(name: &str) -> Self {
        match name {
            "model:page" => ObjectModel::Page,
            "model:monograph" | "model:map" | "model:periodicalitem" => ObjectModel::FlatContainer,
            "model:periodical" => ObjectModel::PeriodicalRoot,
            "model:periodicalvolume" => ObjectModel::PeriodicalVolume,
            _ => ObjectModel::Unknown,
        }
    }
}

/// Image format an archive is delivered in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG 2000, the stored format of most pages
    #[default]
    Jp2,
    /// Baseline JPEG, produced by conversion
    Jpg,
}

impl ImageFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jp2 => "jp2",
            ImageFormat::Jpg => "jpg",
        }
    }

    /// Whether a stored file is already in this format
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension()))
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "jp2" => Ok(ImageFormat::Jp2),
            "jpg" => Ok(ImageFormat::Jpg),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Inclusive bounds, either side optional (missing = unbounded)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    /// Lower bound
    pub from: Option<T>,
    /// Upper bound
    pub to: Option<T>,
}

impl<T> Bounds<T> {
    /// Bounds with both sides optional
    pub fn new(from: Option<T>, to: Option<T>) -> Self {
        Self { from, to }
    }

    /// Whether at least one side is set
    pub fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

impl Bounds<usize> {
    /// Select the 1-based inclusive page window from `items`.
    ///
    /// Missing lower bound starts at the first page, missing upper bound ends at the
    /// last. Bounds past the end are clamped; an inverted window is empty.
    pub fn slice<'a, I>(&self, items: &'a [I]) -> &'a [I] {
        let start = self.from.unwrap_or(1).max(1) - 1;
        let end = self.to.unwrap_or(items.len()).min(items.len());
        if start >= end {
            &items[..0]
        } else {
            &items[start..end]
        }
    }
}

/// Range filters of one job, each scoped to one hierarchy level
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeFilter {
    /// Page window within a flat container (1-based, inclusive)
    #[serde(default)]
    pub pages: Bounds<usize>,
    /// Volume years within a periodical
    #[serde(default)]
    pub years: Bounds<i32>,
    /// Issue designations within a volume (string-compared)
    #[serde(default)]
    pub issues: Bounds<String>,
}

/// Caller-facing export request, validated into a [`JobConfig`] on submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRequest {
    /// Job name (`.zip` is appended when missing)
    pub name: String,
    /// Newline-separated list of root identifiers
    pub identifiers: String,
    /// Target image format
    pub format: ImageFormat,
    /// Range filters
    pub ranges: RangeFilter,
    /// Reject `identifiers` holding more than one root
    pub single_root: bool,
}

impl JobRequest {
    /// Export a single root, optionally restricted to a page window later
    ///
    /// A value spanning several non-blank lines is rejected on submission.
    pub fn single(name: impl Into<String>, identifier: impl Into<String>, format: ImageFormat) -> Self {
        Self {
            name: name.into(),
            identifiers: identifier.into(),
            format,
            ranges: RangeFilter::default(),
            single_root: true,
        }
    }

    /// Export every root of a newline-separated identifier list
    pub fn from_list(name: impl Into<String>, list: impl Into<String>, format: ImageFormat) -> Self {
        Self {
            name: name.into(),
            identifiers: list.into(),
            format,
            ranges: RangeFilter::default(),
            single_root: false,
        }
    }

    /// Restrict flat containers to a 1-based inclusive page window
    pub fn with_pages(mut self, from: Option<usize>, to: Option<usize>) -> Self {
        self.ranges.pages = Bounds::new(from, to);
        self
    }

    /// Restrict periodicals to a volume year range
    pub fn with_years(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.ranges.years = Bounds::new(from, to);
        self
    }

    /// Restrict periodical volumes to an issue range
    pub fn with_issues(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.ranges.issues = Bounds::new(from, to);
        self
    }
}

/// Immutable description of an accepted job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobConfig {
    /// Archive file name, always ending in `.zip`
    pub name: String,
    /// Raw identifier lines as requested; validated when the job starts
    pub roots: Vec<String>,
    /// Target image format
    pub format: ImageFormat,
    /// Range filters
    pub ranges: RangeFilter,
}

impl JobConfig {
    /// Normalize a request: validate the name, split and clean the identifier list
    pub fn from_request(request: JobRequest) -> Result<Self> {
        let name = normalize_job_name(&request.name)?;
        let roots: Vec<String> = request
            .identifiers
            .lines()
            .map(|line| line.split_whitespace().collect::<String>())
            .filter(|line| !line.is_empty())
            .collect();
        if request.single_root && roots.len() > 1 {
            return Err(Error::InvalidIdentifier(request.identifiers));
        }

        Ok(Self {
            name,
            roots,
            format: request.format,
            ranges: request.ranges,
        })
    }
}

/// Append `.zip` and reject names that would leave the job directory
pub fn normalize_job_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(Error::InvalidJobName(name.to_string()));
    }
    if name.to_ascii_lowercase().ends_with(".zip") {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}.zip"))
    }
}

/// Job state as observed in the job directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "report", rename_all = "lowercase")]
pub enum JobStatus {
    /// Discovering pages
    Searching,
    /// Waiting for a packaging slot
    Waiting,
    /// Writing the archive
    Packing,
    /// Archive complete
    Done,
    /// Job failed; carries the report line
    Failed(String),
}

impl JobStatus {
    /// Whether the job still occupies its name
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Searching | JobStatus::Waiting | JobStatus::Packing
        )
    }
}

/// One entry of the job listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    /// File name of the artifact (archive or marker)
    pub file_name: String,
    /// Job name the artifact belongs to
    pub job: String,
    /// Status derived from the artifact
    pub status: JobStatus,
    /// Archive size for complete and packing jobs
    pub size_bytes: Option<u64>,
    /// Last modification of the artifact
    pub modified: Option<DateTime<Utc>>,
}
