//! Archive packaging: turning a discovered tree into one zip file
//!
//! Packaging is the expensive half of a job, so the number of archives written
//! at once is bounded process-wide by a [`PackagingLimiter`], independently of
//! how many jobs are discovering.

use crate::converter::Converter;
use crate::error::{PackagingError, Result};
use crate::tree::TreeNode;
use crate::types::ImageFormat;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Process-wide bound on concurrent archive writes
#[derive(Clone, Debug)]
pub struct PackagingLimiter {
    slots: Arc<Semaphore>,
}

impl PackagingLimiter {
    /// Limiter admitting `slots` concurrent packaging operations
    pub fn new(slots: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(slots)),
        }
    }

    /// Take a slot if one is free right now
    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).try_acquire_owned().ok()
    }

    /// Wait for a slot
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|e| crate::Error::Worker(format!("packaging limiter closed: {e}")))
    }

    /// Slots free at the moment
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

/// One file of the archive
#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    /// Path inside the archive
    name: String,
    /// Stored page image
    source: PathBuf,
}

/// Writes discovered trees into zip archives
pub struct Packager {
    converter: Arc<dyn Converter>,
    temp_dir: PathBuf,
}

impl Packager {
    /// Packager converting through `converter`, with scratch files in `temp_dir`
    pub fn new(converter: Arc<dyn Converter>, temp_dir: PathBuf) -> Self {
        Self {
            converter,
            temp_dir,
        }
    }

    /// Write every page of `roots` into a new archive at `target`.
    ///
    /// Entries mirror the tree: one directory per object, children before the
    /// node's own pages. Pages not already in `format` are converted into a
    /// scratch file that is removed once streamed. Returns the number of entries.
    /// On error `target` is left behind for the caller to discard.
    pub async fn write_archive(
        &self,
        roots: &[TreeNode],
        format: ImageFormat,
        target: &Path,
    ) -> Result<usize> {
        let entries = plan_entries(roots, format);
        let file = tokio::fs::File::create(target).await?.into_std().await;
        let mut writer = ZipWriter::new(file);

        for entry in &entries {
            if !tokio::fs::try_exists(&entry.source).await? {
                return Err(PackagingError::SourceMissing {
                    path: entry.source.clone(),
                }
                .into());
            }

            let converted = if format.matches(&entry.source) {
                None
            } else {
                Some(self.convert(&entry.source, format).await?)
            };
            let input = converted
                .as_ref()
                .map_or_else(|| entry.source.clone(), |tmp| tmp.to_path_buf());

            let name = entry.name.clone();
            writer = tokio::task::spawn_blocking(move || {
                write_entry(&mut writer, &name, &input).map(|()| writer)
            })
            .await
            .map_err(|e| PackagingError::WriterTask(e.to_string()))??;

            // drop removes the scratch file
            drop(converted);
        }

        tokio::task::spawn_blocking(move || writer.finish())
            .await
            .map_err(|e| PackagingError::WriterTask(e.to_string()))?
            .map_err(PackagingError::from)?;

        info!(archive = %target.display(), entries = entries.len(), %format, "archive written");
        Ok(entries.len())
    }

    async fn convert(&self, source: &Path, format: ImageFormat) -> Result<tempfile::TempPath> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let scratch = tempfile::Builder::new()
            .prefix("pagepack_")
            .suffix(&format!("_{stem}.{}", format.extension()))
            .tempfile_in(&self.temp_dir)?
            .into_temp_path();

        debug!(source = %source.display(), converter = self.converter.name(), "converting page");
        self.converter
            .convert(source, &scratch)
            .await
            .map_err(|e| PackagingError::ConversionFailed {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(scratch)
    }
}

fn write_entry(
    writer: &mut ZipWriter<File>,
    name: &str,
    input: &Path,
) -> std::result::Result<(), PackagingError> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);
    writer.start_file(name, options)?;
    let mut source = File::open(input).map_err(zip::result::ZipError::from)?;
    std::io::copy(&mut source, writer).map_err(zip::result::ZipError::from)?;
    Ok(())
}

fn plan_entries(roots: &[TreeNode], format: ImageFormat) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut used = HashSet::new();
    for root in roots {
        plan_node(root, "", format, &mut entries, &mut used);
    }
    entries
}

fn plan_node(
    node: &TreeNode,
    parent: &str,
    format: ImageFormat,
    entries: &mut Vec<Entry>,
    used: &mut HashSet<String>,
) {
    let dir = format!("{parent}{}/", node.name().as_str().replace(':', "_"));

    for child in node.children() {
        plan_node(child, &dir, format, entries, used);
    }

    for page in node.pages() {
        let file_name = if format.matches(page) {
            page.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            let stem = page
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{stem}.{}", format.extension())
        };

        let mut name = format!("{dir}{file_name}");
        let mut copy = 1;
        while !used.insert(name.clone()) {
            copy += 1;
            name = format!("{dir}{copy}_{file_name}");
        }

        entries.push(Entry {
            name,
            source: page.clone(),
        });
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NoOpConverter;
    use crate::error::Error;
    use crate::test_helpers::{CopyConverter, StorageFixture};
    use crate::types::Identifier;
    use std::io::Read;

    fn id(value: &str) -> Identifier {
        Identifier::parse(value).unwrap()
    }

    fn read_archive(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_entries_mirror_tree_children_first() {
        let mut root = TreeNode::new(id("uuid:per"));
        root.add_page_path(PathBuf::from("/m/cover.jp2"));
        root.create_child(id("uuid:vol"))
            .unwrap()
            .add_page_path(PathBuf::from("/m/v/0001.jp2"));

        let names: Vec<String> = plan_entries(&[root], ImageFormat::Jpg)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(
            names,
            vec!["uuid_per/uuid_vol/0001.jpg", "uuid_per/cover.jpg"]
        );
    }

    #[test]
    fn test_colliding_file_names_get_distinct_entries() {
        let mut root = TreeNode::new(id("uuid:mono"));
        root.add_page_path(PathBuf::from("/a/0001.jp2"));
        root.add_page_path(PathBuf::from("/b/0001.jp2"));

        let names: Vec<String> = plan_entries(&[root], ImageFormat::Jp2)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["uuid_mono/0001.jp2", "uuid_mono/2_0001.jp2"]);
    }

    #[tokio::test]
    async fn test_stored_format_is_streamed_unchanged() {
        let fixture = StorageFixture::new();
        let page = fixture.write_page("mono/0001.jp2", b"jp2-bytes");
        let mut root = TreeNode::new(id("uuid:mono"));
        root.add_page_path(page);

        let target = fixture.job_dir().join("out.zip_p");
        let packager = Packager::new(Arc::new(NoOpConverter), fixture.config.storage.temp_dir.clone());
        let written = packager
            .write_archive(&[root], ImageFormat::Jp2, &target)
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            read_archive(&target),
            vec![("uuid_mono/0001.jp2".to_string(), b"jp2-bytes".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_conversion_uses_scratch_files_and_cleans_up() {
        let fixture = StorageFixture::new();
        let mut root = TreeNode::new(id("uuid:mono"));
        root.add_page_path(fixture.write_page("mono/0001.jp2", b"one"));
        root.add_page_path(fixture.write_page("mono/0002.jp2", b"two"));

        let converter = Arc::new(CopyConverter::default());
        let target = fixture.job_dir().join("out.zip_p");
        let packager = Packager::new(converter.clone(), fixture.config.storage.temp_dir.clone());
        packager
            .write_archive(&[root], ImageFormat::Jpg, &target)
            .await
            .unwrap();

        assert_eq!(converter.conversions(), 2);
        assert_eq!(
            read_archive(&target),
            vec![
                ("uuid_mono/0001.jpg".to_string(), b"one".to_vec()),
                ("uuid_mono/0002.jpg".to_string(), b"two".to_vec()),
            ]
        );
        let leftovers = std::fs::read_dir(&fixture.config.storage.temp_dir)
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let fixture = StorageFixture::new();
        let mut root = TreeNode::new(id("uuid:mono"));
        root.add_page_path(fixture.dir.path().join("mzk/absent.jp2"));

        let packager = Packager::new(Arc::new(NoOpConverter), fixture.config.storage.temp_dir.clone());
        let err = packager
            .write_archive(&[root], ImageFormat::Jp2, &fixture.job_dir().join("out.zip_p"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Packaging(PackagingError::SourceMissing { .. })),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_conversion_without_converter_fails() {
        let fixture = StorageFixture::new();
        let mut root = TreeNode::new(id("uuid:mono"));
        root.add_page_path(fixture.write_page("mono/0001.jp2", b"one"));

        let packager = Packager::new(Arc::new(NoOpConverter), fixture.config.storage.temp_dir.clone());
        let err = packager
            .write_archive(&[root], ImageFormat::Jpg, &fixture.job_dir().join("out.zip_p"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Packaging(PackagingError::ConversionFailed { .. })),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_limiter_admits_up_to_slots() {
        let limiter = PackagingLimiter::new(2);
        let first = limiter.try_admit().unwrap();
        let _second = limiter.try_admit().unwrap();
        assert!(limiter.try_admit().is_none());

        drop(first);
        assert_eq!(limiter.available(), 1);
        let _third = limiter.admit().await.unwrap();
        assert_eq!(limiter.available(), 0);
    }
}
