//! Shared test helpers: repository documents and on-disk storage fixtures.

use crate::config::Config;
use crate::converter::Converter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const RDF_OPEN: &str = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:fedora-model="info:fedora/fedora-system:def/model#" xmlns:kramerius="http://www.nsdl.org/ontologies/relationships#" xmlns:kramerius4="http://www.nsdl.org/ontologies/relationships#"><rdf:Description rdf:about="info:fedora/uuid:any">"#;
const RDF_CLOSE: &str = "</rdf:Description></rdf:RDF>";

/// Relationship document of a page served from `tiles_url`
pub(crate) fn page_rels(tiles_url: &str) -> String {
    format!(
        r#"{RDF_OPEN}<fedora-model:hasModel rdf:resource="info:fedora/model:page"/><kramerius4:tiles-url>{tiles_url}</kramerius4:tiles-url>{RDF_CLOSE}"#
    )
}

/// Relationship document of a container with `children` under `relation`
pub(crate) fn container_rels(model: &str, relation: &str, children: &[&str]) -> String {
    let children: String = children
        .iter()
        .map(|child| format!(r#"<{relation} rdf:resource="info:fedora/{child}"/>"#))
        .collect();
    format!(
        r#"{RDF_OPEN}<fedora-model:hasModel rdf:resource="info:fedora/{model}"/>{children}{RDF_CLOSE}"#
    )
}

/// Descriptive metadata with a publication date
pub(crate) fn mods_date(date: &str) -> String {
    format!(
        r#"<mods:modsCollection xmlns:mods="http://www.loc.gov/mods/v3"><mods:mods><mods:originInfo><mods:dateIssued>ignored</mods:dateIssued></mods:originInfo><mods:part><mods:date>{date}</mods:date></mods:part></mods:mods></mods:modsCollection>"#
    )
}

/// Descriptive metadata with an issue designation
pub(crate) fn mods_number(number: &str) -> String {
    format!(
        r#"<mods:modsCollection xmlns:mods="http://www.loc.gov/mods/v3"><mods:mods><mods:titleInfo><mods:partNumber>x</mods:partNumber></mods:titleInfo><mods:part><mods:detail type="issue"><mods:number>{number}</mods:number></mods:detail></mods:part></mods:mods></mods:modsCollection>"#
    )
}

/// Storage tree and job directory inside one temp dir.
///
/// The temp dir is removed when the fixture is dropped, so keep it alive for the
/// whole test.
pub(crate) struct StorageFixture {
    pub dir: TempDir,
    pub config: Config,
}

impl StorageFixture {
    /// Fresh fixture with small limits suitable for tests
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.storage.mzk_base = dir.path().join("mzk");
        config.storage.ndk_base = dir.path().join("ndk");
        config.storage.job_dir = dir.path().join("batches");
        config.storage.temp_dir = dir.path().join("tmp");
        config.limits.discovery_timeout = Duration::from_secs(10);
        config.tools.search_path = false;

        for path in [
            &config.storage.mzk_base,
            &config.storage.job_dir,
            &config.storage.temp_dir,
        ] {
            std::fs::create_dir_all(path).unwrap();
        }

        Self { dir, config }
    }

    /// Job directory
    pub(crate) fn job_dir(&self) -> &Path {
        &self.config.storage.job_dir
    }

    /// Write a page image under the MZK mount at `relative` (extension included)
    pub(crate) fn write_page(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.config.storage.mzk_base.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// Converter that copies the source, counting calls and peak concurrency
#[derive(Default)]
pub(crate) struct CopyConverter {
    latency: Option<Duration>,
    conversions: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl CopyConverter {
    /// Converter sleeping `latency` inside every conversion
    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Default::default()
        }
    }

    /// Conversions finished so far
    pub(crate) fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }

    /// Highest number of conversions observed running at once
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Converter for CopyConverter {
    async fn convert(&self, source: &Path, target: &Path) -> crate::Result<()> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = tokio::fs::copy(source, target).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.conversions.fetch_add(1, Ordering::SeqCst);
        result?;
        Ok(())
    }

    fn can_convert(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}
