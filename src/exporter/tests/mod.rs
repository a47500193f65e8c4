use super::*;
use crate::repository::MemoryRepository;
use crate::resolver::{HAS_ITEM, HAS_PAGE, HAS_VOLUME};
use crate::store::Marker;
use crate::test_helpers::{
    CopyConverter, StorageFixture, container_rels, mods_date, page_rels,
};
use crate::types::ImageFormat;
use std::time::Duration;


/// Exporter over an in-memory repository and a copying converter
struct Harness {
    exporter: Exporter,
    repo: Arc<MemoryRepository>,
    converter: Arc<CopyConverter>,
    fixture: StorageFixture,
}

impl Harness {
    async fn new() -> Self {
        Self::build(StorageFixture::new(), MemoryRepository::new(), CopyConverter::default()).await
    }

    async fn build(
        fixture: StorageFixture,
        repo: MemoryRepository,
        converter: CopyConverter,
    ) -> Self {
        let repo = Arc::new(repo);
        let converter = Arc::new(converter);
        let exporter = Exporter::with_collaborators(
            fixture.config.clone(),
            repo.clone(),
            converter.clone(),
        )
        .await
        .unwrap();

        Self {
            exporter,
            repo,
            converter,
            fixture,
        }
    }

    /// Monograph `uuid:{name}` with `pages` stored page images
    fn monograph(&self, name: &str, pages: usize) {
        let ids = self.pages(name, pages);
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        self.repo.insert_relationships(
            format!("uuid:{name}"),
            container_rels("model:monograph", HAS_PAGE, &refs),
        );
    }

    fn pages(&self, prefix: &str, count: usize) -> Vec<String> {
        (1..=count)
            .map(|n| {
                let page = format!("uuid:{prefix}-p{n}");
                self.repo.insert_relationships(
                    page.clone(),
                    page_rels(&format!("http://img.example/{prefix}/p{n}")),
                );
                self.fixture
                    .write_page(&format!("{prefix}/p{n}.jp2"), format!("{prefix}-{n}").as_bytes());
                page
            })
            .collect()
    }

    /// Periodical `uuid:per` with one single-issue volume per year
    fn periodical(&self, years: &[i32]) {
        let mut volumes = Vec::new();
        for year in years {
            let issue = format!("uuid:issue{year}");
            let pages = self.pages(&format!("issue{year}"), 1);
            self.repo.insert_relationships(
                issue.clone(),
                container_rels("model:periodicalitem", HAS_PAGE, &[pages[0].as_str()]),
            );

            let volume = format!("uuid:vol{year}");
            self.repo.insert_relationships(
                volume.clone(),
                container_rels("model:periodicalvolume", HAS_ITEM, &[issue.as_str()]),
            );
            self.repo.insert_metadata(volume.clone(), mods_date(&year.to_string()));
            volumes.push(volume);
        }
        let refs: Vec<&str> = volumes.iter().map(String::as_str).collect();
        self.repo.insert_relationships(
            "uuid:per",
            container_rels("model:periodical", HAS_VOLUME, &refs),
        );
    }

    fn job_dir_files(&self) -> Vec<String> {
        let mut files: Vec<String> = std::fs::read_dir(self.fixture.job_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();
        files
    }
}

fn archive_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Poll until `name` reaches `status` or the deadline passes
async fn wait_for_status(exporter: &Exporter, name: &str, status: JobStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if exporter.job_status(name).await.unwrap() == Some(status.clone()) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {name} never reached {status:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn failed(report: &str) -> JobStatus {
    JobStatus::Failed(report.to_string())
}
