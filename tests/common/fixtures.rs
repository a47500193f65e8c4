//! Repository documents, mock Fedora endpoints and storage trees

use pagepack::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Relationship document of a page served from `tiles_url`
pub fn page_rels(tiles_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="info:fedora/uuid:page">
    <hasModel xmlns="info:fedora/fedora-system:def/model#" rdf:resource="info:fedora/model:page"></hasModel>
    <tiles-url xmlns="http://www.nsdl.org/ontologies/relationships#">{tiles_url}</tiles-url>
  </rdf:Description>
</rdf:RDF>"#
    )
}

/// Relationship document of a container with `children` under `relation`
pub fn container_rels(model: &str, relation: &str, children: &[&str]) -> String {
    let children: String = children
        .iter()
        .map(|child| {
            format!(
                r#"    <{relation} xmlns:kramerius="http://www.nsdl.org/ontologies/relationships#" rdf:resource="info:fedora/{child}"/>
"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="info:fedora/uuid:container">
    <fedora-model:hasModel xmlns:fedora-model="info:fedora/fedora-system:def/model#" rdf:resource="info:fedora/{model}"/>
{children}  </rdf:Description>
</rdf:RDF>"#
    )
}

/// Descriptive metadata carrying an issue designation
pub fn mods_number(number: &str) -> String {
    format!(
        r#"<modsCollection xmlns="http://www.loc.gov/mods/v3"><mods><part><detail type="issue"><number>{number}</number></detail></part></mods></modsCollection>"#
    )
}

/// Serve `body` as datastream `datastream` of `id`
pub async fn mount_datastream(server: &MockServer, id: &str, datastream: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/fedora/objects/{id}/datastreams/{datastream}/content"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Answer `status` for GETs of `url_path` (image reachability checks)
pub async fn mount_image(server: &MockServer, url_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Storage mounts and job directory in one temp dir, configured for `server`
pub struct Storage {
    pub dir: TempDir,
    pub config: Config,
}

impl Storage {
    pub fn new(server: &MockServer) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.storage.mzk_base = dir.path().join("mzk");
        config.storage.ndk_base = dir.path().join("ndk");
        config.storage.job_dir = dir.path().join("batches");
        config.storage.temp_dir = dir.path().join("tmp");
        config.repository.base_url = format!("{}/fedora", server.uri());
        config.limits.discovery_timeout = Duration::from_secs(10);
        config.tools.search_path = false;

        Self { dir, config }
    }

    /// Write an image file below `base` at `relative`
    pub fn write_image(&self, base: &Path, relative: &str, contents: &[u8]) -> PathBuf {
        let path = base.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// Sorted entry names of a zip archive
pub fn archive_entries(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}
