//! Mapping image-server URLs onto physical storage paths

use crate::config::{NdkMount, StorageConfig};
use crate::error::{Error, Result};
use crate::resolver::ModelResolver;
use crate::types::Identifier;
use std::path::{Path, PathBuf};
use tracing::debug;

/// URL path segment marking images stored on NDK mounts
const NDK_SEGMENT: &str = "NDK";

/// Extension appended to every non-TIFF source
const JP2_EXTENSION: &str = ".jp2";

/// Routes image-server URLs to files under the configured mounts
#[derive(Clone, Debug)]
pub struct PathResolver {
    mzk_base: PathBuf,
    ndk_base: PathBuf,
    ndk_mounts: Vec<NdkMount>,
}

impl PathResolver {
    /// Resolver for the configured storage layout
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            mzk_base: storage.mzk_base.clone(),
            ndk_base: storage.ndk_base.clone(),
            ndk_mounts: storage.ndk_mounts.clone(),
        }
    }

    /// Map an image-server URL to its file on disk.
    ///
    /// Paths with an `NDK` segment are routed by the year in the following
    /// segment onto the matching mount alias under the NDK base; everything else
    /// lives under the MZK base. `.jp2` is appended unless the URL names a TIFF.
    /// Pure: the filesystem is never consulted.
    pub fn resolve_physical_path(&self, image_url: &str) -> Result<PathBuf> {
        let url = url::Url::parse(image_url).map_err(|_| Error::UnroutablePath {
            path: image_url.to_string(),
        })?;
        let path = url.path();

        let segments: Vec<&str> = path.split('/').collect();
        let physical = match segments.iter().position(|s| *s == NDK_SEGMENT) {
            Some(index) => {
                let alias = segments
                    .get(index + 1)
                    .and_then(|year| year.parse::<u16>().ok())
                    .and_then(|year| self.ndk_mounts.iter().find(|m| m.covers(year)))
                    .map(|m| m.alias.as_str())
                    .ok_or_else(|| Error::UnroutablePath {
                        path: path.to_string(),
                    })?;

                let mut routed = segments.clone();
                routed[index] = alias;
                join_relative(&self.ndk_base, &routed.join("/"))
            }
            None => join_relative(&self.mzk_base, path),
        };

        if path.contains(".tif") {
            Ok(physical)
        } else {
            let mut with_extension = physical.into_os_string();
            with_extension.push(JP2_EXTENSION);
            Ok(PathBuf::from(with_extension))
        }
    }

    /// Physical image path of a page.
    ///
    /// Identifiers without the required prefix yield `None` without any
    /// repository access. Existence of the image is not checked here.
    pub async fn resolve_page_image_path(
        &self,
        resolver: &ModelResolver,
        page: &str,
    ) -> Result<Option<PathBuf>> {
        let Ok(page) = Identifier::parse(page) else {
            debug!(page, "skipping page without identifier prefix");
            return Ok(None);
        };

        let url = resolver.image_url(&page).await?;
        self.resolve_physical_path(&url).map(Some)
    }
}

fn join_relative(base: &Path, path: &str) -> PathBuf {
    base.join(path.trim_start_matches('/'))
}
