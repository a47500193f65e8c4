//! No-op converter for deployments without a conversion tool

use super::traits::Converter;
use async_trait::async_trait;
use std::path::Path;

/// Converter used when no external binary is available
///
/// Exports in the stored format keep working; any job that needs a conversion
/// fails with `Error::NotSupported`.
pub struct NoOpConverter;

#[async_trait]
impl Converter for NoOpConverter {
    async fn convert(&self, _source: &Path, _target: &Path) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "Image conversion requires an external converter. \
             Configure converter_path or JP2_TO_JPG_CONVERT, or install ImageMagick."
                .into(),
        ))
    }

    fn can_convert(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
