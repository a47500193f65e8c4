//! Converter trait

use async_trait::async_trait;
use std::path::Path;

/// Converts a stored page image into another format
///
/// The target format is implied by the extension of `target`. Implementations
/// must either leave a complete file at `target` or return an error.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `source` into `target`
    async fn convert(&self, source: &Path, target: &Path) -> crate::Result<()>;

    /// Whether this implementation can convert at all
    fn can_convert(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
