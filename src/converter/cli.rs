//! Converter running an external binary

use super::traits::Converter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Binaries tried, in order, when searching PATH
const CANDIDATES: [&str; 2] = ["magick", "convert"];

/// Converter invoking `binary [args..] source target`
///
/// ImageMagick's `magick` and `convert` both accept that calling convention.
/// Extra arguments (quality settings and the like) go before the file names.
pub struct CommandConverter {
    binary_path: PathBuf,
    args: Vec<String>,
}

impl CommandConverter {
    /// Converter with an explicit binary
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            args: Vec::new(),
        }
    }

    /// Add arguments placed before the source and target paths
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Look for ImageMagick in PATH
    pub fn from_path() -> Option<Self> {
        CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
    }

    /// The binary this converter runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Converter for CommandConverter {
    async fn convert(&self, source: &Path, target: &Path) -> crate::Result<()> {
        debug!(binary = %self.binary_path.display(), source = %source.display(), target = %target.display(), "converting");

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .arg(source)
            .arg(target)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute converter: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(crate::Error::ExternalTool(format!(
                "converter exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn can_convert(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_external_tool_error() {
        let converter = CommandConverter::new(PathBuf::from("/nonexistent/converter-xyz"));
        let result = converter
            .convert(Path::new("a.jp2"), Path::new("a.jpg"))
            .await;
        match result {
            Err(crate::Error::ExternalTool(msg)) => {
                assert!(msg.contains("Failed to execute converter"), "got: {msg}")
            }
            other => panic!("expected ExternalTool, got {other:?}"),
        }
    }

    #[test]
    fn test_from_path_matches_which() {
        let expected = CANDIDATES.iter().find_map(|name| which::which(name).ok());
        let found = CommandConverter::from_path().map(|c| c.binary_path);
        assert_eq!(found, expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_binary_with_source_and_target() {
        let Ok(cp) = which::which("cp") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.jp2");
        let target = dir.path().join("page.jpg");
        std::fs::write(&source, b"pixels").unwrap();

        CommandConverter::new(cp)
            .convert(&source, &target)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"pixels");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let Ok(false_bin) = which::which("false") else {
            return;
        };
        let converter = CommandConverter::new(false_bin).with_args(vec!["-quality".into()]);
        let result = converter
            .convert(Path::new("a.jp2"), Path::new("a.jpg"))
            .await;
        assert!(matches!(result, Err(crate::Error::ExternalTool(_))));
    }
}
