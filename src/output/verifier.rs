//! Output verification: existence and a plausible minimum size

use std::path::Path;

use tracing::{info, warn};

use crate::error::{ClipperError, ClipperResult};
use crate::utils::format_file_size;

/// Guards against an engine run that exits cleanly but writes nothing useful
#[derive(Debug, Clone, Copy)]
pub struct OutputVerifier {
    min_bytes: u64,
}

impl OutputVerifier {
    pub fn new(min_bytes: u64) -> Self {
        Self { min_bytes }
    }

    /// Size of the verified file
    pub async fn verify(&self, path: &Path) -> ClipperResult<u64> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                warn!("Output file missing: {}", path.display());
                return Err(ClipperError::Verification {
                    message: "Output file not found".to_string(),
                });
            }
        };

        let size = metadata.len();
        if size <= self.min_bytes {
            warn!(size, min = self.min_bytes, "Output file too small: {}", path.display());
            return Err(ClipperError::Verification {
                message: format!("Output file too small ({} bytes)", size),
            });
        }

        info!("Verified output {} ({})", path.display(), format_file_size(size));
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_accepts_plausible_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        assert_eq!(OutputVerifier::new(1000).verify(&path).await.unwrap(), 2048);
    }

    #[tokio::test]
    async fn test_verify_rejects_missing_and_tiny_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let verifier = OutputVerifier::new(1000);

        let missing = verifier.verify(&dir.path().join("none.mp4")).await;
        assert!(matches!(missing, Err(ClipperError::Verification { .. })));

        let tiny = dir.path().join("tiny.mp4");
        std::fs::write(&tiny, b"abc").unwrap();
        let err = verifier.verify(&tiny).await.unwrap_err();
        assert_eq!(err.to_string(), "Verification failed: Output file too small (3 bytes)");
    }
}
