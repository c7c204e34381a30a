//! Output verification and housekeeping of the output directory

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::rules::is_intermediate_name;
use crate::utils::time::age_of;

pub mod verifier;

pub use verifier::OutputVerifier;

/// Delete a file, logging instead of failing; a missing file is fine
pub async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Delete intermediates left behind by tasks that never finished, e.g. after a crash.
///
/// Only `temp_*.mp4|mp3` files directly inside `dir` older than `max_age` are touched.
pub fn sweep_stale_intermediates(dir: &Path, max_age: Duration) -> Vec<PathBuf> {
    let now = SystemTime::now();
    let mut removed = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        if !is_intermediate_name(&name) {
            continue;
        }

        let stale = entry
            .metadata()
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .is_some_and(|modified| age_of(modified, now) > max_age);
        if !stale {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!("Removed stale intermediate {}", entry.path().display());
                removed.push(entry.path().to_path_buf());
            }
            Err(e) => warn!("Failed to remove stale intermediate {}: {}", entry.path().display(), e),
        }
    }

    if !removed.is_empty() {
        info!("Swept {} stale intermediate files", removed.len());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_best_effort_tolerates_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gone.mp4");
        remove_best_effort(&path).await;

        std::fs::write(&path, b"x").unwrap();
        remove_best_effort(&path).await;
        assert!(!path.exists());
    }

    #[test]
    fn test_sweep_only_removes_old_intermediates() {
        let dir = tempfile::TempDir::new().unwrap();
        let temp = dir.path().join("temp_task_1_abc_part1.mp4");
        let keep = dir.path().join("clip.mp4");
        std::fs::write(&temp, b"x").unwrap();
        std::fs::write(&keep, b"x").unwrap();

        // Nothing is old enough yet
        assert!(sweep_stale_intermediates(dir.path(), Duration::from_secs(3600)).is_empty());
        assert!(temp.exists());

        std::thread::sleep(Duration::from_millis(20));
        let removed = sweep_stale_intermediates(dir.path(), Duration::from_millis(1));
        assert_eq!(removed, vec![temp.clone()]);
        assert!(!temp.exists());
        assert!(keep.exists());
    }
}
