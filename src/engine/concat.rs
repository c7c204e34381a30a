//! Concatenation of per-interval clips into one file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::engine::EngineConfig;
use crate::error::{ClipperError, ClipperResult, LOG_DIAGNOSTIC_CHARS};
use crate::output::remove_best_effort;
use crate::ports::{Invocation, ProcessPort};
use crate::utils::truncate_chars;

/// Concat demuxer manifest: one `file '<path>'` line per input, in order
pub fn manifest_contents(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|path| {
            let path = path.to_string_lossy().replace('\\', "/").replace('\'', "'\\''");
            format!("file '{}'\n", path)
        })
        .collect()
}

/// Merges clips with the transcoder's stream-copy concat mode
pub struct Concatenator {
    process: Arc<dyn ProcessPort>,
    config: EngineConfig,
}

impl Concatenator {
    pub fn new(process: Arc<dyn ProcessPort>, config: EngineConfig) -> Self {
        Self { process, config }
    }

    /// Merge `files` into `output`.
    ///
    /// The manifest and every input file are deleted afterwards whatever the
    /// outcome; only the merge result itself is reported.
    pub async fn concat(&self, files: &[PathBuf], manifest: &Path, output: &Path) -> ClipperResult<()> {
        let result = self.merge(files, manifest, output).await;

        remove_best_effort(manifest).await;
        for file in files {
            remove_best_effort(file).await;
        }

        result
    }

    async fn merge(&self, files: &[PathBuf], manifest: &Path, output: &Path) -> ClipperResult<()> {
        if let [only] = files {
            // Nothing to merge; the single clip becomes the output
            tokio::fs::rename(only, output).await?;
            debug!("Single clip renamed to {}", output.display());
            return Ok(());
        }

        tokio::fs::write(manifest, manifest_contents(files)).await?;

        let invocation = Invocation::new(&self.config.ffmpeg_path).args([
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest.to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        debug!("Running concat: {}", invocation.display());

        let result = self.process.run(&invocation, &mut |_: &str| {}).await?;
        if result.success() {
            info!("Merged {} clips into {}", files.len(), output.display());
            return Ok(());
        }

        let diagnostics = truncate_chars(result.stderr.trim(), LOG_DIAGNOSTIC_CHARS).into_owned();
        error!(code = ?result.code, "FFmpeg concat failed: {}", diagnostics);
        Err(ClipperError::EngineFailure {
            stage: "FFmpeg concat".to_string(),
            code: result.code,
            diagnostics,
        })
    }
}
