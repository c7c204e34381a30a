//! Clip executor: one transcoder run per interval

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::model::{Interval, OutputFormat};
use crate::domain::rules::ProgressBand;
use crate::engine::progress::{ProgressCoalescer, ProgressSampler, TimeMarkerSampler};
use crate::engine::resolver::StreamSource;
use crate::engine::EngineConfig;
use crate::error::{ClipperError, ClipperResult, LOG_DIAGNOSTIC_CHARS};
use crate::ports::{Invocation, ProcessPort};
use crate::utils::truncate_chars;

/// Build transcoder arguments for one interval.
///
/// Every input is seeked before it is opened so trimming starts at the
/// nearest point without decoding the skipped media.
pub fn build_args(
    source: &StreamSource,
    interval: &Interval,
    format: OutputFormat,
    output: &Path,
) -> Vec<String> {
    let start = interval.start().format_hms();
    let duration = interval.duration().format_seconds();
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-y".into()];

    match (format, &source.audio) {
        (OutputFormat::Mp3, _) => {
            args.extend([
                "-ss".into(),
                start,
                "-i".into(),
                source.primary.clone(),
                "-t".into(),
                duration,
                "-vn".into(),
                "-c:a".into(),
                "libmp3lame".into(),
                "-q:a".into(),
                "2".into(),
            ]);
        }
        (OutputFormat::Mp4, Some(audio)) => {
            args.extend([
                "-ss".into(),
                start.clone(),
                "-i".into(),
                source.primary.clone(),
                "-ss".into(),
                start,
                "-i".into(),
                audio.clone(),
                "-t".into(),
                duration,
                "-map".into(),
                "0:v:0".into(),
                "-map".into(),
                "1:a:0".into(),
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "aac".into(),
                "-avoid_negative_ts".into(),
                "make_zero".into(),
            ]);
        }
        (OutputFormat::Mp4, None) => {
            args.extend([
                "-ss".into(),
                start,
                "-i".into(),
                source.primary.clone(),
                "-t".into(),
                duration,
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "copy".into(),
                "-avoid_negative_ts".into(),
                "make_zero".into(),
            ]);
        }
    }

    args.push(output.to_string_lossy().into_owned());
    args
}

/// Runs the transcoder and reports banded progress
pub struct ClipExecutor {
    process: Arc<dyn ProcessPort>,
    config: EngineConfig,
    sampler: Arc<dyn ProgressSampler>,
}

impl ClipExecutor {
    pub fn new(process: Arc<dyn ProcessPort>, config: EngineConfig) -> Self {
        Self {
            process,
            config,
            sampler: Arc::new(TimeMarkerSampler),
        }
    }

    /// Replace the diagnostic-line sampler
    pub fn with_sampler(mut self, sampler: Arc<dyn ProgressSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Clip `interval` into `output`. `on_progress` receives overall task
    /// percentages inside `band`, already coalesced.
    pub async fn clip(
        &self,
        source: &StreamSource,
        interval: &Interval,
        format: OutputFormat,
        output: &Path,
        band: ProgressBand,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> ClipperResult<()> {
        let invocation = Invocation::new(&self.config.ffmpeg_path)
            .args(build_args(source, interval, format, output));
        debug!(
            interval = %interval.label(),
            audio = source.audio.is_some(),
            "Running clip: {}",
            invocation.display()
        );

        let mut coalescer = ProgressCoalescer::new(
            band,
            interval.duration().as_secs_f64(),
            self.config.progress_threshold,
        );
        let sampler = Arc::clone(&self.sampler);

        let result = self
            .process
            .run(&invocation, &mut |line: &str| {
                if let Some(percent) = sampler.sample(line).and_then(|t| coalescer.offer(t)) {
                    on_progress(percent);
                }
            })
            .await?;

        if result.success() {
            return Ok(());
        }

        let diagnostics = truncate_chars(result.stderr.trim(), LOG_DIAGNOSTIC_CHARS).into_owned();
        error!(code = ?result.code, "FFmpeg clip failed: {}", diagnostics);
        Err(ClipperError::EngineFailure {
            stage: "FFmpeg clip".to_string(),
            code: result.code,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::IntervalPolicy;
    use std::path::PathBuf;

    fn interval() -> Interval {
        Interval::parse("00:01:00", "00:02:30", &IntervalPolicy::default()).unwrap()
    }

    fn source(audio: bool) -> StreamSource {
        StreamSource {
            primary: "V".to_string(),
            audio: audio.then(|| "A".to_string()),
        }
    }

    #[test]
    fn test_video_with_audio_args() {
        let args = build_args(&source(true), &interval(), OutputFormat::Mp4, &PathBuf::from("out.mp4"));
        assert_eq!(
            args.join(" "),
            "-hide_banner -y -ss 00:01:00.000 -i V -ss 00:01:00.000 -i A -t 90.000 \
             -map 0:v:0 -map 1:a:0 -c:v copy -c:a aac -avoid_negative_ts make_zero out.mp4"
        );
    }

    #[test]
    fn test_video_without_audio_args() {
        let args = build_args(&source(false), &interval(), OutputFormat::Mp4, &PathBuf::from("out.mp4"));
        assert_eq!(
            args.join(" "),
            "-hide_banner -y -ss 00:01:00.000 -i V -t 90.000 \
             -c:v copy -c:a copy -avoid_negative_ts make_zero out.mp4"
        );
        assert!(!args.contains(&"-map".to_string()));
    }

    #[test]
    fn test_audio_only_args() {
        let args = build_args(&source(false), &interval(), OutputFormat::Mp3, &PathBuf::from("out.mp3"));
        assert_eq!(
            args.join(" "),
            "-hide_banner -y -ss 00:01:00.000 -i V -t 90.000 -vn -c:a libmp3lame -q:a 2 out.mp3"
        );
    }

    #[test]
    fn test_duration_matches_interval_exactly() {
        let interval = Interval::parse("00:00:10.250", "00:00:20.750", &IntervalPolicy::default()).unwrap();
        let args = build_args(&source(true), &interval, OutputFormat::Mp4, &PathBuf::from("o.mp4"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "10.500");
    }
}
