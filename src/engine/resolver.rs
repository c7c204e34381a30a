//! Stream resolution through the media-fetching engine

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::model::{FormatConstraint, OutputFormat, Quality};
use crate::engine::EngineConfig;
use crate::error::{ClipperError, ClipperResult, LOG_DIAGNOSTIC_CHARS};
use crate::ports::{Invocation, ProcessPort};
use crate::utils::truncate_chars;

/// Track requested from the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    /// Video track capped at a height
    Video(Quality),
    /// Best separate audio track
    Audio,
    /// Audio carrier for audio-only output
    AudioOnly,
}

impl Track {
    pub fn label(&self) -> &'static str {
        match self {
            Track::Video(_) => "video",
            Track::Audio => "audio",
            Track::AudioOnly => "audio",
        }
    }
}

/// Engine format selector for a track
pub fn format_selector(track: Track) -> String {
    match track {
        Track::Video(quality) => {
            let height = quality.height();
            format!(
                "bestvideo[height<={h}][ext=mp4]/bestvideo[height<={h}]/best[height<={h}]",
                h = height
            )
        }
        Track::Audio => "bestaudio[ext=m4a]/bestaudio".to_string(),
        Track::AudioOnly => "bestaudio[ext=m4a]/bestaudio/best".to_string(),
    }
}

/// Short-lived direct media URLs for one source
#[derive(Clone, PartialEq, Eq)]
pub struct StreamSource {
    /// Video track, or the audio carrier for audio-only output
    pub primary: String,
    /// Separate audio track; absent for audio-only output or when unavailable
    pub audio: Option<String>,
}

// URLs are signed and must not end up in logs
impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("primary", &"<redacted>")
            .field("audio", &self.audio.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Preview metadata of a source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: String,
    /// Seconds; 0 when unknown
    pub duration: f64,
    pub duration_formatted: String,
    pub thumbnail: Option<String>,
    pub uploader: String,
    pub view_count: u64,
    pub formats: AvailableFormats,
    /// False when the lookup failed and placeholders were filled in
    pub resolved: bool,
}

/// Output choices offered for any source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableFormats {
    pub video: Vec<String>,
    pub audio: Vec<String>,
}

impl Default for AvailableFormats {
    fn default() -> Self {
        Self {
            video: Quality::ALL.iter().map(|q| q.height().to_string()).collect(),
            audio: vec![OutputFormat::Mp3.extension().to_string()],
        }
    }
}

/// Fields of the engine's JSON dump that the preview uses
#[derive(Debug, Default, Deserialize)]
struct InfoDump {
    title: Option<String>,
    duration: Option<f64>,
    duration_string: Option<String>,
    thumbnail: Option<String>,
    uploader: Option<String>,
    view_count: Option<u64>,
}

impl VideoInfo {
    fn from_dump(id: Option<String>, dump: InfoDump) -> Self {
        let text = |value: Option<String>, fallback: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            thumbnail: dump
                .thumbnail
                .filter(|t| !t.is_empty())
                .or_else(|| id.as_deref().map(thumbnail_url)),
            id,
            title: text(dump.title, "Unknown Title"),
            duration: dump.duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(0.0),
            duration_formatted: text(dump.duration_string, "00:00"),
            uploader: text(dump.uploader, "Unknown"),
            view_count: dump.view_count.unwrap_or(0),
            formats: AvailableFormats::default(),
            resolved: true,
        }
    }

    /// Placeholder preview when the engine could not describe the source
    pub fn placeholder(id: Option<String>) -> Self {
        Self {
            thumbnail: id.as_deref().map(thumbnail_url),
            id,
            title: "YouTube video".to_string(),
            duration: 0.0,
            duration_formatted: "??:??".to_string(),
            uploader: "Unknown".to_string(),
            view_count: 0,
            formats: AvailableFormats::default(),
            resolved: false,
        }
    }
}

fn thumbnail_url(id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)
}

/// 11-character video id of a watch, short, shorts or embed link
pub fn youtube_video_id(source_ref: &str) -> Option<String> {
    const MARKERS: [&str; 4] = [
        "youtube.com/watch?v=",
        "youtu.be/",
        "youtube.com/shorts/",
        "youtube.com/embed/",
    ];

    MARKERS.iter().find_map(|marker| {
        let start = source_ref.find(marker)? + marker.len();
        let id: String = source_ref[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .take(11)
            .collect();
        (id.len() == 11).then_some(id)
    })
}

/// Resolves sources to direct URLs; one engine call per track
pub struct StreamResolver {
    process: Arc<dyn ProcessPort>,
    config: EngineConfig,
}

impl StreamResolver {
    pub fn new(process: Arc<dyn ProcessPort>, config: EngineConfig) -> Self {
        Self { process, config }
    }

    fn base_invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(&self.config.ytdlp_path);
        if let Some(cookies) = &self.config.cookies_file {
            invocation = invocation.arg("--cookies").arg(cookies.to_string_lossy());
        }
        invocation
    }

    fn invocation(&self, source_ref: &str, track: Track) -> Invocation {
        self.base_invocation()
            .arg("-f")
            .arg(format_selector(track))
            .arg("-g")
            .arg(source_ref)
            .with_timeout(self.config.resolve_timeout)
    }

    async fn resolve_track(&self, source_ref: &str, track: Track) -> ClipperResult<String> {
        let output = self
            .process
            .run(&self.invocation(source_ref, track), &mut |_: &str| {})
            .await?;

        let url = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);

        match url {
            Some(url) if output.success() => {
                debug!(track = track.label(), "Resolved stream URL");
                Ok(url)
            }
            _ => {
                let detail = output.stderr.trim();
                warn!(
                    track = track.label(),
                    code = ?output.code,
                    "Resolution failed: {}",
                    truncate_chars(detail, LOG_DIAGNOSTIC_CHARS)
                );
                Err(ClipperError::Resolution {
                    track: track.label().to_string(),
                    detail: detail.to_string(),
                })
            }
        }
    }

    /// Required track: video, or the audio carrier when the output is audio-only
    pub async fn resolve_primary(
        &self,
        source_ref: &str,
        constraint: &FormatConstraint,
    ) -> ClipperResult<String> {
        let track = if constraint.format.is_audio_only() {
            Track::AudioOnly
        } else {
            Track::Video(constraint.quality)
        };
        self.resolve_track(source_ref, track).await
    }

    /// Optional separate audio track; failure degrades to video-only
    pub async fn resolve_audio(&self, source_ref: &str) -> Option<String> {
        match self.resolve_track(source_ref, Track::Audio).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("No separate audio track, continuing video-only: {}", e);
                None
            }
        }
    }

    /// Describe a source for preview. Never fails: when the engine cannot
    /// describe it, placeholder values are returned with `resolved: false`.
    pub async fn info(&self, source_ref: &str) -> VideoInfo {
        let id = youtube_video_id(source_ref);
        let invocation = self
            .base_invocation()
            .args(["--dump-json", "--no-download"])
            .arg(source_ref)
            .with_timeout(self.config.resolve_timeout);

        let dump = match self.process.run(&invocation, &mut |_: &str| {}).await {
            Ok(output) if output.success() => {
                let json = output.stdout.lines().map(str::trim).find(|line| !line.is_empty());
                match json.map(serde_json::from_str::<InfoDump>) {
                    Some(Ok(dump)) => Ok(dump),
                    Some(Err(e)) => Err(format!("unreadable metadata: {}", e)),
                    None => Err("no metadata printed".to_string()),
                }
            }
            Ok(output) => Err(format!(
                "exit code {:?}: {}",
                output.code,
                truncate_chars(output.stderr.trim(), LOG_DIAGNOSTIC_CHARS)
            )),
            Err(e) => Err(e.to_string()),
        };

        match dump {
            Ok(dump) => {
                debug!(id = ?id, "Fetched video info");
                VideoInfo::from_dump(id, dump)
            }
            Err(reason) => {
                warn!(id = ?id, "Video info lookup failed, using placeholders: {}", reason);
                VideoInfo::placeholder(id)
            }
        }
    }

    /// Resolve every track the constraint needs
    pub async fn resolve(
        &self,
        source_ref: &str,
        constraint: &FormatConstraint,
    ) -> ClipperResult<StreamSource> {
        let primary = self.resolve_primary(source_ref, constraint).await?;
        let audio = if constraint.format.is_audio_only() {
            None
        } else {
            self.resolve_audio(source_ref).await
        };
        Ok(StreamSource { primary, audio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selectors() {
        assert_eq!(
            format_selector(Track::Video(Quality::P720)),
            "bestvideo[height<=720][ext=mp4]/bestvideo[height<=720]/best[height<=720]"
        );
        assert_eq!(format_selector(Track::Audio), "bestaudio[ext=m4a]/bestaudio");
        assert_eq!(
            format_selector(Track::AudioOnly),
            "bestaudio[ext=m4a]/bestaudio/best"
        );
    }

    #[test]
    fn test_stream_source_debug_hides_urls() {
        let source = StreamSource {
            primary: "https://cdn.example/video?sig=secret".to_string(),
            audio: Some("https://cdn.example/audio?sig=secret".to_string()),
        };
        let printed = format!("{:?}", source);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_youtube_video_id() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            youtube_video_id("https://youtube.com/shorts/abc_DEF-123").as_deref(),
            Some("abc_DEF-123")
        );
        assert_eq!(youtube_video_id("https://youtu.be/short"), None);
        assert_eq!(youtube_video_id("https://vimeo.com/123456789"), None);
    }

    #[test]
    fn test_info_dump_fills_missing_fields() {
        let dump: InfoDump = serde_json::from_str(r#"{"title":"","duration":12.5,"view_count":7}"#).unwrap();
        let info = VideoInfo::from_dump(Some("dQw4w9WgXcQ".to_string()), dump);

        assert!(info.resolved);
        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.duration, 12.5);
        assert_eq!(info.duration_formatted, "00:00");
        assert_eq!(info.uploader, "Unknown");
        assert_eq!(info.view_count, 7);
        assert_eq!(
            info.thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
        assert_eq!(info.formats.video, vec!["360", "720", "1080"]);
        assert_eq!(info.formats.audio, vec!["mp3"]);
    }

    #[test]
    fn test_invocation_shape() {
        let config = EngineConfig {
            cookies_file: Some("jar.txt".into()),
            ..EngineConfig::default()
        };
        let resolver = StreamResolver::new(
            Arc::new(crate::adapters::TokioProcessAdapter::new()),
            config,
        );
        let invocation = resolver.invocation("https://youtu.be/abc", Track::Audio);
        assert_eq!(invocation.program, "yt-dlp");
        assert_eq!(
            invocation.args,
            vec![
                "--cookies",
                "jar.txt",
                "-f",
                "bestaudio[ext=m4a]/bestaudio",
                "-g",
                "https://youtu.be/abc"
            ]
        );
        assert!(invocation.timeout.is_some());
    }
}
