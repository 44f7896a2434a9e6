//! Tail replacement for video clips: the last `tail_seconds` of a base clip are
//! cut and an overlay clip is appended in their place. Encoding is delegated to
//! the `ffmpeg`/`ffprobe` executables through [`FfmpegCli`].
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub trait OverlayRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `render` can run at all. Checked once before a batch starts.
    fn available(&self) -> bool;

    /// Writes `base[0, cut)` followed by `overlay` to `output` as H.264/AAC,
    /// where `cut = max(0, duration(base) - tail_seconds)`. The overlay is
    /// scaled to the base frame size when they differ.
    fn render(&self, base: &Path, overlay: &Path, tail_seconds: u32, output: &Path) -> Result<()>;
}

pub fn ensure_available(renderer: &dyn OverlayRenderer) -> Result<()> {
    if renderer.available() {
        Ok(())
    } else {
        Err(Error::Unavailable(format!(
            "video renderer '{}' is not installed or not runnable",
            renderer.name()
        )))
    }
}

/// Point in seconds where the base clip is cut.
pub fn cut_point(duration: f64, tail_seconds: u32) -> f64 {
    (duration - f64::from(tail_seconds)).max(0.0)
}

/// `<stem>__rendered__<YYYY-MM-DD>.mp4`
pub fn rendered_name(stem: &str, date: NaiveDate) -> String {
    format!("{stem}__rendered__{}.mp4", date.format("%Y-%m-%d"))
}

/// Stream facts needed to build the concat graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub has_audio: bool,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parses `ffprobe -of json -show_streams -show_format` output.
pub fn parse_probe(json: &str) -> Result<ClipInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| Error::External(format!("unreadable ffprobe output: {e}")))?;
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::Processing("clip has no video stream".to_string()))?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(Error::Processing("video stream has no frame size".to_string())),
    };
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| Error::Processing("clip duration is unknown".to_string()))?;
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    Ok(ClipInfo {
        width,
        height,
        duration,
        has_audio,
    })
}

/// `filter_complex` graph and output labels for one render.
///
/// Audio is carried only when both clips have it. A cut of zero drops the base
/// entirely and emits the (scaled) overlay alone.
pub fn build_filter_graph(base: &ClipInfo, overlay: &ClipInfo, cut: f64) -> (String, bool) {
    let with_audio = base.has_audio && overlay.has_audio;
    let scale = if (overlay.width, overlay.height) != (base.width, base.height) {
        format!("scale={}:{},", base.width, base.height)
    } else {
        String::new()
    };
    let overlay_v = format!("[1:v]{scale}setsar=1");

    if cut <= 0.0 {
        let mut graph = format!("{overlay_v}[v]");
        if with_audio {
            graph.push_str(";[1:a]anull[a]");
        }
        return (graph, with_audio);
    }

    let mut graph = format!(
        "[0:v]trim=end={cut:.3},setpts=PTS-STARTPTS,setsar=1[v0];{overlay_v},setpts=PTS-STARTPTS[v1];"
    );
    if with_audio {
        graph.push_str(&format!(
            "[0:a]atrim=end={cut:.3},asetpts=PTS-STARTPTS[a0];[1:a]asetpts=PTS-STARTPTS[a1];\
             [v0][a0][v1][a1]concat=n=2:v=1:a=1[v][a]"
        ));
    } else {
        graph.push_str("[v0][v1]concat=n=2:v=1:a=0[v]");
    }
    (graph, with_audio)
}

/// Drives `ffprobe` and `ffmpeg` from `PATH` (or explicit locations).
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegCli {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn runnable(program: &Path) -> bool {
        Command::new(program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn probe(&self, clip: &Path) -> Result<ClipInfo> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
            .arg(clip)
            .output()
            .map_err(|e| Error::External(format!("ffprobe exec error: {e}")))?;
        if !output.status.success() {
            return Err(Error::External(format!(
                "ffprobe failed on {}: {}",
                clip.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let info = parse_probe(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Probed {:?}: {:?}", clip, info);
        Ok(info)
    }
}

impl OverlayRenderer for FfmpegCli {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn available(&self) -> bool {
        let ok = Self::runnable(&self.ffmpeg) && Self::runnable(&self.ffprobe);
        if !ok {
            warn!("ffmpeg/ffprobe not runnable ({:?}, {:?})", self.ffmpeg, self.ffprobe);
        }
        ok
    }

    fn render(&self, base: &Path, overlay: &Path, tail_seconds: u32, output: &Path) -> Result<()> {
        let base_info = self.probe(base)?;
        let overlay_info = self.probe(overlay)?;
        let cut = cut_point(base_info.duration, tail_seconds);
        let (graph, with_audio) = build_filter_graph(&base_info, &overlay_info, cut);
        debug!("filter_complex for {:?}: {}", base, graph);

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-v", "error", "-i"])
            .arg(base)
            .arg("-i")
            .arg(overlay)
            .args(["-filter_complex", graph.as_str(), "-map", "[v]"]);
        if with_audio {
            cmd.args(["-map", "[a]", "-c:a", "aac"]);
        }
        cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]).arg(output);

        let result = cmd
            .stdout(Stdio::null())
            .output()
            .map_err(|e| Error::External(format!("ffmpeg exec error: {e}")))?;
        if !result.status.success() {
            let _ = std::fs::remove_file(output);
            return Err(Error::External(format!(
                "ffmpeg failed on {}: {}",
                base.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        info!(
            "Rendered {:?} (cut at {:.3}s of {:.3}s) -> {:?}",
            base, cut, base_info.duration, output
        );
        Ok(())
    }
}
