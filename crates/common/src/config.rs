//! Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QrspliceError, QrspliceResult};

/// Everything a pipeline run needs to know, in one place.
///
/// The defaults reproduce the fixed `input/` -> `output/` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the input media.
    pub input_dir: PathBuf,

    /// Directory receiving the QR image, intermediates, and final video.
    pub output_dir: PathBuf,

    /// URL encoded into the QR code.
    pub url: String,

    /// Input filenames, relative to `input_dir`.
    pub inputs: InputFiles,

    /// Output filenames, relative to `output_dir`.
    pub outputs: OutputFiles,

    pub qr: QrSettings,

    pub overlay: OverlaySettings,

    pub mix: MixSettings,

    pub concat: ConcatSettings,

    pub engine: EngineSettings,

    /// Keep the QR image and intermediate videos after a successful run.
    pub keep_intermediates: bool,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    /// Video that receives the QR overlay and the audio mix.
    pub primary_video: PathBuf,

    /// Video appended after the processed primary video.
    pub secondary_video: PathBuf,

    /// Audio track mixed into the primary video.
    pub overlay_audio: PathBuf,

    /// Logo embedded in the QR code. `None` renders a plain code.
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFiles {
    pub qr_image: PathBuf,
    pub overlaid_video: PathBuf,
    pub mixed_video: PathBuf,
    pub final_video: PathBuf,
    pub report: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrSettings {
    /// Pixels per QR module.
    pub scale: u32,

    /// Quiet zone width in modules.
    pub border: u32,
}

impl QrSettings {
    pub const MAX_SCALE: u32 = 64;
    pub const MAX_BORDER: u32 = 32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Horizontal placement expression (engine syntax).
    pub x: String,

    /// Vertical placement expression (engine syntax).
    pub y: String,

    pub video_codec: String,

    /// Constant rate factor handed to the video encoder.
    pub crf: u8,

    pub audio_codec: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    /// Volume factor for the video's own audio (1.0 = unchanged).
    pub gain_video: f64,

    /// Volume factor for the external audio track.
    pub gain_overlay: f64,

    /// Seconds over which amix renormalizes when an input ends.
    pub dropout_transition_secs: f64,

    /// Which input decides when the mixed track ends.
    pub duration: MixDuration,
}

/// amix `duration` policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixDuration {
    /// End with the video's own audio.
    #[default]
    First,
    /// End with whichever track is shorter.
    Shortest,
    /// End with whichever track is longer.
    Longest,
}

impl MixDuration {
    pub fn as_str(self) -> &'static str {
        match self {
            MixDuration::First => "first",
            MixDuration::Shortest => "shortest",
            MixDuration::Longest => "longest",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatSettings {
    pub policy: CompatibilityPolicy,
}

/// How concatenation treats inputs whose streams may not line up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityPolicy {
    /// Stream-copy without looking at the inputs.
    Unchecked,
    /// Probe the inputs and refuse to stream-copy mismatched ones.
    #[default]
    Strict,
    /// Probe the inputs and re-encode through the concat filter on mismatch.
    TranscodeOnMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// ffmpeg binary name or path.
    pub ffmpeg: PathBuf,

    /// ffprobe binary name or path.
    pub ffprobe: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "qrsplice=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            url: "https://google.com".to_string(),
            inputs: InputFiles::default(),
            outputs: OutputFiles::default(),
            qr: QrSettings::default(),
            overlay: OverlaySettings::default(),
            mix: MixSettings::default(),
            concat: ConcatSettings::default(),
            engine: EngineSettings::default(),
            keep_intermediates: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            primary_video: PathBuf::from("ch1.mp4"),
            secondary_video: PathBuf::from("ch2.mp4"),
            overlay_audio: PathBuf::from("target.m4a"),
            logo: Some(PathBuf::from("img.jpg")),
        }
    }
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            qr_image: PathBuf::from("qr_code_with_logo.png"),
            overlaid_video: PathBuf::from("intermediate_1_qr.mp4"),
            mixed_video: PathBuf::from("intermediate_2_audio.mp4"),
            final_video: PathBuf::from("final_output.mp4"),
            report: PathBuf::from("pipeline-report.json"),
        }
    }
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            scale: 10,
            border: 4,
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            x: "main_w-overlay_w-10".to_string(),
            y: "10".to_string(),
            video_codec: "libx264".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
        }
    }
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            gain_video: 1.0,
            gain_overlay: 0.8,
            dropout_transition_secs: 1.0,
            duration: MixDuration::First,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> QrspliceResult<Self> {
        if !path.exists() {
            return Err(QrspliceError::not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            QrspliceError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> QrspliceResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn primary_video_path(&self) -> PathBuf {
        self.input_dir.join(&self.inputs.primary_video)
    }

    pub fn secondary_video_path(&self) -> PathBuf {
        self.input_dir.join(&self.inputs.secondary_video)
    }

    pub fn overlay_audio_path(&self) -> PathBuf {
        self.input_dir.join(&self.inputs.overlay_audio)
    }

    pub fn logo_path(&self) -> Option<PathBuf> {
        self.inputs.logo.as_ref().map(|logo| self.input_dir.join(logo))
    }

    pub fn qr_image_path(&self) -> PathBuf {
        self.output_dir.join(&self.outputs.qr_image)
    }

    pub fn overlaid_video_path(&self) -> PathBuf {
        self.output_dir.join(&self.outputs.overlaid_video)
    }

    pub fn mixed_video_path(&self) -> PathBuf {
        self.output_dir.join(&self.outputs.mixed_video)
    }

    pub fn final_video_path(&self) -> PathBuf {
        self.output_dir.join(&self.outputs.final_video)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.outputs.report)
    }

    /// Inputs that must exist before the pipeline starts.
    pub fn required_inputs(&self) -> Vec<PathBuf> {
        let mut required = vec![
            self.primary_video_path(),
            self.secondary_video_path(),
            self.overlay_audio_path(),
        ];
        required.extend(self.logo_path());
        required
    }

    /// Reject settings that cannot produce a sensible run.
    pub fn validate(&self) -> QrspliceResult<()> {
        if self.url.is_empty() {
            return Err(QrspliceError::config("url must not be empty"));
        }
        if !(1..=QrSettings::MAX_SCALE).contains(&self.qr.scale) {
            return Err(QrspliceError::config(format!(
                "qr.scale must be between 1 and {} (got {})",
                QrSettings::MAX_SCALE,
                self.qr.scale
            )));
        }
        if self.qr.border > QrSettings::MAX_BORDER {
            return Err(QrspliceError::config(format!(
                "qr.border must be at most {} (got {})",
                QrSettings::MAX_BORDER,
                self.qr.border
            )));
        }
        for (name, gain) in [
            ("mix.gain_video", self.mix.gain_video),
            ("mix.gain_overlay", self.mix.gain_overlay),
            (
                "mix.dropout_transition_secs",
                self.mix.dropout_transition_secs,
            ),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(QrspliceError::config(format!(
                    "{name} must be a finite, non-negative number (got {gain})"
                )));
            }
        }
        if self.overlay.x.trim().is_empty() || self.overlay.y.trim().is_empty() {
            return Err(QrspliceError::config(
                "overlay.x and overlay.y must not be empty",
            ));
        }

        // Every stage writes to a path distinct from anything it reads.
        let stages = [
            (
                "qr image",
                self.qr_image_path(),
                self.logo_path().into_iter().collect::<Vec<_>>(),
            ),
            (
                "overlaid video",
                self.overlaid_video_path(),
                vec![self.primary_video_path(), self.qr_image_path()],
            ),
            (
                "mixed video",
                self.mixed_video_path(),
                vec![self.overlaid_video_path(), self.overlay_audio_path()],
            ),
            (
                "final video",
                self.final_video_path(),
                vec![self.mixed_video_path(), self.secondary_video_path()],
            ),
        ];
        for (name, output, inputs) in &stages {
            if let Some(clash) = inputs.iter().find(|input| same_path(input, output)) {
                return Err(QrspliceError::config(format!(
                    "{name} output {} would overwrite its own input {}",
                    output.display(),
                    clash.display()
                )));
            }
        }

        Ok(())
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
