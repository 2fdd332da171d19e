//! Audio mix stage: lay an external track over a video's sound.
//!
//! The stage probes the video once and commits to one of two strategies
//! before building any engine arguments:
//!
//! - [`MixStrategy::Blend`]: the video has audio, so both tracks are
//!   volume-scaled and combined with `amix`.
//! - [`MixStrategy::Replace`]: the video is silent, so the scaled external
//!   track becomes its only audio.
//!
//! The video stream is always stream-copied.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use qrsplice_common::config::{MixDuration, MixSettings};
use qrsplice_common::error::{QrspliceError, QrspliceResult};
use qrsplice_common::stage::Stage;

use crate::engine::{ensure_available, path_arg, require_exists, MediaEngine};
use crate::probe::MediaProbe;

/// How the output audio is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixStrategy {
    /// Mix the video's own audio with the external track.
    Blend,
    /// Use the external track alone.
    Replace,
}

impl MixStrategy {
    pub fn from_probe(probe: &MediaProbe) -> Self {
        if probe.has_audio() {
            MixStrategy::Blend
        } else {
            MixStrategy::Replace
        }
    }

    /// Filter graph producing `[aout]` from input 0 (video) and 1 (audio).
    pub fn filter_graph(self, gains: &MixGains) -> String {
        match self {
            MixStrategy::Blend => format!(
                "[0:a]volume={gv}[va];[1:a]volume={go}[oa];[va][oa]amix=inputs=2:duration={duration}:dropout_transition={dt}[aout]",
                gv = gains.video,
                go = gains.overlay,
                duration = gains.duration.as_str(),
                dt = gains.dropout_transition_secs,
            ),
            MixStrategy::Replace => format!("[1:a]volume={go}[aout]", go = gains.overlay),
        }
    }
}

/// Volume factors and mixing policy.
#[derive(Debug, Clone, PartialEq)]
pub struct MixGains {
    pub video: f64,
    pub overlay: f64,
    pub dropout_transition_secs: f64,
    pub duration: MixDuration,
}

impl MixGains {
    fn validate(&self) -> QrspliceResult<()> {
        for (name, value) in [
            ("video gain", self.video),
            ("overlay gain", self.overlay),
            ("dropout transition", self.dropout_transition_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(QrspliceError::invalid_asset(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MixGains {
    fn default() -> Self {
        Self::from(&MixSettings::default())
    }
}

impl From<&MixSettings> for MixGains {
    fn from(settings: &MixSettings) -> Self {
        Self {
            video: settings.gain_video,
            overlay: settings.gain_overlay,
            dropout_transition_secs: settings.dropout_transition_secs,
            duration: settings.duration,
        }
    }
}

/// Inputs and settings for one mix run.
#[derive(Debug, Clone)]
pub struct MixRequest {
    pub video_in: PathBuf,
    pub audio_in: PathBuf,
    pub video_out: PathBuf,
    pub gains: MixGains,
    pub audio_codec: String,
}

impl MixRequest {
    pub fn new(video_in: PathBuf, audio_in: PathBuf, video_out: PathBuf, gains: MixGains) -> Self {
        Self {
            video_in,
            audio_in,
            video_out,
            gains,
            audio_codec: "aac".to_string(),
        }
    }

    /// Engine arguments for `strategy`.
    pub fn args(&self, strategy: MixStrategy) -> QrspliceResult<Vec<String>> {
        self.gains.validate()?;
        Ok(vec![
            "-y".to_string(),
            "-i".to_string(),
            path_arg(&self.video_in)?,
            "-i".to_string(),
            path_arg(&self.audio_in)?,
            "-filter_complex".to_string(),
            strategy.filter_graph(&self.gains),
            "-map".to_string(),
            "0:v".to_string(),
            "-map".to_string(),
            "[aout]".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-shortest".to_string(),
            path_arg(&self.video_out)?,
        ])
    }
}

/// Result of a mix run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixOutcome {
    pub output: PathBuf,
    pub strategy: MixStrategy,
}

/// Mix `request.audio_in` into `request.video_in`, writing `request.video_out`.
pub async fn mix_audio(
    engine: &dyn MediaEngine,
    request: &MixRequest,
) -> QrspliceResult<MixOutcome> {
    ensure_available(engine)?;
    require_exists([request.video_in.as_path(), request.audio_in.as_path()])?;
    request.gains.validate()?;

    let probe = engine.probe(&request.video_in).await?;
    let strategy = MixStrategy::from_probe(&probe);
    match strategy {
        MixStrategy::Blend => tracing::info!(
            video = %request.video_in.display(),
            audio = %request.audio_in.display(),
            "Video has an audio stream, mixing with overlay audio"
        ),
        MixStrategy::Replace => tracing::info!(
            video = %request.video_in.display(),
            audio = %request.audio_in.display(),
            "Video has no audio stream, using overlay audio directly"
        ),
    }

    let args = request.args(strategy)?;
    engine.run(&args).await?.check(Stage::AudioMix)?;

    tracing::info!(output = %request.video_out.display(), ?strategy, "Audio mix complete");
    Ok(MixOutcome {
        output: request.video_out.clone(),
        strategy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{StreamInfo, StreamKind};
    use std::path::Path;

    fn stream(index: u32, kind: StreamKind) -> StreamInfo {
        StreamInfo {
            index,
            kind,
            codec_name: None,
            width: None,
            height: None,
            pix_fmt: None,
            frame_rate: None,
            time_base: None,
            sample_rate: None,
            channels: None,
            duration_secs: None,
        }
    }

    fn probe(kinds: &[StreamKind]) -> MediaProbe {
        MediaProbe {
            path: Path::new("v.mp4").to_path_buf(),
            streams: kinds
                .iter()
                .enumerate()
                .map(|(i, k)| stream(i as u32, *k))
                .collect(),
            duration_secs: None,
        }
    }

    fn request() -> MixRequest {
        MixRequest::new(
            "output/intermediate_1_qr.mp4".into(),
            "input/target.m4a".into(),
            "output/intermediate_2_audio.mp4".into(),
            MixGains::default(),
        )
    }

    #[test]
    fn test_strategy_follows_audio_presence() {
        assert_eq!(
            MixStrategy::from_probe(&probe(&[StreamKind::Video, StreamKind::Audio])),
            MixStrategy::Blend
        );
        assert_eq!(
            MixStrategy::from_probe(&probe(&[StreamKind::Video, StreamKind::Data])),
            MixStrategy::Replace
        );
    }

    #[test]
    fn test_blend_graph_scales_both_tracks() {
        let graph = MixStrategy::Blend.filter_graph(&MixGains::default());
        assert_eq!(
            graph,
            "[0:a]volume=1[va];[1:a]volume=0.8[oa];[va][oa]amix=inputs=2:duration=first:dropout_transition=1[aout]"
        );
    }

    #[test]
    fn test_replace_graph_uses_only_overlay_track() {
        let graph = MixStrategy::Replace.filter_graph(&MixGains::default());
        assert_eq!(graph, "[1:a]volume=0.8[aout]");
        assert!(!graph.contains("amix"));
        assert!(!graph.contains("0:a"));
    }

    #[test]
    fn test_args_copy_video_and_stop_at_shortest() {
        let args = request().args(MixStrategy::Blend).unwrap();
        assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-map", "0:v"]));
        assert!(args.windows(2).any(|w| w == ["-map", "[aout]"]));
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_shortest_duration_policy_is_forwarded() {
        let gains = MixGains {
            duration: MixDuration::Shortest,
            ..MixGains::default()
        };
        assert!(MixStrategy::Blend
            .filter_graph(&gains)
            .contains("duration=shortest"));
    }

    #[test]
    fn test_negative_gain_is_invalid() {
        let mut req = request();
        req.gains.overlay = -1.0;
        assert!(matches!(
            req.args(MixStrategy::Replace),
            Err(QrspliceError::InvalidAsset { .. })
        ));
    }
}
