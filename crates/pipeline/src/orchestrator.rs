//! The fixed QR -> overlay -> mix -> concat sequence.

use std::path::PathBuf;
use std::sync::Arc;

use qrsplice_common::config::PipelineConfig;
use qrsplice_common::error::{QrspliceError, QrspliceResult};
use qrsplice_common::stage::Stage;
use qrsplice_media::{
    concatenate, ensure_available, mix_audio, overlay_image, ConcatRequest, FfmpegEngine,
    MediaEngine, MixGains, MixRequest, OverlayRequest,
};
use qrsplice_qr::QrOptions;

use crate::report::PipelineReport;

/// Callback invoked as each stage starts and ends.
pub type StageCallback = Box<dyn Fn(StageEvent) + Send + Sync>;

/// A stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Started,
    Finished,
    Skipped,
    Failed,
}

/// One configured pipeline run.
///
/// Stages run strictly in order and the first failure aborts the rest.
/// Intermediate outputs from completed stages stay on disk for inspection.
pub struct Pipeline {
    config: PipelineConfig,
    engine: Arc<dyn MediaEngine>,
    on_stage: Option<StageCallback>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            config,
            engine,
            on_stage: None,
        }
    }

    /// A pipeline driving the ffmpeg binaries named in `config.engine`.
    pub fn with_ffmpeg(config: PipelineConfig) -> Self {
        let engine = Arc::new(FfmpegEngine::new(&config.engine));
        Self::new(config, engine)
    }

    /// Report stage transitions to `callback`.
    pub fn on_stage(mut self, callback: StageCallback) -> Self {
        self.on_stage = Some(callback);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and return a summary of what was produced.
    pub async fn run(&self) -> QrspliceResult<PipelineReport> {
        let started_at = chrono::Utc::now();
        let config = &self.config;
        let engine = self.engine.as_ref();

        self.emit(Stage::Preflight, StageStatus::Started);
        let preflight = self.preflight();
        self.finish(Stage::Preflight, preflight)?;

        let qr_path = config.qr_image_path();
        let overlaid_path = config.overlaid_video_path();
        let mixed_path = config.mixed_video_path();
        let final_path = config.final_video_path();

        self.emit(Stage::QrCode, StageStatus::Started);
        let logo = config.logo_path();
        let qr = qrsplice_qr::generate(
            &config.url,
            &qr_path,
            logo.as_deref(),
            &QrOptions {
                scale: config.qr.scale,
                border: config.qr.border,
            },
        );
        let qr = self.finish(Stage::QrCode, qr)?;

        self.emit(Stage::ImageOverlay, StageStatus::Started);
        let overlay = OverlayRequest::from_settings(
            config.primary_video_path(),
            qr_path.clone(),
            overlaid_path.clone(),
            &config.overlay,
        );
        let overlaid = overlay_image(engine, &overlay).await;
        let overlaid = self.finish(Stage::ImageOverlay, overlaid)?;

        self.emit(Stage::AudioMix, StageStatus::Started);
        let mut mix = MixRequest::new(
            overlaid.clone(),
            config.overlay_audio_path(),
            mixed_path.clone(),
            MixGains::from(&config.mix),
        );
        mix.audio_codec = config.overlay.audio_codec.clone();
        let mixed = mix_audio(engine, &mix).await;
        let mixed = self.finish(Stage::AudioMix, mixed)?;

        self.emit(Stage::Concatenate, StageStatus::Started);
        let concat = ConcatRequest {
            inputs: vec![mixed.output.clone(), config.secondary_video_path()],
            output: final_path,
            policy: config.concat.policy,
        };
        let joined = concatenate(engine, &concat).await;
        let joined = self.finish(Stage::Concatenate, joined)?;

        let removed = if config.keep_intermediates {
            self.emit(Stage::Cleanup, StageStatus::Skipped);
            Vec::new()
        } else {
            self.emit(Stage::Cleanup, StageStatus::Started);
            let removed = remove_intermediates(&[qr_path, overlaid_path, mixed_path]);
            self.finish(Stage::Cleanup, removed)?
        };

        let report = PipelineReport {
            started_at,
            finished_at: chrono::Utc::now(),
            url: config.url.clone(),
            final_output: joined.output().map(PathBuf::from),
            qr,
            overlaid_video: overlaid,
            mix: mixed,
            concat: joined,
            removed_intermediates: removed,
        };
        report.write(&config.report_path())?;

        tracing::info!(
            final_output = ?report.final_output,
            elapsed_secs = (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0,
            "Processing complete"
        );
        Ok(report)
    }

    /// Engine present, inputs present, output directory in place.
    fn preflight(&self) -> QrspliceResult<()> {
        self.config.validate()?;
        ensure_available(self.engine.as_ref())?;
        tracing::info!(engine = self.engine.name(), "Transcoding engine available");

        for path in self.config.required_inputs() {
            if !path.exists() {
                return Err(QrspliceError::not_found(path));
            }
        }

        std::fs::create_dir_all(&self.config.output_dir)?;
        let shown = std::fs::canonicalize(&self.config.output_dir)
            .unwrap_or_else(|_| self.config.output_dir.clone());
        tracing::info!(output_dir = %shown.display(), "Output directory ready");
        Ok(())
    }

    fn emit(&self, stage: Stage, status: StageStatus) {
        match status {
            StageStatus::Started => tracing::info!(%stage, "Stage started"),
            StageStatus::Skipped => tracing::debug!(%stage, "Stage skipped"),
            _ => {}
        }
        if let Some(cb) = &self.on_stage {
            cb(StageEvent { stage, status });
        }
    }

    fn finish<T>(&self, stage: Stage, result: QrspliceResult<T>) -> QrspliceResult<T> {
        match &result {
            Ok(_) => self.emit(stage, StageStatus::Finished),
            Err(err) => {
                tracing::error!(%stage, error = %err, "Stage failed, aborting pipeline");
                self.emit(stage, StageStatus::Failed);
            }
        }
        result
    }
}

fn remove_intermediates(paths: &[PathBuf]) -> QrspliceResult<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Removed intermediate");
                removed.push(path.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_intermediates_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.mp4");
        std::fs::write(&present, b"x").unwrap();
        let missing = dir.path().join("b.mp4");

        let removed = remove_intermediates(&[present.clone(), missing]).unwrap();
        assert_eq!(removed, vec![present.clone()]);
        assert!(!present.exists());
    }
}
