//! Per-run summary written beside the outputs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use qrsplice_common::error::QrspliceResult;
use qrsplice_media::{ConcatOutcome, MixOutcome};
use qrsplice_qr::QrArtifact;

/// What a successful pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub url: String,
    pub qr: QrArtifact,
    pub overlaid_video: PathBuf,
    pub mix: MixOutcome,
    pub concat: ConcatOutcome,
    pub final_output: Option<PathBuf>,
    /// Intermediates deleted because `keep_intermediates` was off.
    pub removed_intermediates: Vec<PathBuf>,
}

impl PipelineReport {
    pub fn write(&self, path: &Path) -> QrspliceResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::info!(report = %path.display(), "Wrote pipeline report");
        Ok(())
    }
}
