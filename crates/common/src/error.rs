//! Error types shared across qrsplice crates.

use std::path::PathBuf;

use crate::stage::Stage;

/// Top-level error type for qrsplice operations.
#[derive(Debug, thiserror::Error)]
pub enum QrspliceError {
    #[error("Required tool not found: {tool} (install it and make sure it is on PATH)")]
    EnvironmentMissing { tool: String },

    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid asset: {message}")]
    InvalidAsset { message: String },

    #[error("{stage} failed (status {status}): {stderr}")]
    EngineFailure {
        stage: Stage,
        status: String,
        stderr: String,
    },

    #[error("Concatenation failed (status {status})\nSTDOUT: {stdout}\nSTDERR: {stderr}")]
    ConcatenationFailed {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Inputs cannot be stream-copied together: {}", mismatches.join("; "))]
    IncompatibleInputs { mismatches: Vec<String> },

    #[error("Probe of {} failed: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using QrspliceError.
pub type QrspliceResult<T> = Result<T, QrspliceError>;

impl QrspliceError {
    pub fn environment_missing(tool: impl Into<String>) -> Self {
        Self::EnvironmentMissing { tool: tool.into() }
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn invalid_asset(msg: impl Into<String>) -> Self {
        Self::InvalidAsset {
            message: msg.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the failure came from the external engine process itself.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            Self::EngineFailure { .. } | Self::ConcatenationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mentions_path() {
        let err = QrspliceError::not_found("input/ch1.mp4");
        assert_eq!(err.to_string(), "File not found: input/ch1.mp4");
    }

    #[test]
    fn test_engine_failure_carries_stage_and_stderr() {
        let err = QrspliceError::EngineFailure {
            stage: Stage::AudioMix,
            status: "exit status: 1".to_string(),
            stderr: "Invalid data found when processing input".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("audio mix failed"));
        assert!(msg.contains("Invalid data found"));
        assert!(err.is_engine_failure());
    }

    #[test]
    fn test_incompatible_inputs_lists_every_mismatch() {
        let err = QrspliceError::IncompatibleInputs {
            mismatches: vec!["width 1280 != 1920".into(), "codec hevc != h264".into()],
        };
        assert_eq!(
            err.to_string(),
            "Inputs cannot be stream-copied together: width 1280 != 1920; codec hevc != h264"
        );
        assert!(!err.is_engine_failure());
    }
}
