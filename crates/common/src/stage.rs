//! Pipeline stage identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed stages a pipeline run walks through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Engine availability and input existence checks.
    Preflight,
    QrCode,
    ImageOverlay,
    AudioMix,
    Concatenate,
    /// Optional removal of intermediates after a successful run.
    Cleanup,
}

impl Stage {
    /// Stages in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Preflight,
        Stage::QrCode,
        Stage::ImageOverlay,
        Stage::AudioMix,
        Stage::Concatenate,
        Stage::Cleanup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::QrCode => "qr code",
            Stage::ImageOverlay => "image overlay",
            Stage::AudioMix => "audio mix",
            Stage::Concatenate => "concatenation",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
