//! Join videos end to end.

use std::path::PathBuf;

use clap::ValueEnum;
use qrsplice_common::config::CompatibilityPolicy;
use qrsplice_media::{concatenate, ConcatOutcome, ConcatRequest, FfmpegEngine};

/// Command-line spelling of [`CompatibilityPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Probe inputs and refuse to join mismatched ones
    Strict,
    /// Stream-copy without probing
    Unchecked,
    /// Re-encode when the inputs differ
    Transcode,
}

impl From<PolicyArg> for CompatibilityPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => CompatibilityPolicy::Strict,
            PolicyArg::Unchecked => CompatibilityPolicy::Unchecked,
            PolicyArg::Transcode => CompatibilityPolicy::TranscodeOnMismatch,
        }
    }
}

pub async fn run(videos: Vec<PathBuf>, output: PathBuf, policy: PolicyArg) -> anyhow::Result<()> {
    let request = ConcatRequest {
        inputs: videos,
        output,
        policy: policy.into(),
    };

    match concatenate(&FfmpegEngine::default(), &request).await? {
        ConcatOutcome::Joined { output, mode } => {
            println!("Concatenated ({mode:?}): {}", output.display());
        }
        ConcatOutcome::Skipped { inputs } => {
            println!("[WARN] Need at least two videos, got {inputs}; nothing written");
        }
    }
    Ok(())
}
