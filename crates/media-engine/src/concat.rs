//! Concatenation stage: join videos end to end.
//!
//! The default path uses the concat demuxer, which stream-copies every
//! input and therefore needs them to share codec, resolution, frame rate,
//! and time base. Inputs are probed beforehand unless the policy is
//! `Unchecked`; on mismatch the stage either refuses (`Strict`) or re-encodes
//! through the concat filter (`TranscodeOnMismatch`).

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use qrsplice_common::config::CompatibilityPolicy;
use qrsplice_common::error::{QrspliceError, QrspliceResult};

use crate::engine::{ensure_available, path_arg, require_exists, EngineOutput, MediaEngine};
use crate::probe::{MediaProbe, StreamKind};

/// Sample rate and layout every input is normalized to when transcoding.
const TRANSCODE_SAMPLE_RATE: u32 = 48_000;
const TRANSCODE_CHANNEL_LAYOUT: &str = "stereo";

/// How the inputs were joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcatMode {
    StreamCopy,
    Transcode,
}

/// Result of a concatenation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ConcatOutcome {
    Joined { output: PathBuf, mode: ConcatMode },
    /// Fewer than two inputs; nothing was written.
    Skipped { inputs: usize },
}

impl ConcatOutcome {
    pub fn output(&self) -> Option<&Path> {
        match self {
            ConcatOutcome::Joined { output, .. } => Some(output),
            ConcatOutcome::Skipped { .. } => None,
        }
    }
}

/// Inputs, output, and policy for one concatenation.
#[derive(Debug, Clone)]
pub struct ConcatRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub policy: CompatibilityPolicy,
}

/// Quote `path` for a concat list `file` directive.
///
/// Inside single quotes the list parser takes every character literally,
/// backslashes and spaces included. A quote cannot appear inside a quoted
/// run, so each one closes the run, is emitted escaped, and reopens it.
pub fn escape_concat_path(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

/// One `file '...'` line for `path`, made absolute.
pub fn concat_list_line(path: &Path) -> QrspliceResult<String> {
    let absolute = absolute_path(path)?;
    Ok(format!("file {}", escape_concat_path(&path_arg(&absolute)?)))
}

fn absolute_path(path: &Path) -> QrspliceResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// A concat list on disk, removed when dropped.
#[derive(Debug)]
pub struct ConcatList {
    file: NamedTempFile,
}

impl ConcatList {
    /// Write the list for `inputs` into a new temporary file inside `dir`.
    pub fn create(dir: &Path, inputs: &[PathBuf]) -> QrspliceResult<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(".qrsplice-concat-")
            .suffix(".txt")
            .tempfile_in(dir)?;
        for input in inputs {
            writeln!(file, "{}", concat_list_line(input)?)?;
        }
        file.flush()?;
        tracing::debug!(path = %file.path().display(), entries = inputs.len(), "Wrote concat list");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for ConcatList {
    fn drop(&mut self) {
        tracing::debug!(path = %self.file.path().display(), "Removing concat list");
    }
}

/// Arguments for a stream-copy join through the concat demuxer.
pub fn demuxer_args(list: &Path, output: &Path) -> QrspliceResult<Vec<String>> {
    Ok(vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path_arg(list)?,
        "-c".to_string(),
        "copy".to_string(),
        path_arg(output)?,
    ])
}

/// Every property that differs between `reference` and `candidate` in a way
/// that breaks stream-copy concatenation.
pub fn stream_mismatches(reference: &MediaProbe, candidate: &MediaProbe) -> Vec<String> {
    let name = candidate.path.display();
    let mut mismatches = Vec::new();

    let mut compare = |what: &str, a: Option<String>, b: Option<String>| {
        if a != b {
            mismatches.push(format!(
                "{name}: {what} {} != {}",
                b.as_deref().unwrap_or("none"),
                a.as_deref().unwrap_or("none")
            ));
        }
    };

    match (
        reference.first(StreamKind::Video),
        candidate.first(StreamKind::Video),
    ) {
        (Some(a), Some(b)) => {
            compare("video codec", a.codec_name.clone(), b.codec_name.clone());
            compare(
                "resolution",
                a.width.zip(a.height).map(|(w, h)| format!("{w}x{h}")),
                b.width.zip(b.height).map(|(w, h)| format!("{w}x{h}")),
            );
            compare("pixel format", a.pix_fmt.clone(), b.pix_fmt.clone());
            compare("frame rate", a.frame_rate.clone(), b.frame_rate.clone());
            compare("video time base", a.time_base.clone(), b.time_base.clone());
        }
        (a, b) => compare(
            "video stream",
            a.map(|_| "present".to_string()),
            b.map(|_| "present".to_string()),
        ),
    }

    match (
        reference.first(StreamKind::Audio),
        candidate.first(StreamKind::Audio),
    ) {
        (Some(a), Some(b)) => {
            compare("audio codec", a.codec_name.clone(), b.codec_name.clone());
            compare(
                "sample rate",
                a.sample_rate.map(|r| r.to_string()),
                b.sample_rate.map(|r| r.to_string()),
            );
            compare(
                "channels",
                a.channels.map(|c| c.to_string()),
                b.channels.map(|c| c.to_string()),
            );
        }
        (a, b) => compare(
            "audio stream",
            a.map(|_| "present".to_string()),
            b.map(|_| "present".to_string()),
        ),
    }

    mismatches
}

/// Arguments for a re-encoding join through the concat filter.
///
/// Every input is scaled and padded to the first input's resolution and
/// frame rate. Inputs without audio get a silent track of their own length
/// so the filter sees one audio segment per input.
pub fn transcode_args(probes: &[MediaProbe], output: &Path) -> QrspliceResult<Vec<String>> {
    let reference = probes
        .first()
        .ok_or_else(|| QrspliceError::invalid_asset("nothing to concatenate"))?;
    let video = reference
        .first(StreamKind::Video)
        .ok_or_else(|| QrspliceError::probe(&reference.path, "no video stream"))?;
    let (width, height) = video
        .width
        .zip(video.height)
        .ok_or_else(|| QrspliceError::probe(&reference.path, "video stream has no dimensions"))?;
    let fps = video
        .frame_rate
        .clone()
        .filter(|_| video.fps().is_some())
        .unwrap_or_else(|| "30".to_string());

    let mut args = vec!["-y".to_string()];
    for probe in probes {
        args.push("-i".to_string());
        args.push(path_arg(&probe.path)?);
    }

    let mut next_input = probes.len();
    let mut graph = Vec::new();
    let mut segments = String::new();
    for (i, probe) in probes.iter().enumerate() {
        let audio_input = if probe.has_audio() {
            i
        } else {
            let duration = probe
                .duration()
                .ok_or_else(|| QrspliceError::probe(&probe.path, "duration unknown"))?;
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-t".to_string(),
                format!("{duration:.3}"),
                "-i".to_string(),
                format!(
                    "anullsrc=channel_layout={TRANSCODE_CHANNEL_LAYOUT}:sample_rate={TRANSCODE_SAMPLE_RATE}"
                ),
            ]);
            next_input += 1;
            next_input - 1
        };

        graph.push(format!(
            "[{i}:v:0]scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}]"
        ));
        graph.push(format!(
            "[{audio_input}:a:0]aresample={TRANSCODE_SAMPLE_RATE},aformat=channel_layouts={TRANSCODE_CHANNEL_LAYOUT}[a{i}]"
        ));
        segments.push_str(&format!("[v{i}][a{i}]"));
    }
    graph.push(format!(
        "{segments}concat=n={}:v=1:a=1[vout][aout]",
        probes.len()
    ));

    args.extend([
        "-filter_complex".to_string(),
        graph.join(";"),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        path_arg(output)?,
    ]);
    Ok(args)
}

/// Join `request.inputs` in order into `request.output`.
///
/// Fewer than two inputs is not an error: nothing is written and
/// `ConcatOutcome::Skipped` is returned.
pub async fn concatenate(
    engine: &dyn MediaEngine,
    request: &ConcatRequest,
) -> QrspliceResult<ConcatOutcome> {
    if request.inputs.len() < 2 {
        tracing::warn!(
            inputs = request.inputs.len(),
            "Need at least two videos to concatenate, skipping"
        );
        return Ok(ConcatOutcome::Skipped {
            inputs: request.inputs.len(),
        });
    }

    ensure_available(engine)?;
    require_exists(request.inputs.iter().map(PathBuf::as_path))?;

    let (mode, probes) = match request.policy {
        CompatibilityPolicy::Unchecked => (ConcatMode::StreamCopy, Vec::new()),
        policy => {
            let mut probes = Vec::with_capacity(request.inputs.len());
            for input in &request.inputs {
                probes.push(engine.probe(input).await?);
            }
            let mismatches: Vec<String> = probes[1..]
                .iter()
                .flat_map(|candidate| stream_mismatches(&probes[0], candidate))
                .collect();

            if mismatches.is_empty() {
                (ConcatMode::StreamCopy, probes)
            } else if policy == CompatibilityPolicy::TranscodeOnMismatch {
                tracing::warn!(
                    mismatches = %mismatches.join("; "),
                    "Inputs differ, falling back to re-encoding"
                );
                (ConcatMode::Transcode, probes)
            } else {
                return Err(QrspliceError::IncompatibleInputs { mismatches });
            }
        }
    };

    if let Some(parent) = request.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!(
        inputs = ?request.inputs,
        output = %request.output.display(),
        ?mode,
        "Concatenating videos"
    );

    let output = match mode {
        ConcatMode::StreamCopy => run_demuxer(engine, request).await?,
        ConcatMode::Transcode => {
            engine
                .run(&transcode_args(&probes, &request.output)?)
                .await?
        }
    };

    if !output.success {
        tracing::error!(
            status = %output.status,
            stdout = %output.stdout.trim(),
            stderr = %output.stderr.trim(),
            "Concatenation failed"
        );
        return Err(QrspliceError::ConcatenationFailed {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    tracing::info!(output = %request.output.display(), "Video concatenation complete");
    Ok(ConcatOutcome::Joined {
        output: request.output.clone(),
        mode,
    })
}

async fn run_demuxer(
    engine: &dyn MediaEngine,
    request: &ConcatRequest,
) -> QrspliceResult<EngineOutput> {
    let list_dir = match request.output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let list = ConcatList::create(&list_dir, &request.inputs)?;
    let args = demuxer_args(list.path(), &request.output)?;
    engine.run(&args).await
}
