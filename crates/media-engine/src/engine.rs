//! The transcoding engine seam and its ffmpeg implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use qrsplice_common::config::EngineSettings;
use qrsplice_common::error::{QrspliceError, QrspliceResult};
use qrsplice_common::stage::Stage;

use crate::probe::{parse_probe_json, probe_args, MediaProbe};

/// Captured result of one engine invocation.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub success: bool,
    /// Human-readable exit status, e.g. `exit status: 1`.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    /// Turn a non-zero exit into an `EngineFailure` for `stage`, logging
    /// the engine's diagnostics on the way out.
    pub fn check(self, stage: Stage) -> QrspliceResult<Self> {
        if self.success {
            return Ok(self);
        }
        tracing::error!(
            %stage,
            status = %self.status,
            stderr = %self.stderr.trim(),
            "Engine reported failure"
        );
        Err(QrspliceError::EngineFailure {
            stage,
            status: self.status,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Trait for transcoding engines (ffmpeg, or a test double).
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Binaries this engine needs that cannot be found.
    fn missing_tools(&self) -> Vec<String>;

    /// Inspect the streams of a media file.
    async fn probe(&self, path: &Path) -> QrspliceResult<MediaProbe>;

    /// Run the engine with `args`, waiting for it to exit.
    ///
    /// Only a failure to start the process is an `Err`; a non-zero exit is
    /// reported through `EngineOutput::success`.
    async fn run(&self, args: &[String]) -> QrspliceResult<EngineOutput>;
}

/// Fail with `EnvironmentMissing` if any engine binary is absent.
pub fn ensure_available(engine: &dyn MediaEngine) -> QrspliceResult<()> {
    match engine.missing_tools().into_iter().next() {
        Some(tool) => Err(QrspliceError::environment_missing(tool)),
        None => Ok(()),
    }
}

/// ffmpeg + ffprobe driven as subprocesses.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            ffmpeg: settings.ffmpeg.clone(),
            ffprobe: settings.ffprobe.clone(),
        }
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    async fn capture(&self, program: &Path, args: &[String]) -> QrspliceResult<EngineOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    QrspliceError::environment_missing(program.display().to_string())
                } else {
                    QrspliceError::Io(e)
                }
            })?;

        Ok(EngineOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn missing_tools(&self) -> Vec<String> {
        [&self.ffmpeg, &self.ffprobe]
            .into_iter()
            .filter(|tool| find_executable(tool).is_none())
            .map(|tool| tool.display().to_string())
            .collect()
    }

    async fn probe(&self, path: &Path) -> QrspliceResult<MediaProbe> {
        if !path.exists() {
            return Err(QrspliceError::not_found(path));
        }
        let output = self.capture(&self.ffprobe, &probe_args(path)?).await?;
        if !output.success {
            return Err(QrspliceError::probe(
                path,
                format!("ffprobe {}: {}", output.status, output.stderr.trim()),
            ));
        }
        parse_probe_json(path, &output.stdout)
    }

    async fn run(&self, args: &[String]) -> QrspliceResult<EngineOutput> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut full = vec!["-hide_banner".to_string(), "-nostdin".to_string()];
        full.extend_from_slice(args);

        let start = std::time::Instant::now();
        let output = self.capture(&self.ffmpeg, &full).await?;
        tracing::debug!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            success = output.success,
            "ffmpeg exited"
        );
        Ok(output)
    }
}

/// Locate `tool` the way a shell would: paths with a separator are checked
/// directly, bare names are searched on `PATH`.
pub fn find_executable(tool: &Path) -> Option<PathBuf> {
    if tool.components().count() > 1 {
        return tool.is_file().then(|| tool.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let full = dir.join(tool);
        if full.is_file() {
            return Some(full);
        }
        #[cfg(windows)]
        {
            let exe = full.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

/// Render a path as an engine argument.
pub fn path_arg(path: &Path) -> QrspliceResult<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        QrspliceError::invalid_asset(format!(
            "Path is not valid UTF-8: {}",
            path.to_string_lossy()
        ))
    })
}

/// Fail with `NotFound` for the first path that does not exist.
pub fn require_exists<'a>(paths: impl IntoIterator<Item = &'a Path>) -> QrspliceResult<()> {
    for path in paths {
        if !path.exists() {
            return Err(QrspliceError::not_found(path));
        }
    }
    Ok(())
}
