//! Shared fixtures: a scripted engine and a populated input directory.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use qrsplice_common::config::PipelineConfig;
use qrsplice_common::error::QrspliceResult;
use qrsplice_media::{EngineOutput, MediaEngine, MediaProbe, StreamInfo, StreamKind};

/// One recorded `run` call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Vec<String>,
    /// Contents of the concat list, captured while it still existed.
    pub concat_list: Option<String>,
}

/// Engine double that records invocations and writes placeholder outputs.
#[derive(Default)]
pub struct RecordingEngine {
    pub invocations: Mutex<Vec<Invocation>>,
    pub probed: Mutex<Vec<PathBuf>>,
    pub missing: Vec<String>,
    /// File names (not paths) that probe as having no audio stream.
    pub silent: HashSet<String>,
    /// File names that probe with a different resolution.
    pub odd_resolution: HashSet<String>,
    /// Fail the n-th `run` call (0-based).
    pub fail_on_run: Option<usize>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

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
        duration_secs: Some(5.0),
    }
}

#[async_trait]
impl MediaEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn missing_tools(&self) -> Vec<String> {
        self.missing.clone()
    }

    async fn probe(&self, path: &Path) -> QrspliceResult<MediaProbe> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        let name = Self::file_name(path);

        let width = if self.odd_resolution.contains(&name) { 640 } else { 1280 };
        let mut video = stream(0, StreamKind::Video);
        video.codec_name = Some("h264".to_string());
        video.width = Some(width);
        video.height = Some(720);
        video.pix_fmt = Some("yuv420p".to_string());
        video.frame_rate = Some("30/1".to_string());
        video.time_base = Some("1/15360".to_string());

        let mut streams = vec![video];
        if !self.silent.contains(&name) {
            let mut audio = stream(1, StreamKind::Audio);
            audio.codec_name = Some("aac".to_string());
            audio.sample_rate = Some(48_000);
            audio.channels = Some(2);
            streams.push(audio);
        }

        Ok(MediaProbe {
            path: path.to_path_buf(),
            streams,
            duration_secs: Some(5.0),
        })
    }

    async fn run(&self, args: &[String]) -> QrspliceResult<EngineOutput> {
        let index = self.invocations.lock().unwrap().len();

        let concat_list = args
            .windows(2)
            .any(|w| w[0] == "-f" && w[1] == "concat")
            .then(|| {
                args.windows(2)
                    .find(|w| w[0] == "-i")
                    .and_then(|w| std::fs::read_to_string(&w[1]).ok())
            })
            .flatten();

        self.invocations.lock().unwrap().push(Invocation {
            args: args.to_vec(),
            concat_list,
        });

        if self.fail_on_run == Some(index) {
            return Ok(EngineOutput {
                success: false,
                status: "exit status: 1".to_string(),
                stdout: String::new(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }

        if let Some(out) = args.last() {
            std::fs::write(out, b"not really a video")?;
        }

        Ok(EngineOutput {
            success: true,
            status: "exit status: 0".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// A config rooted in `root` with every input file present.
pub fn fixture(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig {
        input_dir: root.join("input"),
        output_dir: root.join("output"),
        url: "https://example.com/promo".to_string(),
        ..PipelineConfig::default()
    };
    config.inputs.logo = Some(PathBuf::from("logo.png"));

    std::fs::create_dir_all(&config.input_dir).unwrap();
    for path in [
        config.primary_video_path(),
        config.secondary_video_path(),
        config.overlay_audio_path(),
    ] {
        std::fs::write(path, b"placeholder").unwrap();
    }

    let logo = image::RgbaImage::from_pixel(60, 40, image::Rgba([200, 30, 30, 255]));
    logo.save(config.logo_path().unwrap()).unwrap();

    config
}
