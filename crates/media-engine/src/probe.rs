//! Stream inspection via ffprobe's JSON output.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use qrsplice_common::error::{QrspliceError, QrspliceResult};

use crate::engine::path_arg;

/// Kind of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    #[serde(other)]
    Other,
}

/// One stream of a probed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    pub index: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pix_fmt: Option<String>,
    /// Raw rate as reported, e.g. `30000/1001`.
    pub frame_rate: Option<String>,
    pub time_base: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub duration_secs: Option<f64>,
}

impl StreamInfo {
    /// Frame rate as a float, if reported and non-zero.
    pub fn fps(&self) -> Option<f64> {
        parse_rational(self.frame_rate.as_deref()?)
    }
}

/// Streams and container duration of a media file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaProbe {
    pub path: PathBuf,
    pub streams: Vec<StreamInfo>,
    pub duration_secs: Option<f64>,
}

impl MediaProbe {
    pub fn has_audio(&self) -> bool {
        self.first(StreamKind::Audio).is_some()
    }

    pub fn has_video(&self) -> bool {
        self.first(StreamKind::Video).is_some()
    }

    pub fn first(&self, kind: StreamKind) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == kind)
    }

    /// Container duration, falling back to the longest stream.
    pub fn duration(&self) -> Option<f64> {
        self.duration_secs.or_else(|| {
            self.streams
                .iter()
                .filter_map(|s| s.duration_secs)
                .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))))
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawProbe {
    #[serde(default)]
    streams: Vec<RawStream>,
    format: Option<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    index: u32,
    codec_type: Option<StreamKind>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    r_frame_rate: Option<String>,
    time_base: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    duration: Option<String>,
}

/// Arguments for ffprobe that produce the JSON `parse_probe_json` expects.
pub fn probe_args(path: &Path) -> QrspliceResult<Vec<String>> {
    Ok(vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration:stream=index,codec_type,codec_name,width,height,pix_fmt,r_frame_rate,time_base,sample_rate,channels,duration".to_string(),
        "-of".to_string(),
        "json".to_string(),
        path_arg(path)?,
    ])
}

/// Parse ffprobe `-of json` output for `path`.
pub fn parse_probe_json(path: &Path, json: &str) -> QrspliceResult<MediaProbe> {
    let raw: RawProbe = serde_json::from_str(json)
        .map_err(|e| QrspliceError::probe(path, format!("unreadable ffprobe output: {e}")))?;

    let streams = raw
        .streams
        .into_iter()
        .map(|s| StreamInfo {
            index: s.index,
            kind: s.codec_type.unwrap_or(StreamKind::Other),
            codec_name: s.codec_name,
            width: s.width,
            height: s.height,
            pix_fmt: s.pix_fmt,
            frame_rate: s.r_frame_rate.filter(|r| r != "0/0"),
            time_base: s.time_base,
            sample_rate: s.sample_rate.and_then(|r| r.parse().ok()),
            channels: s.channels,
            duration_secs: s.duration.as_deref().and_then(parse_seconds),
        })
        .collect();

    Ok(MediaProbe {
        path: path.to_path_buf(),
        streams,
        duration_secs: raw
            .format
            .and_then(|f| f.duration)
            .as_deref()
            .and_then(parse_seconds),
    })
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if den == 0.0 || num == 0.0 {
        return None;
    }
    Some(num / den)
}
