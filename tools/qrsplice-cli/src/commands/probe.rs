//! Show stream information for a media file.

use std::path::PathBuf;

use qrsplice_media::{FfmpegEngine, MediaEngine, StreamKind};

pub async fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let probe = FfmpegEngine::default().probe(&path).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&probe)?);
        return Ok(());
    }

    println!("Media: {}", probe.path.display());
    match probe.duration() {
        Some(secs) => println!("  Duration: {secs:.3}s"),
        None => println!("  Duration: unknown"),
    }
    println!("  Streams:  {}", probe.streams.len());
    for s in &probe.streams {
        let codec = s.codec_name.as_deref().unwrap_or("?");
        match s.kind {
            StreamKind::Video => println!(
                "    #{} video {codec} {}x{} {} fps={}",
                s.index,
                s.width.unwrap_or(0),
                s.height.unwrap_or(0),
                s.pix_fmt.as_deref().unwrap_or("?"),
                s.frame_rate.as_deref().unwrap_or("?"),
            ),
            StreamKind::Audio => println!(
                "    #{} audio {codec} {} Hz, {} ch",
                s.index,
                s.sample_rate.unwrap_or(0),
                s.channels.unwrap_or(0),
            ),
            other => println!("    #{} {other:?} {codec}", s.index),
        }
    }
    if !probe.has_audio() {
        println!("  [WARN] No audio stream");
    }
    Ok(())
}
