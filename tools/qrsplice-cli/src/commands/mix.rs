//! Mix an external audio track into a video.

use std::path::PathBuf;

use qrsplice_media::{mix_audio, FfmpegEngine, MixGains, MixRequest, MixStrategy};

pub async fn run(
    video: PathBuf,
    audio: PathBuf,
    output: PathBuf,
    gain_video: f64,
    gain_overlay: f64,
) -> anyhow::Result<()> {
    let gains = MixGains {
        video: gain_video,
        overlay: gain_overlay,
        ..MixGains::default()
    };
    let request = MixRequest::new(video, audio, output, gains);

    let outcome = mix_audio(&FfmpegEngine::default(), &request).await?;
    let how = match outcome.strategy {
        MixStrategy::Blend => "mixed with the video's own audio",
        MixStrategy::Replace => "video had no audio, external track used alone",
    };
    println!("Audio mix complete: {} ({how})", outcome.output.display());
    Ok(())
}
