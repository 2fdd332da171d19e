//! Overlay an image onto a video.

use std::path::PathBuf;

use qrsplice_media::{overlay_image, FfmpegEngine, OverlayPosition, OverlayRequest, VideoEncoding};

pub async fn run(
    video: PathBuf,
    image: PathBuf,
    output: PathBuf,
    x: String,
    y: String,
) -> anyhow::Result<()> {
    let request = OverlayRequest {
        video_in: video,
        image_in: image,
        video_out: output,
        position: OverlayPosition::new(x, y),
        encoding: VideoEncoding::default(),
    };

    let written = overlay_image(&FfmpegEngine::default(), &request).await?;
    println!("Overlay complete: {}", written.display());
    Ok(())
}
