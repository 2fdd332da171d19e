//! Image overlay stage: burn a still image onto every frame of a video.

use std::path::PathBuf;

use qrsplice_common::config::OverlaySettings;
use qrsplice_common::error::{QrspliceError, QrspliceResult};
use qrsplice_common::stage::Stage;

use crate::engine::{ensure_available, path_arg, require_exists, MediaEngine};

/// Where the image's top-left corner lands, as engine expressions.
///
/// Expressions may reference `main_w`, `main_h`, `overlay_w`, `overlay_h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayPosition {
    pub x: String,
    pub y: String,
}

impl OverlayPosition {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Anchor to the top-right corner, `margin` pixels in from both edges.
    pub fn top_right(margin: u32) -> Self {
        Self::new(format!("main_w-overlay_w-{margin}"), margin.to_string())
    }

    /// The overlay filter, with each expression quoted so `,` `:` and `;`
    /// inside it are not read as graph syntax.
    fn filter(&self) -> QrspliceResult<String> {
        Ok(format!(
            "overlay=x={}:y={}",
            quote_expr(&self.x)?,
            quote_expr(&self.y)?
        ))
    }
}

impl Default for OverlayPosition {
    fn default() -> Self {
        Self::top_right(10)
    }
}

fn quote_expr(expr: &str) -> QrspliceResult<String> {
    let expr = expr.trim();
    if expr.is_empty() || expr.contains('\'') {
        return Err(QrspliceError::config(format!(
            "invalid overlay position expression: {expr:?}"
        )));
    }
    Ok(format!("'{expr}'"))
}

/// Encoder settings for the re-encoded overlay output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoding {
    pub video_codec: String,
    pub crf: u8,
    pub audio_codec: String,
}

impl Default for VideoEncoding {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
        }
    }
}

/// Inputs and settings for one overlay run.
#[derive(Debug, Clone)]
pub struct OverlayRequest {
    pub video_in: PathBuf,
    pub image_in: PathBuf,
    pub video_out: PathBuf,
    pub position: OverlayPosition,
    pub encoding: VideoEncoding,
}

impl OverlayRequest {
    /// Build a request from pipeline settings.
    pub fn from_settings(
        video_in: PathBuf,
        image_in: PathBuf,
        video_out: PathBuf,
        settings: &OverlaySettings,
    ) -> Self {
        Self {
            video_in,
            image_in,
            video_out,
            position: OverlayPosition::new(&settings.x, &settings.y),
            encoding: VideoEncoding {
                video_codec: settings.video_codec.clone(),
                crf: settings.crf,
                audio_codec: settings.audio_codec.clone(),
            },
        }
    }

    /// Engine arguments for this overlay.
    ///
    /// The source audio is mapped as optional (`0:a?`) so silent videos
    /// pass through without error.
    pub fn args(&self) -> QrspliceResult<Vec<String>> {
        let graph = format!("[0:v][1:v]{}[vout]", self.position.filter()?);
        Ok(vec![
            "-y".to_string(),
            "-i".to_string(),
            path_arg(&self.video_in)?,
            "-i".to_string(),
            path_arg(&self.image_in)?,
            "-filter_complex".to_string(),
            graph,
            "-map".to_string(),
            "[vout]".to_string(),
            "-map".to_string(),
            "0:a?".to_string(),
            "-c:v".to_string(),
            self.encoding.video_codec.clone(),
            "-crf".to_string(),
            self.encoding.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            self.encoding.audio_codec.clone(),
            path_arg(&self.video_out)?,
        ])
    }
}

/// Composite `request.image_in` onto `request.video_in`, writing
/// `request.video_out` (overwritten if present).
pub async fn overlay_image(
    engine: &dyn MediaEngine,
    request: &OverlayRequest,
) -> QrspliceResult<PathBuf> {
    ensure_available(engine)?;
    require_exists([request.video_in.as_path(), request.image_in.as_path()])?;
    let args = request.args()?;

    tracing::info!(
        video = %request.video_in.display(),
        image = %request.image_in.display(),
        x = %request.position.x,
        y = %request.position.y,
        "Overlaying image onto video"
    );

    engine.run(&args).await?.check(Stage::ImageOverlay)?;

    tracing::info!(output = %request.video_out.display(), "Image overlay complete");
    Ok(request.video_out.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OverlayRequest {
        OverlayRequest {
            video_in: PathBuf::from("input/ch1.mp4"),
            image_in: PathBuf::from("output/qr.png"),
            video_out: PathBuf::from("output/intermediate_1_qr.mp4"),
            position: OverlayPosition::default(),
            encoding: VideoEncoding::default(),
        }
    }

    #[test]
    fn test_default_position_is_top_right_with_margin() {
        let pos = OverlayPosition::default();
        assert_eq!(pos.x, "main_w-overlay_w-10");
        assert_eq!(pos.y, "10");
    }

    #[test]
    fn test_args_build_overlay_graph_with_optional_audio() {
        let args = request().args().unwrap();
        let graph_at = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(
            args[graph_at + 1],
            "[0:v][1:v]overlay=x='main_w-overlay_w-10':y='10'[vout]"
        );
        assert!(args.windows(2).any(|w| w == ["-map", "0:a?"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("output/intermediate_1_qr.mp4")
        );
    }

    #[test]
    fn test_expression_with_commas_is_quoted() {
        let mut req = request();
        req.position = OverlayPosition::new("max(0,main_w-overlay_w-10)", "10");
        let args = req.args().unwrap();
        assert!(args
            .iter()
            .any(|a| a.contains("x='max(0,main_w-overlay_w-10)'")));
    }

    #[test]
    fn test_quote_in_expression_is_rejected() {
        let mut req = request();
        req.position = OverlayPosition::new("1'0", "10");
        assert!(matches!(req.args(), Err(QrspliceError::Config { .. })));
    }

    #[test]
    fn test_from_settings_copies_encoding() {
        let settings = OverlaySettings {
            crf: 18,
            ..OverlaySettings::default()
        };
        let req = OverlayRequest::from_settings(
            "a.mp4".into(),
            "b.png".into(),
            "c.mp4".into(),
            &settings,
        );
        assert_eq!(req.encoding.crf, 18);
        assert_eq!(req.position, OverlayPosition::default());
    }
}
