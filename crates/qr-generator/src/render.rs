//! QR symbol rasterization.

use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};

use qrsplice_common::error::{QrspliceError, QrspliceResult};

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Raster parameters for a QR symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Pixels per module.
    pub scale: u32,

    /// Quiet zone width, in modules, on every side.
    pub border: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            scale: 8,
            border: 4,
        }
    }
}

/// Encode `data` at the highest error-correction level.
///
/// Level H survives roughly 30% of the symbol being occluded, which is
/// what leaves room for a centered logo.
pub fn encode(data: &str) -> QrspliceResult<QrCode> {
    QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
        .map_err(|e| QrspliceError::invalid_asset(format!("Cannot encode QR payload: {e}")))
}

/// Largest rendered side, in pixels, before the raster is refused.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

/// A rasterized symbol and its module count.
#[derive(Debug, Clone)]
pub struct RenderedSymbol {
    pub image: RgbaImage,
    /// Modules per side, excluding the quiet zone.
    pub modules: u32,
}

/// Side length in pixels of a rendered symbol with `modules` modules.
///
/// Fails with `InvalidAsset` when the geometry overflows or exceeds
/// [`MAX_IMAGE_SIDE`].
pub fn image_side(modules: u32, options: &QrOptions) -> QrspliceResult<u32> {
    options
        .border
        .checked_mul(2)
        .and_then(|quiet| quiet.checked_add(modules))
        .and_then(|span| span.checked_mul(options.scale))
        .filter(|side| *side <= MAX_IMAGE_SIDE)
        .ok_or_else(|| {
            QrspliceError::invalid_asset(format!(
                "QR image too large: {modules} modules with border {} at scale {} exceeds {MAX_IMAGE_SIDE}px",
                options.border, options.scale
            ))
        })
}

/// Render `data` as an opaque RGBA image: black modules on white.
pub fn render_symbol(data: &str, options: &QrOptions) -> QrspliceResult<RenderedSymbol> {
    if options.scale == 0 {
        return Err(QrspliceError::invalid_asset("QR scale must be at least 1"));
    }

    let code = encode(data)?;
    let modules = code.width() as u32;
    let side = image_side(modules, options)?;
    // Bounded by `side`, which was checked above.
    let offset = options.border * options.scale;
    let colors = code.to_colors();

    let image = RgbaImage::from_fn(side, side, |px, py| {
        if px < offset || py < offset {
            return LIGHT;
        }
        let mx = (px - offset) / options.scale;
        let my = (py - offset) / options.scale;
        if mx >= modules || my >= modules {
            return LIGHT;
        }
        match colors[(my * modules + mx) as usize] {
            Color::Dark => DARK,
            Color::Light => LIGHT,
        }
    });

    tracing::debug!(modules, side, "Rendered QR symbol");
    Ok(RenderedSymbol { image, modules })
}
