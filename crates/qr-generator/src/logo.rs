//! Logo fitting and compositing onto a rendered QR symbol.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Serialize;

use qrsplice_common::error::{QrspliceError, QrspliceResult};

/// Largest logo side as a fraction of the QR image's shorter side.
pub const LOGO_MAX_FRACTION: f64 = 0.20;

/// Bounding box of an embedded logo, in QR image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogoPlacement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Largest logo side allowed inside a `width` x `height` QR image.
pub fn max_logo_side(width: u32, height: u32) -> u32 {
    (width.min(height) as f64 * LOGO_MAX_FRACTION).floor() as u32
}

/// Proportionally shrink `(w, h)` so neither side exceeds `max_side`.
///
/// Sizes already inside the box are returned unchanged; logos are never
/// enlarged. A side that rounds down to zero is reported as invalid.
pub fn fit_within(w: u32, h: u32, max_side: u32) -> QrspliceResult<(u32, u32)> {
    let fitted = if w <= max_side && h <= max_side {
        (w, h)
    } else if w >= h {
        (max_side, scale_side(h, max_side, w))
    } else {
        (scale_side(w, max_side, h), max_side)
    };

    if fitted.0 == 0 || fitted.1 == 0 {
        return Err(QrspliceError::invalid_asset(format!(
            "Logo size is invalid after resizing ({w}x{h} -> {}x{})",
            fitted.0, fitted.1
        )));
    }
    Ok(fitted)
}

fn scale_side(side: u32, target: u32, longest: u32) -> u32 {
    let scaled = (side as u64 * target as u64 + longest as u64 / 2) / longest as u64;
    scaled as u32
}

/// Where a `logo_w` x `logo_h` logo lands when centered in the QR image.
pub fn centered_placement(qr_w: u32, qr_h: u32, logo_w: u32, logo_h: u32) -> LogoPlacement {
    LogoPlacement {
        x: (qr_w - logo_w) / 2,
        y: (qr_h - logo_h) / 2,
        width: logo_w,
        height: logo_h,
    }
}

/// Composite `logo` onto the centre of `qr`.
///
/// The target region is first painted opaque white so transparent logo
/// pixels still sit on a light background, then the logo is blended using
/// its own alpha channel.
pub fn embed_logo(qr: &mut RgbaImage, logo: &RgbaImage) -> QrspliceResult<LogoPlacement> {
    let (qr_w, qr_h) = qr.dimensions();
    let max_side = max_logo_side(qr_w, qr_h);
    let (logo_w, logo_h) = fit_within(logo.width(), logo.height(), max_side)?;

    let resized;
    let logo = if (logo_w, logo_h) == logo.dimensions() {
        logo
    } else {
        resized = imageops::resize(logo, logo_w, logo_h, FilterType::Lanczos3);
        &resized
    };

    let placement = centered_placement(qr_w, qr_h, logo_w, logo_h);
    let backing = RgbaImage::from_pixel(logo_w, logo_h, Rgba([255, 255, 255, 255]));
    imageops::replace(qr, &backing, placement.x as i64, placement.y as i64);
    imageops::overlay(qr, logo, placement.x as i64, placement.y as i64);

    tracing::debug!(?placement, "Embedded logo");
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn test_max_logo_side_uses_shorter_dimension() {
        assert_eq!(max_logo_side(290, 290), 58);
        assert_eq!(max_logo_side(400, 100), 20);
    }

    #[test]
    fn test_fit_within_keeps_small_logo() {
        assert_eq!(fit_within(30, 20, 58).unwrap(), (30, 20));
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        assert_eq!(fit_within(200, 100, 58).unwrap(), (58, 29));
        assert_eq!(fit_within(100, 400, 58).unwrap(), (15, 58));
    }

    #[test]
    fn test_fit_within_rejects_collapsed_side() {
        let err = fit_within(10_000, 1, 58).unwrap_err();
        assert!(matches!(err, QrspliceError::InvalidAsset { .. }));
        assert!(fit_within(10, 10, 0).is_err());
    }

    #[test]
    fn test_embed_logo_paints_white_under_transparency() {
        let mut qr = solid(100, 100, [0, 0, 0, 255]);
        let logo = solid(10, 10, [255, 0, 0, 0]);
        let placement = embed_logo(&mut qr, &logo).unwrap();
        assert_eq!(
            placement,
            LogoPlacement {
                x: 45,
                y: 45,
                width: 10,
                height: 10
            }
        );
        assert_eq!(*qr.get_pixel(50, 50), Rgba([255, 255, 255, 255]));
        assert_eq!(*qr.get_pixel(44, 50), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_embed_logo_opaque_pixels_replace_symbol() {
        let mut qr = solid(100, 100, [0, 0, 0, 255]);
        let logo = solid(8, 8, [0, 0, 255, 255]);
        embed_logo(&mut qr, &logo).unwrap();
        assert_eq!(*qr.get_pixel(48, 48), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_embed_logo_is_deterministic() {
        let logo = solid(300, 120, [10, 20, 30, 255]);
        let mut first = solid(290, 290, [255, 255, 255, 255]);
        let mut second = first.clone();
        let a = embed_logo(&mut first, &logo).unwrap();
        let b = embed_logo(&mut second, &logo).unwrap();
        assert_eq!(a, b);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_oversized_logo_is_bounded_and_centered(
            qr_side in 50u32..600,
            logo_w in 1u32..2000,
            logo_h in 1u32..2000,
        ) {
            let max_side = max_logo_side(qr_side, qr_side);
            prop_assume!(logo_w.max(logo_h) > max_side);
            let Ok((w, h)) = fit_within(logo_w, logo_h, max_side) else {
                return Ok(());
            };
            prop_assert!(w <= max_side && h <= max_side);

            let p = centered_placement(qr_side, qr_side, w, h);
            let cx = p.x as f64 + w as f64 / 2.0;
            let cy = p.y as f64 + h as f64 / 2.0;
            let centre = qr_side as f64 / 2.0;
            prop_assert!((cx - centre).abs() <= 1.0);
            prop_assert!((cy - centre).abs() <= 1.0);
        }
    }
}
