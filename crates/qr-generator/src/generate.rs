//! File-level QR generation: render, embed the logo, write the PNG.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use serde::Serialize;

use qrsplice_common::error::{QrspliceError, QrspliceResult};

use crate::logo::{embed_logo, LogoPlacement};
use crate::render::{render_symbol, QrOptions, RenderedSymbol};

/// A QR image written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct QrArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Modules per side of the symbol, excluding the quiet zone.
    pub modules: u32,
    pub logo: Option<LogoPlacement>,
}

/// Generate a PNG QR code for `url` at `output_path`.
///
/// When `logo_path` is given the logo is embedded at the centre. The PNG is
/// staged in a temporary file next to `output_path` and renamed into place,
/// so a failed run never leaves a partial image behind.
pub fn generate(
    url: &str,
    output_path: &Path,
    logo_path: Option<&Path>,
    options: &QrOptions,
) -> QrspliceResult<QrArtifact> {
    tracing::info!(url, output = %output_path.display(), "Generating QR code");

    let logo = logo_path.map(load_logo).transpose()?;

    let RenderedSymbol { mut image, modules } = render_symbol(url, options)?;

    let placement = match (&logo, logo_path) {
        (Some(logo), Some(path)) => {
            tracing::info!(logo = %path.display(), "Embedding logo");
            Some(embed_logo(&mut image, logo)?)
        }
        _ => None,
    };

    write_png_atomically(&image, output_path)?;

    tracing::info!(
        output = %output_path.display(),
        side = image.width(),
        ?placement,
        "QR code saved"
    );

    Ok(QrArtifact {
        path: output_path.to_path_buf(),
        width: image.width(),
        height: image.height(),
        modules,
        logo: placement,
    })
}

fn load_logo(path: &Path) -> QrspliceResult<RgbaImage> {
    if !path.exists() {
        return Err(QrspliceError::not_found(path));
    }
    let logo = image::open(path).map_err(|e| {
        QrspliceError::invalid_asset(format!("Cannot decode logo {}: {e}", path.display()))
    })?;
    Ok(logo.to_rgba8())
}

fn write_png_atomically(image: &RgbaImage, output_path: &Path) -> QrspliceResult<()> {
    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".qrsplice-qr-").suffix(".png");
    // Created with the mode a plain `File::create` gets, not owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut staged = builder.tempfile_in(&dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| QrspliceError::invalid_asset(format!("Cannot encode PNG: {e}")))?;
        writer.flush()?;
    }
    staged
        .persist(output_path)
        .map_err(|e| QrspliceError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opts() -> QrOptions {
        QrOptions {
            scale: 10,
            border: 4,
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_generate_without_logo_writes_single_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("qr.png");
        let artifact = generate("https://google.com", &out, None, &opts()).unwrap();

        assert!(artifact.logo.is_none());
        assert_eq!(dir_entries(dir.path()), vec!["qr.png".to_string()]);

        let decoded = image::open(&out).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (artifact.width, artifact.height));
        assert_eq!(artifact.width, (artifact.modules + 8) * 10);
    }

    #[test]
    fn test_generate_with_logo_embeds_centered_box() {
        let dir = tempfile::tempdir().unwrap();
        let logo_path = dir.path().join("logo.png");
        RgbaImage::from_pixel(400, 200, Rgba([255, 0, 0, 255]))
            .save(&logo_path)
            .unwrap();
        let out = dir.path().join("qr_code_with_logo.png");

        let artifact = generate("https://google.com", &out, Some(&logo_path), &opts()).unwrap();
        let placement = artifact.logo.expect("logo placement");
        let limit = (artifact.width.min(artifact.height) as f64 * 0.2).floor() as u32;
        assert_eq!(placement.width, limit);
        assert!(placement.height <= limit);

        let decoded = image::open(&out).unwrap().to_rgba8();
        let centre = decoded.get_pixel(
            placement.x + placement.width / 2,
            placement.y + placement.height / 2,
        );
        assert_eq!(*centre, Rgba([255, 0, 0, 255]));
        assert_eq!(
            dir_entries(dir.path()),
            vec!["logo.png".to_string(), "qr_code_with_logo.png".to_string()]
        );
    }

    /// Scan the PNG at `path` and return the payload of its one QR symbol.
    fn scan(path: &Path) -> String {
        let luma = image::open(path).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width() as usize,
            luma.height() as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
        let (_, payload) = grids[0].decode().unwrap();
        payload
    }

    #[test]
    fn test_generated_png_scans_back_to_url() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("qr.png");
        let url = "https://example.com/landing?campaign=spring&ref=qrsplice";

        generate(url, &out, None, &opts()).unwrap();
        assert_eq!(scan(&out), url);
    }

    #[test]
    fn test_png_with_full_size_logo_still_scans() {
        let dir = tempfile::tempdir().unwrap();
        let logo_path = dir.path().join("logo.png");
        // Opaque and square, so it fills the whole 20% box.
        RgbaImage::from_pixel(500, 500, Rgba([255, 200, 0, 255]))
            .save(&logo_path)
            .unwrap();
        let out = dir.path().join("qr_code_with_logo.png");
        let url = "https://google.com";

        let artifact = generate(url, &out, Some(&logo_path), &opts()).unwrap();
        let placement = artifact.logo.expect("logo placement");
        let limit = (artifact.width.min(artifact.height) as f64 * 0.2).floor() as u32;
        assert_eq!((placement.width, placement.height), (limit, limit));

        assert_eq!(scan(&out), url);
    }

    #[cfg(unix)]
    #[test]
    fn test_png_gets_the_mode_of_a_regular_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("qr.png");
        generate("https://google.com", &out, None, &opts()).unwrap();

        let plain = dir.path().join("plain.txt");
        std::fs::File::create(&plain).unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out), mode(&plain));
    }

    #[test]
    fn test_oversized_scale_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("qr.png");
        let options = QrOptions {
            scale: u32::MAX,
            border: 4,
        };

        let err = generate("https://google.com", &out, None, &options).unwrap_err();
        assert!(matches!(err, QrspliceError::InvalidAsset { .. }));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_logo_is_not_found_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("qr.png");
        let missing = dir.path().join("nope.jpg");

        let err = generate("https://google.com", &out, Some(&missing), &opts()).unwrap_err();
        assert!(matches!(err, QrspliceError::NotFound { ref path } if *path == missing));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_undecodable_logo_is_invalid_asset() {
        let dir = tempfile::tempdir().unwrap();
        let logo_path = dir.path().join("logo.png");
        std::fs::write(&logo_path, b"not an image").unwrap();
        let out = dir.path().join("qr.png");

        let err = generate("https://google.com", &out, Some(&logo_path), &opts()).unwrap_err();
        assert!(matches!(err, QrspliceError::InvalidAsset { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_regeneration_yields_same_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let logo_path = dir.path().join("logo.png");
        RgbaImage::from_pixel(90, 300, Rgba([0, 128, 0, 255]))
            .save(&logo_path)
            .unwrap();
        let out = dir.path().join("qr.png");

        let first = generate("https://example.org/a", &out, Some(&logo_path), &opts()).unwrap();
        let second = generate("https://example.org/a", &out, Some(&logo_path), &opts()).unwrap();
        assert_eq!(first.logo, second.logo);
        assert_eq!(first.width, second.width);
    }
}
