//! Generate a standalone QR code image.

use std::path::PathBuf;

use qrsplice_qr::{generate, QrOptions};

pub fn run(
    url: String,
    output: PathBuf,
    logo: Option<PathBuf>,
    scale: u32,
    border: u32,
) -> anyhow::Result<()> {
    let artifact = generate(&url, &output, logo.as_deref(), &QrOptions { scale, border })?;

    println!("QR code written: {}", artifact.path.display());
    println!("  Size:    {}x{}", artifact.width, artifact.height);
    println!("  Modules: {}", artifact.modules);
    if let Some(placement) = artifact.logo {
        println!(
            "  Logo:    {}x{} at ({}, {})",
            placement.width, placement.height, placement.x, placement.y
        );
    }
    Ok(())
}
