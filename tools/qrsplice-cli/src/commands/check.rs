//! Check that the transcoding tools are installed.

use qrsplice_common::config::EngineSettings;
use qrsplice_media::engine::find_executable;
use qrsplice_media::{FfmpegEngine, MediaEngine};

pub async fn run() -> anyhow::Result<()> {
    println!("qrsplice System Check");
    println!("{}", "=".repeat(50));

    let settings = EngineSettings::default();
    for tool in [&settings.ffmpeg, &settings.ffprobe] {
        match find_executable(tool) {
            Some(path) => println!("[OK] {}: {}", tool.display(), path.display()),
            None => println!("[MISSING] {}", tool.display()),
        }
    }

    let engine = FfmpegEngine::new(&settings);
    let missing = engine.missing_tools();
    if !missing.is_empty() {
        println!();
        println!("Install ffmpeg (which ships ffprobe) and make sure both are on PATH.");
        anyhow::bail!("missing tools: {}", missing.join(", "));
    }

    let version = engine.run(&["-version".to_string()]).await?;
    if let Some(line) = version.stdout.lines().next() {
        println!("     {line}");
    }

    println!();
    println!("All required tools are available. qrsplice is ready.");
    Ok(())
}
