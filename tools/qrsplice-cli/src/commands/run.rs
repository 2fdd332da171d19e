//! Run the full pipeline.

use std::path::PathBuf;

use clap::Args;
use qrsplice_common::config::{LoggingConfig, PipelineConfig};
use qrsplice_pipeline::{Pipeline, StageStatus};

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config (JSON). Defaults are used for anything it omits.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding ch1.mp4, ch2.mp4, target.m4a, and img.jpg
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving the QR image, intermediates, and final video
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// URL encoded in the QR code
    #[arg(long)]
    pub url: Option<String>,

    /// Delete the QR image and intermediate videos after a successful run
    #[arg(long)]
    pub discard_intermediates: bool,
}

/// The config file (or defaults) with command-line overrides applied.
pub fn resolve_config(args: &RunArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(url) = &args.url {
        config.url = url.clone();
    }
    if args.discard_intermediates {
        config.keep_intermediates = false;
    }
    Ok(config)
}

/// Command-line logging flags layered over the config's logging section.
pub fn merge_logging(flags: LoggingConfig, file: &LoggingConfig, verbose: bool) -> LoggingConfig {
    LoggingConfig {
        level: if verbose {
            flags.level
        } else {
            file.level.clone()
        },
        json: flags.json || file.json,
    }
}

pub async fn run(config: PipelineConfig) -> anyhow::Result<()> {
    println!("qrsplice pipeline");
    println!("{}", "=".repeat(50));
    println!("  Input:  {}", config.input_dir.display());
    println!("  Output: {}", config.output_dir.display());
    println!("  URL:    {}", config.url);
    println!();

    let pipeline = Pipeline::with_ffmpeg(config).on_stage(Box::new(|event| {
        match event.status {
            StageStatus::Started => println!("[..] {}", event.stage),
            StageStatus::Finished => println!("[OK] {}", event.stage),
            StageStatus::Skipped => println!("[--] {} (skipped)", event.stage),
            StageStatus::Failed => println!("[FAIL] {}", event.stage),
        }
    }));

    let report = pipeline.run().await?;

    println!();
    match &report.final_output {
        Some(path) => println!("Final video: {}", path.display()),
        None => println!("No final video was written"),
    }
    for path in &report.removed_intermediates {
        println!("  removed {}", path.display());
    }
    println!("Report: {}", pipeline.config().report_path().display());

    Ok(())
}
