//! Write the default pipeline config.

use std::path::PathBuf;

use qrsplice_common::config::PipelineConfig;

pub fn run(output: PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (pass --force to overwrite)",
            output.display()
        );
    }

    PipelineConfig::default()
        .save(&output)
        .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;

    println!("Config written: {}", output.display());
    println!("Edit it, then run: qrsplice run --config {}", output.display());
    Ok(())
}
