//! Initialize lichen.toml configuration

use crate::config::{CONFIG_FILE, SAMPLE_CONFIG};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn run(path: Option<&Path>) -> Result<()> {
    let target_path = path.unwrap_or_else(|| Path::new("."));
    let config_path = target_path.join(CONFIG_FILE);

    if config_path.exists() {
        eprintln!(
            "  {} {} already exists at {}",
            "!".yellow(),
            CONFIG_FILE,
            config_path.display()
        );
        return Ok(());
    }

    std::fs::write(&config_path, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    eprintln!(
        "  {} Created {} at {}",
        "\u{2713}".green(),
        CONFIG_FILE,
        config_path.display()
    );
    eprintln!();
    eprintln!("  Fill in your stores and products, then run:");
    eprintln!("    {}", "lichen check".bold());

    Ok(())
}
