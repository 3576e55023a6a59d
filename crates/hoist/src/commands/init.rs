//! Init command - write a default hoist.toml

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use crate::config::{HoistConfig, CONFIG_FILE};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing hoist.toml
    #[arg(long)]
    pub force: bool,
}

const HEADER: &str = "# hoist configuration\n#\n# source_type: \"module\", \"script\" or \"auto\"\n\n";

pub fn run(args: InitArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    fs::create_dir_all(&args.path).with_context(|| format!("failed to create {}", args.path.display()))?;
    let config_path = args.path.join(CONFIG_FILE);

    let created = if config_path.exists() && !args.force {
        false
    } else {
        let content = format!("{}{}", HEADER, HoistConfig::default().to_toml()?);
        fs::write(&config_path, content).with_context(|| format!("failed to write {}", config_path.display()))?;
        true
    };

    match format {
        OutputFormat::Text => {
            let status = if created { "Created" } else { "Skipped" };
            let status = if use_color {
                console::style(status).green().bold().to_string()
            } else {
                status.to_string()
            };
            if created {
                println!("  {} {}", status, config_path.display());
            } else {
                println!("  {} {} (already exists, use --force to overwrite)", status, config_path.display());
            }
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "created": created,
                "path": config_path.to_string_lossy(),
            });
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}
