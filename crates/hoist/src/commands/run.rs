//! Run command - hoist closures and write the transformed source

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use hoist_diagnostics::{DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache, TerminalEmitter};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{HoistConfig, SourceTypeSetting};
use crate::pipeline::{collect_files, transform_source};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input JavaScript file or directory
    pub input: PathBuf,

    /// Output file, or output directory for a directory input (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How to parse input files (overrides hoist.toml)
    #[arg(long, value_enum)]
    pub source_type: Option<SourceTypeSetting>,

    /// Configuration file (default: hoist.toml next to the input)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: RunArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let config = HoistConfig::load(args.config.as_deref(), &args.input)?;
    let source_type = args
        .source_type
        .unwrap_or(config.transform.source_type)
        .to_source_type();

    let files = collect_files(&args.input, &config.transform)?;
    let directory_input = args.input.is_dir();
    if directory_input && args.output.is_none() {
        bail!("--output <dir> is required when the input is a directory");
    }

    let mut cache = SourceCache::new();
    let mut diagnostics = Diagnostics::new();
    let mut hoisted = 0;
    let mut written = 0;

    for file in &files {
        let source = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        let filename = file.to_string_lossy().to_string();
        let Some(result) = transform_source(&source, &filename, source_type, &mut cache, &mut diagnostics) else {
            continue;
        };
        hoisted += result.report.len();

        match &args.output {
            None => print!("{}", result.output),
            Some(out) => {
                let target = if directory_input {
                    out.join(relative_to(file, &args.input))
                } else {
                    out.clone()
                };
                write_output(&target, &result.output)?;
                written += 1;
            }
        }
    }

    match format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(std::io::stderr().lock(), use_color);
            emitter.emit_all(&diagnostics, &cache)?;
            if !quiet && args.output.is_some() {
                let summary = format!(
                    "Hoisted {} closure(s) in {} file(s)",
                    hoisted, written
                );
                if use_color {
                    eprintln!("{}", console::style(summary).green().bold());
                } else {
                    eprintln!("{}", summary);
                }
            }
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(std::io::stderr().lock());
            emitter.emit_all(&diagnostics, &cache)?;
            let summary = serde_json::json!({
                "type": "summary",
                "success": !diagnostics.has_errors(),
                "files": files.len(),
                "files_written": written,
                "hoisted": hoisted,
                "errors": diagnostics.error_count(),
            });
            eprintln!("{}", serde_json::to_string(&summary)?);
        }
    }

    if diagnostics.has_errors() {
        Err(anyhow!("{} file(s) could not be transformed", diagnostics.error_count()))
    } else {
        Ok(())
    }
}

fn relative_to(file: &Path, base: &Path) -> PathBuf {
    file.strip_prefix(base).unwrap_or(file).to_path_buf()
}

fn write_output(target: &Path, content: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    log::debug!("writing {}", target.display());
    fs::write(target, content).with_context(|| format!("failed to write {}", target.display()))
}
