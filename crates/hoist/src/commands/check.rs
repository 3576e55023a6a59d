//! Check command - report which closures would be hoisted without writing anything

use anyhow::{anyhow, Context, Result};
use clap::Args;
use hoist_diagnostics::{DiagnosticEmitter, Diagnostics, JsonEmitter, SourceCache, TerminalEmitter};
use similar::TextDiff;
use std::fs;
use std::path::PathBuf;

use crate::config::{HoistConfig, SourceTypeSetting};
use crate::pipeline::{collect_files, hoist_hints, transform_source};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input JavaScript file or directory
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Print a unified diff of the changes
    #[arg(long)]
    pub diff: bool,

    /// How to parse input files (overrides hoist.toml)
    #[arg(long, value_enum)]
    pub source_type: Option<SourceTypeSetting>,

    /// Configuration file (default: hoist.toml next to the input)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: CheckArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let config = HoistConfig::load(args.config.as_deref(), &args.input)?;
    let source_type = args
        .source_type
        .unwrap_or(config.transform.source_type)
        .to_source_type();
    let files = collect_files(&args.input, &config.transform)?;

    if files.is_empty() {
        match format {
            OutputFormat::Text => println!("No JavaScript files found."),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "type": "summary",
                        "success": true,
                        "files_checked": 0,
                        "hoistable": 0,
                    })
                );
            }
        }
        return Ok(());
    }

    if matches!(format, OutputFormat::Text) && !quiet {
        println!("Checking {} file(s)...", files.len());
    }

    let mut cache = SourceCache::new();
    let mut all_diagnostics = Diagnostics::new();
    let mut diffs = Vec::new();
    let mut checked_files = 0;
    let mut changed_files = 0;

    for file in &files {
        let source = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
        let filename = file.to_string_lossy().to_string();
        let Some(result) = transform_source(&source, &filename, source_type, &mut cache, &mut all_diagnostics)
        else {
            continue;
        };
        checked_files += 1;
        if result.report.is_empty() {
            continue;
        }
        changed_files += 1;
        all_diagnostics.extend(hoist_hints(&result.report));

        if args.diff {
            let diff = TextDiff::from_lines(source.as_str(), result.output.as_str())
                .unified_diff()
                .context_radius(3)
                .header(&filename, &filename)
                .to_string();
            diffs.push(diff);
        }
    }

    let hoistable = all_diagnostics.hint_count();
    let errors = all_diagnostics.error_count();
    let warnings = all_diagnostics.warning_count();

    match format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(std::io::stderr().lock(), use_color);
            emitter.emit_all(&all_diagnostics, &cache)?;

            for diff in &diffs {
                print!("{}", diff);
            }

            if !quiet {
                println!();
                if errors > 0 {
                    if use_color {
                        println!(
                            "{}: {} error(s), {} warning(s)",
                            console::style("Check failed").red().bold(),
                            errors,
                            warnings
                        );
                    } else {
                        println!("Check failed: {} error(s), {} warning(s)", errors, warnings);
                    }
                } else if hoistable > 0 {
                    let summary = format!(
                        "{} closure(s) can be hoisted in {} of {} file(s)",
                        hoistable, changed_files, checked_files
                    );
                    if use_color {
                        println!("{}", console::style(summary).cyan());
                    } else {
                        println!("{}", summary);
                    }
                } else if use_color {
                    println!(
                        "{} - {} file(s) checked",
                        console::style("Nothing to hoist").green().bold(),
                        checked_files
                    );
                } else {
                    println!("Nothing to hoist - {} file(s) checked", checked_files);
                }
            }
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(std::io::stdout().lock());
            emitter.emit_all(&all_diagnostics, &cache)?;

            let summary = serde_json::json!({
                "type": "summary",
                "success": errors == 0,
                "files_checked": checked_files,
                "files_changed": changed_files,
                "hoistable": hoistable,
                "errors": errors,
                "warnings": warnings,
                "diffs": diffs,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
    }

    if all_diagnostics.has_errors() {
        Err(anyhow!("Check failed with errors"))
    } else {
        Ok(())
    }
}
