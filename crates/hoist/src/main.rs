//! hoist - closure hoisting for JavaScript
//!
//! CLI driver: moves closures that do not depend on their enclosing
//! activation up to the outermost scope where they still behave the same.

mod commands;
mod config;
mod pipeline;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Closure hoisting for JavaScript
#[derive(Parser, Debug)]
#[command(name = "hoist")]
#[command(author, version, about = "Hoist closures out of JavaScript functions")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hoist closures and print or write the result
    Run(commands::run::RunArgs),

    /// Report hoistable closures without writing anything
    Check(commands::check::CheckArgs),

    /// Write a default hoist.toml
    Init(commands::init::InitArgs),
}

/// Log filter used when RUST_LOG is not set
fn default_log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(cli.verbose, cli.quiet)),
    )
    .init();

    // Determine if colors should be used
    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stderr);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Run(args) => commands::run::run(args, cli.format, use_color, cli.quiet),
        Commands::Check(args) => commands::check::run(args, cli.format, use_color, cli.quiet),
        Commands::Init(args) => commands::init::run(args, cli.format, use_color),
    }
}
