//! `duat` -- validate, inspect, and watch Sands of Duat content packs.
//!
//! Commands:
//! - `duat validate [--json]`: full validation including cross references
//! - `duat check-file <path> [--type <type>]`: validate a single file
//! - `duat stats [--json]`: reference statistics
//! - `duat watch [--debounce SECS]`: hot reload until Enter is pressed
//!
//! Exit codes:
//! - 0: pack is valid
//! - 1: pack has errors
//! - 2: fatal (missing root, unparseable manifest, bad configuration)

mod cli;
mod commands;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::EXIT_FATAL;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("duat_content=debug,duat_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = match commands::load_config(cli.config.as_deref(), cli.root.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let mut out = io::stdout().lock();
    let result = match cli.command {
        Commands::Validate { json } => commands::validate(&config, json, &mut out),
        Commands::CheckFile {
            path,
            content_type,
            json,
        } => commands::check_file(&config, &path, content_type, json, &mut out),
        Commands::Stats { json } => commands::stats(&config, json, &mut out),
        Commands::Watch { debounce } => commands::watch(&config, debounce, &mut out),
    };

    result.unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        ExitCode::from(EXIT_FATAL)
    })
}
