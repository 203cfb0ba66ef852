//! Command line definition for `duat`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use duat_schema::ContentType;

/// Validate, inspect, and watch Sands of Duat content packs.
#[derive(Parser, Debug)]
#[command(name = "duat")]
#[command(version)]
#[command(about = "Validate, inspect, and watch Sands of Duat content packs")]
pub struct Cli {
    /// Content pack root; overrides `content_root` from the config file
    #[arg(short, long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the whole pack, cross references included
    Validate {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a single content file
    CheckFile {
        /// The YAML file to check
        path: PathBuf,
        /// Content type of the file; inferred from its directory if omitted
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        content_type: Option<ContentType>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print reference statistics for the pack
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch the pack and revalidate on every change until Enter is pressed
    Watch {
        /// Debounce window in seconds; overrides the config file
        #[arg(short, long, value_name = "SECS")]
        debounce: Option<f64>,
    },
}
