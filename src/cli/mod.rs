//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

use commands::{
    diagnose::DiagnoseArgs, fix::FixArgs, history::HistoryArgs, normalize::NormalizeArgs,
    validate::ValidateArgs, watch::WatchArgs,
};

/// Diagnose a failing CI pipeline, gate and apply a fix, verify the next run.
#[derive(Parser, Debug)]
#[command(name = "remedy", version, about, long_about = None)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .remedy/config.yaml and .remedy/local.yaml)
    #[arg(long, global = true, env = "REMEDY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Repair hunk headers of a unified diff
    Normalize(NormalizeArgs),
    /// Check a raw oracle response against the diagnostic contract
    Validate(ValidateArgs),
    /// Collect evidence for the failing run and ask the oracle for a diagnosis
    Diagnose(DiagnoseArgs),
    /// Apply a diagnosed patch through the safe-apply gate
    Fix(FixArgs),
    /// Run the remediation loop until the pipeline converges or gives up
    Watch(WatchArgs),
    /// Show the last remediation loop's history
    History(HistoryArgs),
}

impl Cli {
    /// Level implied by `-v` flags, if any.
    pub const fn verbosity_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}

/// Load configuration from `--config` or the project directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Report an error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }
    std::process::exit(1)
}
