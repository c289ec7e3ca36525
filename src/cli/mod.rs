//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;

/// hf - Clip hydrofabric GeoPackages to an area of interest
#[derive(Parser, Debug)]
#[command(name = "hf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit machine-readable JSON on stdout and JSON logs on stderr
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: <config dir>/hydrofabric/config.toml, then ./hydrofabric.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the layers of a GeoPackage
    Layers(commands::layers::LayersArgs),

    /// Keep only features intersecting a mask, and the rows that reference them
    Mask(commands::mask::MaskArgs),

    /// Show the effective configuration
    Config(commands::config::ConfigArgs),
}
