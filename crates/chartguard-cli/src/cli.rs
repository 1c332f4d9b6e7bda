//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Chartguard: validate chart requests before they reach the query engine
#[derive(Parser)]
#[command(name = "chartguard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format (compact or json)
    #[arg(long, global = true, default_value = "compact")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a chart request and print the normalized config
    Validate {
        /// Path to the request JSON file, or - for stdin
        #[arg(value_name = "REQUEST")]
        request: PathBuf,

        /// Dataset catalog (JSON)
        #[arg(short, long, value_name = "CATALOG")]
        datasets: Option<PathBuf>,

        /// Validator settings (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Also apply series-count limits
        #[arg(long)]
        performance: bool,

        /// Do not check references against the catalog
        #[arg(long, conflicts_with = "datasets")]
        no_dataset_layer: bool,
    },

    /// Suggest dataset columns similar to a name
    Suggest {
        /// Column or metric name to look up
        #[arg(value_name = "NAME")]
        name: String,

        /// Dataset id or UUID
        #[arg(long)]
        dataset: String,

        /// Dataset catalog (JSON)
        #[arg(long, value_name = "CATALOG")]
        datasets: PathBuf,

        /// Validator settings (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the error templates
    Templates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
