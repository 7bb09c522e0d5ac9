//! Command-line interface argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Serve FMCG dashboard data from a sales table
///
/// Prints the JSON body the dashboard endpoints would return.
///
/// Examples:
///   fmcg-dashboard --data sales.csv filters
///   fmcg-dashboard --data sales.csv chart-data --query "brand=Alpha&year=2023"
///   FMCG_DATA=sales.parquet fmcg-dashboard --pretty chart-data
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Sales table to read (.csv, .tsv, .json or .parquet)
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "data/fmcg_dataset.csv",
        env = "FMCG_DATA"
    )]
    pub data: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the filter options (brands, pack types, PPGs, channels, years, months)
    Filters,

    /// Compute chart data for a filter selection
    ChartData {
        /// URL query string, e.g. "brand=A&brand=B&year=2023&month=1"
        #[arg(short, long, default_value = "", value_name = "QUERY")]
        query: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}
