use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Fetch and cache the Madrid traffic fines datasets",
    long_about = "Downloads the traffic fines CSV files published on datos.madrid.es.\n\
                  Datasets and the portal index page are cached on disk and only\n\
                  re-fetched once they are older than the configured maximum age.\n\
                  When the portal cannot be reached, the last cached copy is used."
)]
pub struct CliArgs {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "MADRID_FINES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory override
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Index page override
    #[arg(long, global = true)]
    pub index_url: Option<String>,

    /// Maximum dataset age with optional unit (s, m, h, d)
    #[arg(long, global = true, help = "Maximum dataset age, e.g. \"12h\", \"2d\"")]
    pub max_age: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write the dataset to a file or to stdout
    Fetch {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ignore a fresh cached copy and download again
        #[arg(short, long)]
        force_refresh: bool,

        /// Month to fetch (YYYY-MM) instead of the most recent dataset
        #[arg(short, long)]
        period: Option<String>,
    },

    /// List the dataset links found on the index page
    Links,

    /// Show the cached entry of a dataset
    Info {
        /// Month (YYYY-MM) instead of the most recent dataset
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Delete every cached file
    Clear,
}
