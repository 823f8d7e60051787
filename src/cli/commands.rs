use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "track-courier")]
#[command(version)]
#[command(about = "Watches an incoming folder, repairs audio tags and files tracks under clean names", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the service: initial pass, then one pass per poll interval
    Run {
        /// Configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Run a single pass and exit
    Once {
        /// Configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Write a default configuration file
    Init {
        /// Configuration file to create
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,

        /// Overwrite an existing file
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Check a configuration file
    Validate {
        /// Configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Show configured paths, pending files and log size
    Status {
        /// Configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Show what the next pass would do without changing anything
    Preview {
        /// Configuration file
        #[arg(short = 'c', long, default_value = "config.json")]
        config: PathBuf,

        /// Also write the plan to this CSV file
        #[arg(short = 'r', long)]
        report: Option<PathBuf>,
    },
}
