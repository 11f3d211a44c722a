use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ristbond")]
#[command(author, version, about = "Encoder and bonded RIST uplink controller")]
pub struct Cli {
    /// Path to config file (defaults to $CONFIG_PATH, then /data/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the pipeline and the control plane
    Start {
        /// Host to bind to (overrides ui.listen)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides ui.listen)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate the configuration file
    Validate,

    /// Print the command line of every process a start would launch
    PrintCommands,

    /// Check that the external programs are available
    CheckTools,

    /// Display version information
    Version,
}
