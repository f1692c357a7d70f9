//! Root CLI structure for bsp-overlay

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bsp-overlay")]
#[command(about = "Inspect Source BSP maps and the brush overlays built from them", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Map file operations
    #[command(flatten)]
    Bsp(crate::commands::bsp::BspCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
