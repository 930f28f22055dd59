use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a problem document as algebraic model text
    Gms {
        /// Path to the problem document
        input: PathBuf,
        /// Output file path
        output: PathBuf,
    },
    /// Condense a solved instance into one trace record line
    Trace {
        /// Path to the problem document
        instance: PathBuf,
        /// Path to the result document
        result: PathBuf,
        /// Append the record to this file instead of printing it
        #[arg(long)]
        trace_file: Option<PathBuf>,
    },
}
