//! Command line driver for the document translators.
//!
//! Two subcommands cover the two offline directions: `gms` renders a
//! problem document as algebraic model text, `trace` condenses a problem
//! and result document pair into one summary line.

use anyhow::{Context, Result};
use clap::Parser;
use oslink_io::{read_osil_file, read_osrl_file, write_gms, TraceRecord};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info};

mod cli;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.log_level.into()),
        )
        .with_writer(io::stderr)
        .init();

    info!("oslink v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&cli) {
        error!("conversion failed: {:?}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Gms { input, output } => gms(input, output),
        Commands::Trace {
            instance,
            result,
            trace_file,
        } => trace(instance, result, trace_file.as_deref()),
    }
}

fn gms(input: &Path, output: &Path) -> Result<()> {
    let instance = read_osil_file(input)
        .with_context(|| format!("reading problem document {}", input.display()))?;
    info!(
        "read {} variables and {} constraints from {}",
        instance.num_variables(),
        instance.num_constraints(),
        input.display()
    );
    let text = write_gms(&instance)
        .with_context(|| format!("rendering {} as model text", input.display()))?;
    fs::write(output, text)
        .with_context(|| format!("writing model text to {}", output.display()))?;
    info!("model text written to {}", output.display());
    Ok(())
}

fn trace(instance_path: &Path, result_path: &Path, trace_file: Option<&Path>) -> Result<()> {
    let instance = read_osil_file(instance_path)
        .with_context(|| format!("reading problem document {}", instance_path.display()))?;
    let result = read_osrl_file(result_path)
        .with_context(|| format!("reading result document {}", result_path.display()))?;
    let record = TraceRecord::from_documents(&instance, &result)?;
    match trace_file {
        Some(path) => {
            record
                .append_to(path)
                .with_context(|| format!("appending to trace file {}", path.display()))?;
            info!("trace record appended to {}", path.display());
        }
        None => println!("{record}"),
    }
    Ok(())
}
