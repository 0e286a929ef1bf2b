//! Photolyzer CLI: analyze photo directories, compare against labels, summarize labels.

use anyhow::Result;
use clap::Parser;
use photolyzer::engine::arg_parser::Cli;
use photolyzer::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> Result<ExitCode> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let ok = handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
