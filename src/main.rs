//! govcache - cached access to Taiwanese government open data
//!
//! Prints the result of one query as JSON on stdout. Logs and errors go to
//! stderr.

use std::process::ExitCode;

use clap::Parser;

use govcache::cli::Cli;
use govcache::{app, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match app::run(&cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
