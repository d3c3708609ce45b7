//! `nebula-effects`: runs the trail and nebula demo.

use std::process::ExitCode;

use clap::Parser;
use nebula_config::CliArgs;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match nebula_app::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("nebula-effects: {e}");
            ExitCode::FAILURE
        }
    }
}
