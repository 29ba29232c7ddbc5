//! framelog - Command-line viewer and exporter for simulation frame logs

use std::process::ExitCode;

use framelog::cli;

fn main() -> ExitCode {
    cli::run()
}
