//! Read-only commands (info, frame)

use serde::Serialize;
use std::process::ExitCode;

use crate::session::Session;

use super::{report, LoadArgs, EXIT_ERROR, EXIT_SUCCESS};

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: failed to serialize output: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the info command
pub fn run_info(load: &LoadArgs) -> ExitCode {
    let session = Session::new();
    match session.load(&load.request()) {
        Ok(summary) => print_json(&summary),
        Err(e) => report(&e),
    }
}

/// Execute the frame command
pub fn run_frame(load: &LoadArgs, index: usize) -> ExitCode {
    let session = Session::new();
    if let Err(e) = session.load(&load.request()) {
        return report(&e);
    }
    match session.frame(index) {
        Ok(view) => print_json(&view),
        Err(e) => report(&e),
    }
}
