//! Run the broadcast network configured by `BCASTSIM_*` environment variables and print
//! the report as TOML.

use bcastsim::runtime::{init_logger, Builder};
use std::process::ExitCode;

fn main() -> ExitCode {
    init_logger();
    let report = match Builder::from_env().and_then(Builder::run) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    print!("{report}");
    ExitCode::SUCCESS
}
