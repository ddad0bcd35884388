use std::process::ExitCode;

use tracing::error;

mod behavior;
mod bootstrap;
mod loop_runner;

pub(crate) fn run() -> ExitCode {
    match bootstrap::build_app() {
        Ok(app) => loop_runner::run(app),
        Err(err) => {
            error!(error = %err, "bootstrap_failed");
            ExitCode::FAILURE
        }
    }
}
