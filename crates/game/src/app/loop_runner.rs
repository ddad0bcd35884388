use std::path::Path;
use std::process::ExitCode;

use engine::{
    read_replay, run_app, run_replay_headless, LevelData, LoopConfig, PhysicsTuning,
    SharedSimulator, Simulator,
};
use tracing::{error, info};

use super::behavior::BehaviorTracker;
use super::bootstrap::{AppWiring, LaunchMode};

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        mode,
        config,
        level,
        tuning,
    } = app;
    match mode {
        LaunchMode::Window => run_window(config, level, tuning),
        LaunchMode::VerifyReplay(path) => verify_replay(&path, &config, level, tuning),
    }
}

fn run_window(config: LoopConfig, level: LevelData, tuning: PhysicsTuning) -> ExitCode {
    let simulator = Simulator::new(level, tuning, config.sim_config());
    let tracker = BehaviorTracker::new(simulator.fixed_step());
    if let Err(err) = run_app(config, SharedSimulator::new(simulator), Box::new(tracker)) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn verify_replay(
    path: &Path,
    config: &LoopConfig,
    level: LevelData,
    tuning: PhysicsTuning,
) -> ExitCode {
    let summary = read_replay(path)
        .and_then(|replay| run_replay_headless(level, tuning, config.sim_config(), &replay));
    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => {
            error!(path = %path.display(), error = %err, "replay_verification_failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            info!(path = %path.display(), steps = summary.steps, "replay_summary_printed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "replay_summary_encode_failed");
            ExitCode::FAILURE
        }
    }
}
