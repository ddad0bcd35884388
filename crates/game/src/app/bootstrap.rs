use std::env;
use std::path::{Path, PathBuf};

use engine::{
    load_level_or_fallback, load_tuning_or_default, read_replay, resolve_app_paths, InputMode,
    LevelData, LoopConfig, PhysicsTuning, Replay, ReplayError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LEVEL_ENV_VAR: &str = "RAGEFALL_LEVEL";
const TUNING_ENV_VAR: &str = "RAGEFALL_TUNING";
const RECORD_REPLAY_ENV_VAR: &str = "RAGEFALL_RECORD_REPLAY";
const PLAY_REPLAY_ENV_VAR: &str = "RAGEFALL_PLAY_REPLAY";
const VERIFY_REPLAY_FLAG: &str = "--verify-replay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LaunchMode {
    Window,
    /// Re-simulate a replay without a window and print its summary.
    VerifyReplay(PathBuf),
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("--verify-replay needs a replay file path")]
    MissingReplayPath,
    #[error("unrecognized argument: {0}")]
    UnknownArgument(String),
    #[error("replay from {path} cannot be played: {source}")]
    Replay {
        path: PathBuf,
        #[source]
        source: ReplayError,
    },
}

pub(crate) struct AppWiring {
    pub(crate) mode: LaunchMode,
    pub(crate) config: LoopConfig,
    pub(crate) level: LevelData,
    pub(crate) tuning: PhysicsTuning,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Ragefall Startup ===");

    let mode = parse_launch_mode(env::args().skip(1))?;
    let tuning = load_tuning_or_default(env_path(TUNING_ENV_VAR).as_deref());
    let level = load_startup_level(&tuning);

    let mut config = LoopConfig {
        record_replay_path: env_path(RECORD_REPLAY_ENV_VAR),
        ..LoopConfig::default()
    };
    if let Some(path) = env_path(PLAY_REPLAY_ENV_VAR) {
        config.input_mode = InputMode::Replay(load_playable_replay(&path, &level, &config)?);
    }

    Ok(AppWiring {
        mode,
        config,
        level,
        tuning,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_launch_mode<I>(args: I) -> Result<LaunchMode, BootstrapError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    match args.next() {
        None => Ok(LaunchMode::Window),
        Some(flag) if flag == VERIFY_REPLAY_FLAG => args
            .next()
            .map(|path| LaunchMode::VerifyReplay(PathBuf::from(path)))
            .ok_or(BootstrapError::MissingReplayPath),
        Some(other) => Err(BootstrapError::UnknownArgument(other)),
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}

/// The level override wins, then the project's bundled level, then the built-in safety net.
fn load_startup_level(tuning: &PhysicsTuning) -> LevelData {
    if let Some(path) = env_path(LEVEL_ENV_VAR) {
        return load_level_or_fallback(&path, tuning);
    }
    match resolve_app_paths() {
        Ok(paths) => {
            info!(
                root = %paths.root.display(),
                levels_dir = %paths.levels_dir.display(),
                replays_dir = %paths.replays_dir.display(),
                "startup"
            );
            load_level_or_fallback(&paths.default_level_path(), tuning)
        }
        Err(error) => {
            warn!(error = %error, "project_root_unresolved_using_fallback_level");
            LevelData::fallback()
        }
    }
}

fn load_playable_replay(
    path: &Path,
    level: &LevelData,
    config: &LoopConfig,
) -> Result<Replay, BootstrapError> {
    let to_error = |source: ReplayError| BootstrapError::Replay {
        path: path.to_path_buf(),
        source,
    };
    let replay = read_replay(path).map_err(to_error)?;
    replay
        .validate_for(level, config.sim_config().fixed_step)
        .map_err(to_error)?;
    Ok(replay)
}
