use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod sim;

pub use app::{
    run_app, run_app_with_metrics, AppError, InputMode, LoopConfig, LoopMetricsSnapshot,
    MetricsHandle, Renderer, SessionObserver, Viewport, SLOW_FRAME_ENV_VAR,
};
pub use content::{
    load_level, load_level_or_fallback, load_tuning, load_tuning_or_default, parse_level_json,
    parse_tuning_json, read_replay, run_replay_headless, write_replay, LevelLoadError,
    RecordingInput, Replay, ReplayError, ReplayInput, ReplaySummary, TuningError,
    COLLISION_LAYER_NAME, REPLAY_FORMAT_VERSION,
};
pub use sim::{
    fixed_step_for_rate, Actor, ActorView, AdvanceReport, Camera, EventSink, Facing, InputAction,
    InputSnapshot, InputSource, LevelData, LifeState, PhysicsEvent, PhysicsTuning, Rect,
    RenderView, ScriptedInput, SharedSimulator, SimConfig, Simulator, StampedEvent, SurfaceType,
    Terrain, TerrainId, TerrainKind, TerrainTag, TerrainView, TerrainVisual, Vec2, Zone,
};

pub const ROOT_ENV_VAR: &str = "RAGEFALL_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub levels_dir: PathBuf,
    pub replays_dir: PathBuf,
}

impl AppPaths {
    pub fn default_level_path(&self) -> PathBuf {
        self.levels_dir.join("mapdata.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create replay directory at {path}: {source}")]
    CreateReplayDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "RAGEFALL_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/ragefall\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    app_paths_under(root)
}

fn app_paths_under(root: PathBuf) -> Result<AppPaths, StartupError> {
    let levels_dir = root.join("assets").join("levels");
    let replays_dir = root.join("replays");

    fs::create_dir_all(&replays_dir).map_err(|source| StartupError::CreateReplayDir {
        path: replays_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        levels_dir,
        replays_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
