mod atomic_io;
mod hashing;
mod level;
mod replay;
mod tuning;

pub use level::{
    load_level, load_level_or_fallback, parse_level_json, LevelLoadError, COLLISION_LAYER_NAME,
};
pub use replay::{
    read_replay, run_replay_headless, write_replay, RecordingInput, Replay, ReplayError,
    ReplayInput, ReplaySummary, REPLAY_FORMAT_VERSION,
};
pub use tuning::{load_tuning, load_tuning_or_default, parse_tuning_json, TuningError};
