use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::sim::{
    EventSink, InputSnapshot, InputSource, LevelData, PhysicsEvent, PhysicsTuning, SimConfig,
    Simulator, Vec2,
};

use super::atomic_io::write_text_atomic;

pub const REPLAY_FORMAT_VERSION: u32 = 1;
const MAX_STEP_BITS: u8 = 0b1111;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read replay {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write replay {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse replay json at {json_path}: {source}")]
    Parse {
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode replay json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unsupported replay format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("replay was recorded against level {recorded}, current level is {current}")]
    LevelMismatch { recorded: String, current: String },
    #[error("replay step is {recorded_nanos}ns, simulator step is {current_nanos}ns")]
    StepMismatch {
        recorded_nanos: u64,
        current_nanos: u64,
    },
    #[error("replay step {index} has invalid input bits {bits:#06b}")]
    InvalidStep { index: usize, bits: u8 },
}

/// Per-step input log bound to the level it was recorded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub format_version: u32,
    pub level_sha256_hex: Option<String>,
    pub fixed_step_nanos: u64,
    pub steps: Vec<u8>,
}

impl Replay {
    pub fn new(level_sha256_hex: Option<String>, fixed_step: Duration) -> Self {
        Self {
            format_version: REPLAY_FORMAT_VERSION,
            level_sha256_hex,
            fixed_step_nanos: fixed_step.as_nanos() as u64,
            steps: Vec::new(),
        }
    }

    pub fn for_simulator(simulator: &Simulator) -> Self {
        Self::new(
            simulator.level().source_sha256_hex.clone(),
            simulator.fixed_step(),
        )
    }

    pub fn push(&mut self, snapshot: &InputSnapshot) {
        self.steps.push(snapshot.to_bits());
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn fixed_step(&self) -> Duration {
        Duration::from_nanos(self.fixed_step_nanos)
    }

    /// Checks the replay can drive a simulator on `level` with `fixed_step`.
    pub fn validate_for(&self, level: &LevelData, fixed_step: Duration) -> Result<(), ReplayError> {
        if self.format_version != REPLAY_FORMAT_VERSION {
            return Err(ReplayError::UnsupportedVersion {
                found: self.format_version,
                expected: REPLAY_FORMAT_VERSION,
            });
        }
        if self.level_sha256_hex != level.source_sha256_hex {
            return Err(ReplayError::LevelMismatch {
                recorded: describe_hash(self.level_sha256_hex.as_deref()),
                current: describe_hash(level.source_sha256_hex.as_deref()),
            });
        }
        let current_nanos = fixed_step.as_nanos() as u64;
        if self.fixed_step_nanos != current_nanos {
            return Err(ReplayError::StepMismatch {
                recorded_nanos: self.fixed_step_nanos,
                current_nanos,
            });
        }
        if let Some((index, bits)) = self
            .steps
            .iter()
            .enumerate()
            .find(|(_, bits)| **bits > MAX_STEP_BITS)
        {
            return Err(ReplayError::InvalidStep { index, bits: *bits });
        }
        Ok(())
    }
}

fn describe_hash(hash: Option<&str>) -> String {
    hash.unwrap_or("<built-in fallback>").to_string()
}

pub fn read_replay(path: &Path) -> Result<Replay, ReplayError> {
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize::<_, Replay>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ReplayError::Parse {
            json_path,
            source: error.into_inner(),
        }
    })
}

pub fn write_replay(path: &Path, replay: &Replay) -> Result<(), ReplayError> {
    let text = serde_json::to_string(replay).map_err(ReplayError::Encode)?;
    write_text_atomic(path, &text).map_err(|source| ReplayError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), steps = replay.len(), "replay_written");
    Ok(())
}

/// Plays recorded snapshots back, then idles.
#[derive(Debug, Clone)]
pub struct ReplayInput {
    steps: Vec<u8>,
    cursor: usize,
    activity_since_take: bool,
}

impl ReplayInput {
    pub fn new(replay: &Replay) -> Self {
        Self {
            steps: replay.steps.clone(),
            cursor: 0,
            activity_since_take: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Whether any replayed step held a key or released jump since the last call.
    pub fn take_activity(&mut self) -> bool {
        std::mem::take(&mut self.activity_since_take)
    }
}

impl InputSource for ReplayInput {
    fn snapshot_for_step(&mut self) -> InputSnapshot {
        match self.steps.get(self.cursor) {
            Some(bits) => {
                self.cursor += 1;
                let snapshot = InputSnapshot::from_bits(*bits);
                self.activity_since_take |= snapshot.has_activity();
                snapshot
            }
            None => InputSnapshot::empty(),
        }
    }
}

/// Forwards another source and logs every snapshot it hands out.
#[derive(Debug)]
pub struct RecordingInput<I> {
    inner: I,
    replay: Replay,
}

impl<I: InputSource> RecordingInput<I> {
    pub fn new(inner: I, replay: Replay) -> Self {
        Self { inner, replay }
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.inner
    }

    pub fn into_replay(self) -> Replay {
        self.replay
    }
}

impl<I: InputSource> InputSource for RecordingInput<I> {
    fn snapshot_for_step(&mut self) -> InputSnapshot {
        let snapshot = self.inner.snapshot_for_step();
        self.replay.push(&snapshot);
        snapshot
    }
}

#[derive(Debug, Default)]
struct EventTally {
    counts: BTreeMap<&'static str, u32>,
}

impl EventSink for EventTally {
    fn receive(&mut self, _step: u64, events: &[PhysicsEvent]) {
        for event in events {
            *self.counts.entry(event.name()).or_default() += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub steps: u64,
    pub final_position: Vec2,
    pub final_velocity: Vec2,
    pub grounded: bool,
    pub deaths: u32,
    pub event_counts: BTreeMap<&'static str, u32>,
}

/// Re-simulates `replay` without a window. Same inputs always give the same summary.
pub fn run_replay_headless(
    level: LevelData,
    tuning: PhysicsTuning,
    config: SimConfig,
    replay: &Replay,
) -> Result<ReplaySummary, ReplayError> {
    let config = SimConfig {
        fixed_step: replay.fixed_step(),
        ..config
    };
    replay.validate_for(&level, config.fixed_step)?;

    let mut simulator = Simulator::new(level, tuning, config);
    let mut input = ReplayInput::new(replay);
    let mut tally = EventTally::default();
    while !input.is_finished() {
        let snapshot = input.snapshot_for_step();
        simulator.step(&snapshot, &mut tally);
    }

    let actor = simulator.actor();
    let summary = ReplaySummary {
        steps: simulator.step_index(),
        final_position: actor.position,
        final_velocity: actor.velocity,
        grounded: actor.grounded,
        deaths: simulator.deaths(),
        event_counts: tally.counts,
    };
    info!(
        steps = summary.steps,
        deaths = summary.deaths,
        x = summary.final_position.x,
        y = summary.final_position.y,
        "replay_verified"
    );
    Ok(summary)
}
