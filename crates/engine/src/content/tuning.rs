use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::sim::PhysicsTuning;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning json at {json_path}: {source}")]
    Parse {
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses a partial override file; omitted fields keep their defaults.
pub fn parse_tuning_json(raw: &str) -> Result<PhysicsTuning, TuningError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, PhysicsTuning>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        TuningError::Parse {
            json_path,
            source: error.into_inner(),
        }
    })
}

pub fn load_tuning(path: &Path) -> Result<PhysicsTuning, TuningError> {
    let raw = fs::read_to_string(path).map_err(|source| TuningError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tuning_json(&raw)
}

pub fn load_tuning_or_default(path: Option<&Path>) -> PhysicsTuning {
    let Some(path) = path else {
        return PhysicsTuning::default();
    };
    match load_tuning(path) {
        Ok(tuning) => {
            info!(path = %path.display(), "tuning_overrides_loaded");
            tuning
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "tuning_load_failed_using_defaults");
            PhysicsTuning::default()
        }
    }
}
