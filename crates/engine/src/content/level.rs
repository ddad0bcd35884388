use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sim::{
    CollapseState, ConcealMode, Concealment, LevelData, Oscillation, PhysicsTuning, Rect, Terrain,
    TerrainKind, TerrainTag, Vec2, FALLBACK_WORLD_HEIGHT, FALLBACK_WORLD_WIDTH,
};

use super::hashing::sha256_hex;

pub const COLLISION_LAYER_NAME: &str = "CollisionLayer";
const OBJECT_GROUP: &str = "objectgroup";
const SPAWN_CLASS: &str = "spawn";
const DEFAULT_OSCILLATION_SPEED: f32 = 2.0;
const DEFAULT_OSCILLATION_RANGE: f32 = 200.0;

#[derive(Debug, Error)]
pub enum LevelLoadError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level json at {json_path}: {source}")]
    Parse {
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level has no objectgroup layer")]
    NoObjectLayer,
    #[error("level world size {width}x{height} is not usable")]
    InvalidWorldSize { width: f32, height: f32 },
    #[error("level contains no usable terrain objects")]
    NoTerrain,
}

#[derive(Debug, Deserialize)]
struct TiledMap {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    layers: Vec<TiledLayer>,
    #[serde(default)]
    properties: Vec<TiledProperty>,
}

#[derive(Debug, Deserialize)]
struct TiledLayer {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    objects: Vec<TiledObject>,
}

#[derive(Debug, Deserialize)]
struct TiledObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    class: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    x: f32,
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    properties: Vec<TiledProperty>,
}

#[derive(Debug, Deserialize)]
struct TiledProperty {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl TiledObject {
    /// `class`, then `type`, then `normal`; empty strings count as absent.
    fn class_name(&self) -> &str {
        [self.class.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or("normal")
    }
}

fn property<'a>(properties: &'a [TiledProperty], name: &str) -> Option<&'a serde_json::Value> {
    properties
        .iter()
        .find(|property| property.name == name)
        .map(|property| &property.value)
}

fn property_f32(properties: &[TiledProperty], name: &str) -> Option<f32> {
    let value = match property(properties, name)? {
        serde_json::Value::Number(number) => number.as_f64().map(|value| value as f32),
        serde_json::Value::String(text) => text.trim().parse::<f32>().ok(),
        _ => None,
    };
    value.filter(|value| value.is_finite())
}

fn property_str<'a>(properties: &'a [TiledProperty], name: &str) -> Option<&'a str> {
    property(properties, name)?.as_str()
}

pub fn parse_level_json(raw: &str, tuning: &PhysicsTuning) -> Result<LevelData, LevelLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let map = serde_path_to_error::deserialize::<_, TiledMap>(&mut deserializer).map_err(
        |error| {
            let json_path = error.path().to_string();
            LevelLoadError::Parse {
                json_path,
                source: error.into_inner(),
            }
        },
    )?;
    build_level(&map, tuning)
}

fn world_size(map: &TiledMap) -> Result<(f32, f32), LevelLoadError> {
    let tiled_width = (map.width as f32) * (map.tilewidth as f32);
    let tiled_height = (map.height as f32) * (map.tileheight as f32);
    let width = property_f32(&map.properties, "worldWidth").unwrap_or(tiled_width);
    let height = property_f32(&map.properties, "worldHeight").unwrap_or(tiled_height);
    if width == 0.0 && height == 0.0 {
        debug!(
            width = FALLBACK_WORLD_WIDTH,
            height = FALLBACK_WORLD_HEIGHT,
            "level_world_size_defaulted"
        );
        return Ok((FALLBACK_WORLD_WIDTH, FALLBACK_WORLD_HEIGHT));
    }
    if !(width > 0.0 && height > 0.0) {
        return Err(LevelLoadError::InvalidWorldSize { width, height });
    }
    Ok((width, height))
}

fn build_level(map: &TiledMap, tuning: &PhysicsTuning) -> Result<LevelData, LevelLoadError> {
    let (world_width, world_height) = world_size(map)?;
    let layer = map
        .layers
        .iter()
        .find(|layer| layer.kind == OBJECT_GROUP && layer.name == COLLISION_LAYER_NAME)
        .or_else(|| {
            let fallback = map.layers.iter().find(|layer| layer.kind == OBJECT_GROUP);
            if let Some(layer) = fallback {
                warn!(layer = %layer.name, "collision_layer_missing_using_first_objectgroup");
            }
            fallback
        })
        .ok_or(LevelLoadError::NoObjectLayer)?;

    let mut terrain = Vec::with_capacity(layer.objects.len());
    let mut spawn = None;
    for object in &layer.objects {
        if !object.x.is_finite() || !object.y.is_finite() {
            warn!(object_id = object.id, "level_object_rejected_non_finite_position");
            continue;
        }
        let class = object.class_name();
        if class == SPAWN_CLASS {
            spawn = Some(Vec2::new(object.x, object.y));
            continue;
        }
        if !(object.width.is_finite() && object.height.is_finite())
            || object.width < 0.0
            || object.height < 0.0
        {
            warn!(
                object_id = object.id,
                width = object.width,
                height = object.height,
                "level_object_rejected_bad_size"
            );
            continue;
        }
        terrain.push(terrain_from_object(object, class, tuning));
    }

    if terrain.is_empty() {
        return Err(LevelLoadError::NoTerrain);
    }

    let actor_size = Vec2::new(tuning.actor_width, tuning.actor_height);
    let spawn = spawn.unwrap_or_else(|| {
        LevelData::derive_spawn(world_width, world_height, &terrain, actor_size)
    });

    Ok(LevelData {
        world_width,
        world_height,
        spawn,
        terrain,
        source_sha256_hex: None,
    })
}

fn terrain_from_object(object: &TiledObject, class: &str, tuning: &PhysicsTuning) -> Terrain {
    let rect = Rect::new(object.x, object.y, object.width, object.height);
    let tag = TerrainTag::from_level_name(class).unwrap_or_else(|| {
        warn!(object_id = object.id, class, "level_object_unknown_class_as_static");
        TerrainTag::Static
    });
    let kind = match tag {
        TerrainTag::Static => TerrainKind::Static,
        TerrainTag::Oscillating => {
            let speed =
                property_f32(&object.properties, "speed").unwrap_or(DEFAULT_OSCILLATION_SPEED);
            let range =
                property_f32(&object.properties, "range").unwrap_or(DEFAULT_OSCILLATION_RANGE);
            TerrainKind::Oscillating(Oscillation::new(object.x, range, speed))
        }
        TerrainTag::Collapsible => TerrainKind::Collapsible(CollapseState::default()),
        TerrainTag::Bouncy => TerrainKind::Bouncy,
        TerrainTag::LowFriction => TerrainKind::LowFriction,
        TerrainTag::OneDirectional => TerrainKind::OneDirectional,
        TerrainTag::Concealed => {
            TerrainKind::Concealed(Concealment::new(conceal_mode(object, tuning)))
        }
        TerrainTag::SlopeLeft => TerrainKind::SlopeLeft,
        TerrainTag::SlopeRight => TerrainKind::SlopeRight,
    };
    Terrain::new(rect, kind)
}

fn conceal_mode(object: &TiledObject, tuning: &PhysicsTuning) -> ConcealMode {
    match property_str(&object.properties, "mode").map(str::trim) {
        None | Some("phantom") => ConcealMode::Phantom,
        Some("trapdoor") => ConcealMode::Trapdoor,
        Some("periodic") => {
            let interval = property_f32(&object.properties, "interval")
                .and_then(|secs| Duration::try_from_secs_f32(secs).ok())
                .filter(|interval| !interval.is_zero())
                .unwrap_or_else(|| tuning.conceal_interval());
            ConcealMode::Periodic { interval }
        }
        Some(other) => {
            warn!(object_id = object.id, mode = other, "level_object_unknown_conceal_mode");
            ConcealMode::Phantom
        }
    }
}

pub fn load_level(path: &Path, tuning: &PhysicsTuning) -> Result<LevelData, LevelLoadError> {
    let bytes = fs::read(path).map_err(|source| LevelLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = String::from_utf8_lossy(&bytes);
    let mut level = parse_level_json(&raw, tuning)?;
    level.source_sha256_hex = Some(sha256_hex(&bytes));
    info!(
        path = %path.display(),
        terrain_count = level.terrain.len(),
        world_width = level.world_width,
        world_height = level.world_height,
        "level_loaded"
    );
    Ok(level)
}

/// Never fails: any load error is logged and replaced by the safety-platform level.
pub fn load_level_or_fallback(path: &Path, tuning: &PhysicsTuning) -> LevelData {
    match load_level(path, tuning) {
        Ok(level) => level,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "level_load_failed_using_fallback");
            LevelData::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"{
        "width": 60, "height": 135, "tilewidth": 32, "tileheight": 32,
        "layers": [
            { "type": "tilelayer", "name": "Background" },
            { "type": "objectgroup", "name": "Decor", "objects": [
                { "id": 99, "x": 0, "y": 0, "width": 5, "height": 5 }
            ]},
            { "type": "objectgroup", "name": "CollisionLayer", "objects": [
                { "id": 1, "class": "normal", "x": 0, "y": 4200, "width": 1920, "height": 120 },
                { "id": 2, "type": "moving", "x": 300, "y": 3900, "width": 160, "height": 20,
                  "properties": [
                    { "name": "speed", "type": "float", "value": 3.5 },
                    { "name": "range", "type": "int", "value": 120 }
                  ] },
                { "id": 3, "class": "broken", "x": 700, "y": 3700, "width": 120, "height": 20 },
                { "id": 4, "class": "fake", "x": 900, "y": 3600, "width": 120, "height": 20,
                  "properties": [
                    { "name": "mode", "type": "string", "value": "periodic" },
                    { "name": "interval", "type": "float", "value": 0.5 }
                  ] },
                { "id": 5, "class": "slopeLeft", "x": 1100, "y": 3500, "width": 200, "height": 80 },
                { "id": 6, "class": "", "type": "oneWay", "x": 10, "y": 10, "width": 100, "height": 10 },
                { "id": 7, "class": "lava", "x": 10, "y": 40, "width": 10, "height": 10 },
                { "id": 8, "class": "ice", "x": 10, "y": 70, "width": -4, "height": 10 },
                { "id": 9, "class": "spawn", "x": 64, "y": 4100 }
            ]}
        ]
    }"#;

    #[test]
    fn parses_collision_layer_variants_and_spawn() {
        let level = parse_level_json(SAMPLE, &PhysicsTuning::default()).expect("parse");
        assert_eq!(level.world_width, 1920.0);
        assert_eq!(level.world_height, 4320.0);
        assert_eq!(level.spawn, Vec2::new(64.0, 4100.0));
        let tags: Vec<TerrainTag> = level.terrain.iter().map(Terrain::tag).collect();
        assert_eq!(
            tags,
            vec![
                TerrainTag::Static,
                TerrainTag::Oscillating,
                TerrainTag::Collapsible,
                TerrainTag::Concealed,
                TerrainTag::SlopeLeft,
                TerrainTag::OneDirectional,
                TerrainTag::Static,
            ]
        );
        assert_eq!(
            level.terrain[1].kind,
            TerrainKind::Oscillating(Oscillation::new(300.0, 120.0, 3.5))
        );
        assert_eq!(
            level.terrain[3].kind,
            TerrainKind::Concealed(Concealment::new(ConcealMode::Periodic {
                interval: Duration::from_millis(500)
            }))
        );
    }

    #[test]
    fn falls_back_to_first_objectgroup_and_derives_spawn() {
        let raw = r#"{
            "width": 10, "height": 10, "tilewidth": 100, "tileheight": 100,
            "layers": [
                { "type": "objectgroup", "name": "Platforms", "objects": [
                    { "id": 1, "x": 100, "y": 900, "width": 400, "height": 40 }
                ]}
            ]
        }"#;
        let level = parse_level_json(raw, &PhysicsTuning::default()).expect("parse");
        assert_eq!(level.terrain.len(), 1);
        assert_eq!(level.spawn, Vec2::new(290.0, 869.0));
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = r#"{ "layers": [ { "type": "objectgroup", "objects": [ { "x": "left" } ] } ] }"#;
        let error = parse_level_json(raw, &PhysicsTuning::default()).expect_err("bad x");
        match error {
            LevelLoadError::Parse { json_path, .. } => {
                assert_eq!(json_path, "layers[0].objects[0].x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn map_without_object_layer_is_rejected() {
        let raw = r#"{ "width": 2, "height": 2, "tilewidth": 8, "tileheight": 8,
                       "layers": [ { "type": "tilelayer", "name": "Ground" } ] }"#;
        assert!(matches!(
            parse_level_json(raw, &PhysicsTuning::default()),
            Err(LevelLoadError::NoObjectLayer)
        ));
    }

    #[test]
    fn missing_or_malformed_file_falls_back_to_safety_platform() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("missing.json");
        assert_eq!(
            load_level_or_fallback(&missing, &PhysicsTuning::default()),
            LevelData::fallback()
        );

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ not json").expect("write");
        assert_eq!(
            load_level_or_fallback(&broken, &PhysicsTuning::default()),
            LevelData::fallback()
        );
    }

    #[test]
    fn loaded_level_records_source_hash() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("mapdata.json");
        fs::write(&path, SAMPLE).expect("write");
        let level = load_level(&path, &PhysicsTuning::default()).expect("load");
        assert_eq!(
            level.source_sha256_hex.as_deref(),
            Some(sha256_hex(SAMPLE.as_bytes()).as_str())
        );
    }
}
