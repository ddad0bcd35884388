use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Numeric feel parameters for the actor and terrain.
///
/// Velocities and accelerations are expressed per reference step (1/60 s), positions in world
/// pixels. Multipliers such as friction apply once per reference step and are rescaled when the
/// fixed step differs from the reference step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub actor_width: f32,
    pub actor_height: f32,

    pub move_accel: f32,
    pub low_friction_accel_scale: f32,
    pub max_speed_x: f32,
    pub ground_friction: f32,
    pub air_resistance: f32,
    pub low_friction_drag: f32,

    pub gravity: f32,
    pub fall_multiplier: f32,
    pub max_fall_speed: f32,

    pub charge_rate: f32,
    pub max_jump_charge: f32,
    pub min_jump_force: f32,
    pub bounce_impulse: f32,

    pub wall_damping: f32,
    pub wall_min_kick: f32,
    pub contact_tolerance: f32,
    pub one_way_tolerance: f32,

    pub slope_slide_speed: f32,
    pub slope_stick_speed: f32,
    pub slope_snap_tolerance: f32,

    pub collapse_delay_secs: f32,
    pub collapse_respawn_secs: f32,
    pub collapse_nudge: f32,
    pub conceal_interval_secs: f32,

    pub death_duration_secs: f32,
    pub respawn_grace_secs: f32,

    pub camera_smoothing: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            actor_width: 20.0,
            actor_height: 30.0,

            move_accel: 1.2,
            low_friction_accel_scale: 0.1,
            max_speed_x: 6.0,
            ground_friction: 0.8,
            air_resistance: 0.98,
            low_friction_drag: 0.99,

            gravity: 0.45,
            fall_multiplier: 1.6,
            max_fall_speed: 14.0,

            charge_rate: 0.45,
            max_jump_charge: 16.0,
            min_jump_force: 6.0,
            bounce_impulse: 18.0,

            wall_damping: 0.4,
            wall_min_kick: 1.0,
            contact_tolerance: 2.0,
            one_way_tolerance: 2.0,

            slope_slide_speed: 2.5,
            slope_stick_speed: 2.0,
            slope_snap_tolerance: 10.0,

            collapse_delay_secs: 1.5,
            collapse_respawn_secs: 1.0,
            collapse_nudge: 2.0,
            conceal_interval_secs: 2.0,

            death_duration_secs: 1.0,
            respawn_grace_secs: 0.5,

            camera_smoothing: 0.1,
        }
    }
}

impl PhysicsTuning {
    pub fn collapse_delay(&self) -> Duration {
        secs_or(self.collapse_delay_secs, 1.5)
    }

    pub fn collapse_respawn(&self) -> Duration {
        secs_or(self.collapse_respawn_secs, 1.0)
    }

    pub fn conceal_interval(&self) -> Duration {
        secs_or(self.conceal_interval_secs, 2.0)
    }

    pub fn death_duration(&self) -> Duration {
        secs_or(self.death_duration_secs, 1.0)
    }

    pub fn respawn_grace(&self) -> Duration {
        secs_or(self.respawn_grace_secs, 0.5)
    }
}

/// Converts a configured number of seconds, falling back when the value is negative or not finite.
fn secs_or(secs: f32, fallback: f32) -> Duration {
    Duration::try_from_secs_f32(secs).unwrap_or_else(|_| Duration::from_secs_f32(fallback))
}
