use std::time::Duration;

use tracing::debug;

use super::events::{EventQueue, PhysicsEvent};
use super::geometry::{Rect, Vec2};
use super::input::{InputAction, InputSnapshot};
use super::terrain::{TerrainId, TerrainTag};
use super::tuning::PhysicsTuning;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Surface the actor is resting on, mirrored from the supporting terrain piece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SurfaceType {
    #[default]
    Air,
    Ground(TerrainTag),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifeState {
    #[default]
    Alive,
    /// Frozen in place; input ignored until the timer runs out.
    Dying { remaining: Duration },
    /// Back at spawn; horizontal input ignored and charge held at zero.
    Respawning { remaining: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    /// Top-left corner in world space.
    pub position: Vec2,
    /// Per-reference-step velocity.
    pub velocity: Vec2,
    pub size: Vec2,
    pub grounded: bool,
    pub standing_on: Option<TerrainId>,
    pub surface: SurfaceType,
    pub jump_charge: f32,
    pub facing: Facing,
    pub life: LifeState,
    pub spawn: Vec2,
    /// Top edge of the last supporting surface, used to classify falls.
    pub last_support_y: f32,
}

impl Actor {
    pub fn new(spawn: Vec2, tuning: &PhysicsTuning) -> Self {
        Self {
            position: spawn,
            velocity: Vec2::ZERO,
            size: Vec2::new(tuning.actor_width, tuning.actor_height),
            grounded: false,
            standing_on: None,
            surface: SurfaceType::Air,
            jump_charge: 0.0,
            facing: Facing::default(),
            life: LifeState::Alive,
            spawn,
            last_support_y: spawn.y + tuning.actor_height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    pub fn is_dying(&self) -> bool {
        matches!(self.life, LifeState::Dying { .. })
    }

    pub fn is_respawning(&self) -> bool {
        matches!(self.life, LifeState::Respawning { .. })
    }

    pub fn on_slope(&self) -> bool {
        matches!(self.surface, SurfaceType::Ground(tag) if tag.is_slope())
    }

    pub(crate) fn set_airborne(&mut self) {
        self.grounded = false;
        self.standing_on = None;
        self.surface = SurfaceType::Air;
    }

    pub(crate) fn set_supported(&mut self, terrain: TerrainId, tag: TerrainTag, surface_y: f32) {
        self.grounded = true;
        self.standing_on = Some(terrain);
        self.surface = SurfaceType::Ground(tag);
        self.last_support_y = surface_y;
    }

    pub(crate) fn begin_dying(&mut self, tuning: &PhysicsTuning) {
        self.life = LifeState::Dying {
            remaining: tuning.death_duration(),
        };
        self.velocity = Vec2::ZERO;
        self.jump_charge = 0.0;
        self.set_airborne();
    }

    pub(crate) fn respawn(&mut self, tuning: &PhysicsTuning) {
        self.position = self.spawn;
        self.velocity = Vec2::ZERO;
        self.jump_charge = 0.0;
        self.set_airborne();
        self.last_support_y = self.spawn.y + self.size.y;
        self.life = LifeState::Respawning {
            remaining: tuning.respawn_grace(),
        };
    }

    /// Advances the lifecycle timers. Returns `true` when motion must be skipped this step.
    pub(crate) fn tick_life(
        &mut self,
        step: Duration,
        tuning: &PhysicsTuning,
        events: &mut EventQueue,
    ) -> bool {
        match self.life {
            LifeState::Alive => false,
            LifeState::Dying { remaining } => {
                let remaining = remaining.saturating_sub(step);
                if remaining.is_zero() {
                    self.respawn(tuning);
                    events.push(PhysicsEvent::Respawned);
                    debug!(x = self.position.x, y = self.position.y, "actor_respawned");
                } else {
                    self.life = LifeState::Dying { remaining };
                }
                true
            }
            LifeState::Respawning { remaining } => {
                let remaining = remaining.saturating_sub(step);
                self.life = if remaining.is_zero() {
                    LifeState::Alive
                } else {
                    LifeState::Respawning { remaining }
                };
                false
            }
        }
    }

    /// Rigid carry by the supporting piece's displacement for this step.
    pub(crate) fn carry(&mut self, dx: f32) {
        if self.grounded && dx != 0.0 {
            self.position.x += dx;
        }
    }

    /// Velocity and charge update for one fixed step. Position is moved by the collision resolver.
    pub(crate) fn integrate(
        &mut self,
        input: &InputSnapshot,
        tuning: &PhysicsTuning,
        step_scale: f32,
        events: &mut EventQueue,
    ) {
        let respawning = self.is_respawning();
        let on_ice = self.surface == SurfaceType::Ground(TerrainTag::LowFriction);

        if !respawning {
            let mut direction = 0.0;
            if input.is_down(InputAction::MoveLeft) {
                direction -= 1.0;
            }
            if input.is_down(InputAction::MoveRight) {
                direction += 1.0;
            }
            if direction != 0.0 {
                let scale = if on_ice {
                    tuning.low_friction_accel_scale
                } else {
                    1.0
                };
                self.velocity.x += direction * tuning.move_accel * scale * step_scale;
                self.facing = if direction < 0.0 {
                    Facing::Left
                } else {
                    Facing::Right
                };
            }
        }

        if respawning {
            self.jump_charge = 0.0;
        } else if self.grounded && input.is_down(InputAction::JumpHold) {
            self.jump_charge =
                (self.jump_charge + tuning.charge_rate * step_scale).min(tuning.max_jump_charge);
        }

        self.velocity.x = self
            .velocity
            .x
            .clamp(-tuning.max_speed_x, tuning.max_speed_x);
        let drag = match self.surface {
            SurfaceType::Air => tuning.air_resistance,
            SurfaceType::Ground(TerrainTag::LowFriction) => tuning.low_friction_drag,
            SurfaceType::Ground(_) => tuning.ground_friction,
        };
        self.velocity.x *= drag.powf(step_scale);

        let gravity = if self.velocity.y < 0.0 {
            tuning.gravity
        } else {
            tuning.gravity * tuning.fall_multiplier
        };
        self.velocity.y = (self.velocity.y + gravity * step_scale).min(tuning.max_fall_speed);

        if input.jump_released() {
            if self.grounded {
                let power = self.jump_charge.max(tuning.min_jump_force);
                self.velocity.y = -power;
                self.set_airborne();
                events.push(PhysicsEvent::Jumped { power });
            }
            self.jump_charge = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_nanos(16_666_667);

    fn grounded_actor(tag: TerrainTag) -> Actor {
        let tuning = PhysicsTuning::default();
        let mut actor = Actor::new(Vec2::new(100.0, 100.0), &tuning);
        actor.set_supported(TerrainId(0), tag, 130.0);
        actor
    }

    fn hold(action: InputAction) -> InputSnapshot {
        InputSnapshot::empty().with_action_down(action, true)
    }

    #[test]
    fn charge_accumulates_only_while_grounded_and_clamps() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut actor = grounded_actor(TerrainTag::Static);
        for _ in 0..200 {
            actor.integrate(&hold(InputAction::JumpHold), &tuning, 1.0, &mut events);
            actor.velocity.y = 0.0;
        }
        assert_eq!(actor.jump_charge, tuning.max_jump_charge);

        let mut airborne = Actor::new(Vec2::ZERO, &tuning);
        airborne.integrate(&hold(InputAction::JumpHold), &tuning, 1.0, &mut events);
        assert_eq!(airborne.jump_charge, 0.0);
    }

    #[test]
    fn release_edge_jumps_with_at_least_minimum_force() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut actor = grounded_actor(TerrainTag::Static);
        actor.integrate(
            &InputSnapshot::empty().with_jump_released(true),
            &tuning,
            1.0,
            &mut events,
        );
        assert_eq!(actor.velocity.y, -tuning.min_jump_force);
        assert!(!actor.grounded);
        assert_eq!(actor.standing_on, None);
        assert_eq!(actor.surface, SurfaceType::Air);
        assert_eq!(
            events.as_slice(),
            &[PhysicsEvent::Jumped {
                power: tuning.min_jump_force
            }]
        );
    }

    #[test]
    fn release_while_airborne_clears_charge_without_jumping() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut actor = Actor::new(Vec2::ZERO, &tuning);
        actor.jump_charge = 9.0;
        actor.integrate(
            &InputSnapshot::empty().with_jump_released(true),
            &tuning,
            1.0,
            &mut events,
        );
        assert_eq!(actor.jump_charge, 0.0);
        assert!(actor.velocity.y > 0.0);
        assert!(events.as_slice().is_empty());
    }

    #[test]
    fn ice_scales_acceleration_down() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut normal = grounded_actor(TerrainTag::Static);
        let mut ice = grounded_actor(TerrainTag::LowFriction);
        normal.integrate(&hold(InputAction::MoveRight), &tuning, 1.0, &mut events);
        ice.integrate(&hold(InputAction::MoveRight), &tuning, 1.0, &mut events);
        assert!(ice.velocity.x > 0.0);
        assert!(ice.velocity.x < normal.velocity.x * 0.2);
    }

    #[test]
    fn gravity_is_stronger_when_falling_and_capped() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut rising = Actor::new(Vec2::ZERO, &tuning);
        rising.velocity.y = -5.0;
        rising.integrate(&InputSnapshot::empty(), &tuning, 1.0, &mut events);
        assert!((rising.velocity.y - (-5.0 + tuning.gravity)).abs() < 1e-5);

        let mut falling = Actor::new(Vec2::ZERO, &tuning);
        falling.velocity.y = 13.9;
        falling.integrate(&InputSnapshot::empty(), &tuning, 1.0, &mut events);
        assert_eq!(falling.velocity.y, tuning.max_fall_speed);
    }

    #[test]
    fn respawning_ignores_horizontal_input_and_charge() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut actor = grounded_actor(TerrainTag::Static);
        actor.life = LifeState::Respawning {
            remaining: Duration::from_millis(500),
        };
        actor.jump_charge = 4.0;
        let input = hold(InputAction::MoveLeft).with_action_down(InputAction::JumpHold, true);
        actor.integrate(&input, &tuning, 1.0, &mut events);
        assert_eq!(actor.velocity.x, 0.0);
        assert_eq!(actor.jump_charge, 0.0);
    }

    #[test]
    fn dying_freezes_then_respawns_at_spawn() {
        let tuning = PhysicsTuning::default();
        let mut events = EventQueue::default();
        let mut actor = Actor::new(Vec2::new(40.0, 50.0), &tuning);
        actor.position = Vec2::new(900.0, 5000.0);
        actor.velocity = Vec2::new(3.0, 14.0);
        actor.begin_dying(&tuning);

        let mut frozen_steps = 0;
        while actor.is_dying() {
            assert!(actor.tick_life(STEP, &tuning, &mut events));
            frozen_steps += 1;
            assert!(frozen_steps <= 61);
        }
        assert_eq!(frozen_steps, 60);
        assert_eq!(actor.position, actor.spawn);
        assert_eq!(actor.velocity, Vec2::ZERO);
        assert_eq!(actor.jump_charge, 0.0);
        assert!(actor.is_respawning());
        assert_eq!(events.as_slice(), &[PhysicsEvent::Respawned]);
    }
}
