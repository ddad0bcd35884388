use std::time::Duration;

use tracing::{debug, info, warn};

use super::actor::{Actor, Facing, LifeState};
use super::camera::Camera;
use super::clock::{normalize_non_zero_duration, FixedStepClock};
use super::collision::{self, WorldBounds};
use super::events::{EventQueue, EventSink, PhysicsEvent, Zone};
use super::geometry::{Rect, Vec2};
use super::input::{InputSnapshot, InputSource};
use super::terrain::{
    ConcealMode, Terrain, TerrainId, TerrainKind, TerrainStepContext, TerrainTag,
    TerrainTransition,
};
use super::tuning::PhysicsTuning;
use super::world::LevelData;

/// Rounds up so whole-second timers land on whole step counts.
pub const fn fixed_step_for_rate(steps_per_second: u32) -> Duration {
    let hz = if steps_per_second == 0 {
        1
    } else {
        steps_per_second as u64
    };
    Duration::from_nanos((1_000_000_000 + hz - 1) / hz)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub fixed_step: Duration,
    /// Step length the tuning constants are expressed in.
    pub reference_step: Duration,
    pub max_frame_delta: Duration,
    pub max_steps_per_advance: u32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_step: fixed_step_for_rate(60),
            reference_step: fixed_step_for_rate(60),
            max_frame_delta: Duration::from_millis(250),
            max_steps_per_advance: 16,
            viewport_width: 1280.0,
            viewport_height: 720.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub steps_run: u32,
    /// The frame delta exceeded the maximum and was cut down.
    pub clamped: bool,
    pub dropped_backlog: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerrainVisual {
    Solid,
    /// Collapsible piece counting down; `progress` runs from 0 to 1.
    Armed { progress: f32 },
    Collapsed,
    Hidden,
    /// Drawn like a platform but never solid.
    Phantom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainView {
    pub id: TerrainId,
    pub rect: Rect,
    pub tag: TerrainTag,
    pub visual: TerrainVisual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorView {
    pub rect: Rect,
    pub facing: Facing,
    pub grounded: bool,
    pub life: LifeState,
    pub jump_charge: f32,
    /// Charge as a fraction of the maximum, for the charge bar.
    pub charge_fraction: f32,
}

/// Read-only snapshot handed to presentation code.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderView {
    pub step: u64,
    /// Camera as of the end of the step; converts the world-space rects for drawing.
    pub camera: Camera,
    pub world_width: f32,
    pub world_height: f32,
    pub actor: ActorView,
    pub terrain: Vec<TerrainView>,
}

#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    tuning: PhysicsTuning,
    level: LevelData,
    terrain: Vec<Terrain>,
    actor: Actor,
    camera: Camera,
    clock: FixedStepClock,
    step_scale: f32,
    events: EventQueue,
    step_index: u64,
    deaths: u32,
}

impl Simulator {
    pub fn new(level: LevelData, tuning: PhysicsTuning, config: SimConfig) -> Self {
        let level = if level.is_usable() {
            level
        } else {
            warn!(
                world_width = level.world_width,
                world_height = level.world_height,
                terrain_count = level.terrain.len(),
                "level_unusable_using_fallback"
            );
            LevelData::fallback()
        };
        let fixed_step =
            normalize_non_zero_duration(config.fixed_step, SimConfig::default().fixed_step);
        let reference_step = normalize_non_zero_duration(
            config.reference_step,
            SimConfig::default().reference_step,
        );
        let max_frame_delta =
            normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
        let clock = FixedStepClock::new(fixed_step, max_frame_delta, config.max_steps_per_advance);
        let step_scale = fixed_step.as_secs_f32() / reference_step.as_secs_f32();
        let actor = Actor::new(level.spawn, &tuning);
        let mut camera = Camera::new(
            level.world_width,
            level.world_height,
            config.viewport_width,
            config.viewport_height,
            tuning.camera_smoothing,
        );
        camera.snap_to(&actor.rect());

        info!(
            world_width = level.world_width,
            world_height = level.world_height,
            terrain_count = level.terrain.len(),
            spawn_x = level.spawn.x,
            spawn_y = level.spawn.y,
            fixed_step_us = fixed_step.as_micros() as u64,
            step_scale,
            "simulator_ready"
        );

        Self {
            config: SimConfig {
                fixed_step,
                reference_step,
                max_frame_delta,
                ..config
            },
            terrain: level.terrain.clone(),
            level,
            tuning,
            actor,
            camera,
            clock,
            step_scale,
            events: EventQueue::default(),
            step_index: 0,
            deaths: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tuning(&self) -> &PhysicsTuning {
        &self.tuning
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn terrain(&self) -> &[Terrain] {
        &self.terrain
    }

    pub fn terrain_piece(&self, id: TerrainId) -> Option<&Terrain> {
        self.terrain.get(id.index())
    }

    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn deaths(&self) -> u32 {
        self.deaths
    }

    pub fn fixed_step(&self) -> Duration {
        self.clock.fixed_step()
    }

    pub fn step_scale(&self) -> f32 {
        self.step_scale
    }

    /// Feeds one wall-clock frame delta and runs every fixed step it pays for.
    pub fn advance<I, S>(
        &mut self,
        frame_dt: Duration,
        input: &mut I,
        sink: &mut S,
    ) -> AdvanceReport
    where
        I: InputSource + ?Sized,
        S: EventSink + ?Sized,
    {
        let tick = self.clock.tick(frame_dt);
        if tick.clamped {
            debug!(
                frame_dt_ms = frame_dt.as_millis() as u64,
                max_frame_delta_ms = self.config.max_frame_delta.as_millis() as u64,
                "frame_delta_clamped"
            );
        }
        for _ in 0..tick.steps_to_run {
            let snapshot = input.snapshot_for_step();
            self.step(&snapshot, sink);
        }
        if tick.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = tick.dropped_backlog.as_millis() as u64,
                max_steps_per_advance = self.config.max_steps_per_advance,
                "sim_clamp_triggered"
            );
        }
        AdvanceReport {
            steps_run: tick.steps_to_run,
            clamped: tick.clamped,
            dropped_backlog: tick.dropped_backlog,
        }
    }

    /// Runs exactly one fixed step with the given input, bypassing the accumulator.
    pub fn step<S: EventSink + ?Sized>(&mut self, input: &InputSnapshot, sink: &mut S) {
        self.step_index = self.step_index.saturating_add(1);
        let step = self.clock.fixed_step();

        self.validate_support();
        self.update_terrain(step);

        let frozen = self.actor.tick_life(step, &self.tuning, &mut self.events);
        if !frozen {
            let carry = self
                .actor
                .standing_on
                .and_then(|id| self.terrain_piece(id))
                .map_or(0.0, Terrain::carry_displacement);
            self.actor.carry(carry);
            self.actor
                .integrate(input, &self.tuning, self.step_scale, &mut self.events);
            let outcome = collision::resolve(
                &mut self.actor,
                &self.terrain,
                WorldBounds {
                    width: self.level.world_width,
                    height: self.level.world_height,
                },
                &self.tuning,
                self.step_scale,
                &mut self.events,
            );
            if outcome.out_of_bounds {
                self.kill_actor();
            }
        }

        self.camera.follow(&self.actor.rect());
        sink.receive(self.step_index, self.events.as_slice());
        self.events.clear();
    }

    /// Rebuilds terrain, actor, and camera from the loaded level. Step counter restarts at 0.
    pub fn reset(&mut self) {
        self.terrain = self.level.terrain.clone();
        self.actor = Actor::new(self.level.spawn, &self.tuning);
        self.camera = Camera::new(
            self.level.world_width,
            self.level.world_height,
            self.config.viewport_width,
            self.config.viewport_height,
            self.tuning.camera_smoothing,
        );
        self.camera.snap_to(&self.actor.rect());
        self.clock.reset();
        self.events.clear();
        self.step_index = 0;
        self.deaths = 0;
        info!(terrain_count = self.terrain.len(), "simulator_reset");
    }

    pub fn load_level(&mut self, level: LevelData) {
        self.level = if level.is_usable() {
            level
        } else {
            warn!("level_unusable_using_fallback");
            LevelData::fallback()
        };
        self.reset();
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self.camera.set_viewport(width, height);
    }

    /// Terrain pieces that intersect the camera viewport, in arena order.
    pub fn visible_terrain(&self) -> impl Iterator<Item = TerrainView> + '_ {
        self.terrain
            .iter()
            .enumerate()
            .filter(|(_, piece)| self.camera.is_visible(&piece.rect))
            .map(|(index, piece)| TerrainView {
                id: TerrainId(index as u32),
                rect: piece.rect,
                tag: piece.tag(),
                visual: self.visual_for(piece),
            })
    }

    pub fn render_view(&self) -> RenderView {
        let charge_fraction = if self.tuning.max_jump_charge > 0.0 {
            (self.actor.jump_charge / self.tuning.max_jump_charge).clamp(0.0, 1.0)
        } else {
            0.0
        };
        RenderView {
            step: self.step_index,
            camera: self.camera,
            world_width: self.level.world_width,
            world_height: self.level.world_height,
            actor: ActorView {
                rect: self.actor.rect(),
                facing: self.actor.facing,
                grounded: self.actor.grounded,
                life: self.actor.life,
                jump_charge: self.actor.jump_charge,
                charge_fraction,
            },
            terrain: self.visible_terrain().collect(),
        }
    }

    fn visual_for(&self, piece: &Terrain) -> TerrainVisual {
        match piece.kind {
            TerrainKind::Collapsible(state) if state.collapsed => TerrainVisual::Collapsed,
            TerrainKind::Collapsible(state) if state.armed => {
                let delay = self.tuning.collapse_delay().as_secs_f32();
                let progress = if delay > 0.0 {
                    (state.collapse_timer.as_secs_f32() / delay).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                TerrainVisual::Armed { progress }
            }
            TerrainKind::Concealed(conceal) if conceal.mode == ConcealMode::Phantom => {
                TerrainVisual::Phantom
            }
            TerrainKind::Concealed(conceal) if !conceal.solid => TerrainVisual::Hidden,
            _ => TerrainVisual::Solid,
        }
    }

    /// Drops a support handle that no longer names a solid piece.
    fn validate_support(&mut self) {
        let Some(id) = self.actor.standing_on else {
            return;
        };
        let still_solid = self.terrain_piece(id).is_some_and(Terrain::is_solid);
        if !still_solid || !self.actor.grounded {
            debug!(terrain = id.0, "support_handle_invalidated");
            self.actor.set_airborne();
        }
    }

    fn update_terrain(&mut self, step: Duration) {
        let ctx = TerrainStepContext {
            step,
            step_scale: self.step_scale,
            actor_standing_on: self.actor.standing_on,
            collapse_delay: self.tuning.collapse_delay(),
            collapse_respawn: self.tuning.collapse_respawn(),
        };
        for (index, piece) in self.terrain.iter_mut().enumerate() {
            let id = TerrainId(index as u32);
            let Some(transition) = piece.update(id, &ctx) else {
                continue;
            };
            let event = match transition {
                TerrainTransition::Collapsed => PhysicsEvent::TerrainCollapsed { terrain: id },
                TerrainTransition::Restored => PhysicsEvent::TerrainRestored { terrain: id },
                TerrainTransition::Hidden => PhysicsEvent::TerrainHidden { terrain: id },
                TerrainTransition::Revealed => PhysicsEvent::TerrainRevealed { terrain: id },
            };
            debug!(
                terrain = id.0,
                event = event.name(),
                step = self.step_index,
                "terrain_transition"
            );
            self.events.push(event);

            let lost_support =
                matches!(transition, TerrainTransition::Collapsed | TerrainTransition::Hidden);
            if lost_support && self.actor.standing_on == Some(id) {
                self.actor.set_airborne();
                self.actor.position.y += self.tuning.collapse_nudge;
            }
        }
    }

    fn kill_actor(&mut self) {
        let zone = Zone::classify(self.actor.last_support_y, self.level.world_height);
        self.deaths = self.deaths.saturating_add(1);
        self.actor.begin_dying(&self.tuning);
        self.events.push(PhysicsEvent::Fell { zone });
        self.events.push(PhysicsEvent::Died);
        debug!(
            zone = zone.label(),
            deaths = self.deaths,
            step = self.step_index,
            "actor_died"
        );
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::sim::events::StampedEvent;
    use crate::sim::input::{InputAction, ScriptedInput};
    use crate::sim::terrain::{CollapseState, Concealment, Oscillation};

    const STEP: Duration = fixed_step_for_rate(60);

    fn level(terrain: Vec<Terrain>, spawn: Vec2) -> LevelData {
        LevelData {
            world_width: 2000.0,
            world_height: 1000.0,
            spawn,
            terrain,
            source_sha256_hex: None,
        }
    }

    fn sim(terrain: Vec<Terrain>, spawn: Vec2) -> Simulator {
        Simulator::new(
            level(terrain, spawn),
            PhysicsTuning::default(),
            SimConfig::default(),
        )
    }

    fn ground() -> Terrain {
        Terrain::new(Rect::new(0.0, 800.0, 2000.0, 40.0), TerrainKind::Static)
    }

    fn idle(sim: &mut Simulator, steps: usize, sink: &mut Vec<StampedEvent>) {
        for _ in 0..steps {
            sim.step(&InputSnapshot::empty(), sink);
        }
    }

    fn events_named(sink: &[StampedEvent], name: &str) -> Vec<u64> {
        sink.iter()
            .filter(|stamped| stamped.event.name() == name)
            .map(|stamped| stamped.step)
            .collect()
    }

    #[test]
    fn fixed_step_for_sixty_hertz_rounds_up() {
        assert_eq!(fixed_step_for_rate(60), Duration::from_nanos(16_666_667));
        assert_eq!(fixed_step_for_rate(0), Duration::from_secs(1));
    }

    #[test]
    fn falling_actor_lands_and_settles() {
        let mut sim = sim(vec![ground()], Vec2::new(100.0, 700.0));
        let mut sink = Vec::new();
        idle(&mut sim, 60, &mut sink);
        let actor = sim.actor();
        assert!(actor.grounded);
        assert_eq!(actor.standing_on, Some(TerrainId(0)));
        assert_eq!(actor.rect().bottom(), 800.0);
        assert_eq!(events_named(&sink, "landed").len(), 1);
    }

    #[test]
    fn split_advance_matches_single_advance() {
        let held = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        let mut whole = sim(vec![ground()], Vec2::new(100.0, 700.0));
        let mut split = sim(vec![ground()], Vec2::new(100.0, 700.0));
        let mut whole_input = ScriptedInput::holding(held);
        let mut split_input = ScriptedInput::holding(held);

        let report = whole.advance(STEP * 3, &mut whole_input, &mut ());
        let split_steps: u32 = (0..3)
            .map(|_| split.advance(STEP, &mut split_input, &mut ()).steps_run)
            .sum();

        assert_eq!(report.steps_run, 3);
        assert_eq!(split_steps, 3);
        assert_eq!(whole.actor(), split.actor());
        assert_eq!(whole.step_index(), 3);
    }

    #[test]
    fn long_frame_is_clamped_and_backlog_dropped() {
        let mut sim = Simulator::new(
            level(vec![ground()], Vec2::new(100.0, 700.0)),
            PhysicsTuning::default(),
            SimConfig {
                max_steps_per_advance: 4,
                ..SimConfig::default()
            },
        );
        let report = sim.advance(Duration::from_secs(3), &mut ScriptedInput::default(), &mut ());
        assert!(report.clamped);
        assert_eq!(report.steps_run, 4);
        assert!(report.dropped_backlog > Duration::ZERO);
    }

    #[test]
    fn collapsible_platform_collapses_after_delay_and_restores() {
        let platform = Terrain::new(
            Rect::new(0.0, 800.0, 400.0, 20.0),
            TerrainKind::Collapsible(CollapseState::default()),
        );
        let mut sim = sim(vec![platform], Vec2::new(100.0, 770.0));
        let mut sink = Vec::new();
        idle(&mut sim, 300, &mut sink);

        let landed = events_named(&sink, "landed");
        let collapsed = events_named(&sink, "terrain_collapsed");
        let restored = events_named(&sink, "terrain_restored");
        assert_eq!(landed.first(), Some(&1));
        assert_eq!(collapsed.first(), Some(&(1 + 90)));
        assert_eq!(restored.first(), Some(&(1 + 90 + 60)));
    }

    #[test]
    fn collapse_under_actor_drops_it() {
        let platform = Terrain::new(
            Rect::new(0.0, 800.0, 400.0, 20.0),
            TerrainKind::Collapsible(CollapseState::default()),
        );
        let mut sim = sim(vec![platform], Vec2::new(100.0, 770.0));
        let mut sink = Vec::new();
        idle(&mut sim, 91, &mut sink);
        assert!(!sim.actor().grounded);
        assert_eq!(sim.actor().standing_on, None);
        assert!(sim.actor().position.y > 770.0);
    }

    #[test]
    fn trapdoor_hides_once_stood_on() {
        let trapdoor = Terrain::new(
            Rect::new(0.0, 800.0, 400.0, 20.0),
            TerrainKind::Concealed(Concealment::new(ConcealMode::Trapdoor)),
        );
        let mut sim = sim(vec![trapdoor], Vec2::new(100.0, 770.0));
        let mut sink = Vec::new();
        idle(&mut sim, 3, &mut sink);
        assert_eq!(events_named(&sink, "terrain_hidden"), vec![2]);
        assert!(!sim.actor().grounded);
    }

    #[test]
    fn oscillating_platform_carries_resting_actor() {
        let platform = Terrain::new(
            Rect::new(100.0, 800.0, 200.0, 20.0),
            TerrainKind::Oscillating(Oscillation::new(100.0, 300.0, 2.0)),
        );
        let mut sim = sim(vec![platform], Vec2::new(150.0, 770.0));
        let mut sink = Vec::new();
        idle(&mut sim, 1, &mut sink);
        let start_offset = sim.actor().position.x - sim.terrain()[0].rect.x;
        idle(&mut sim, 30, &mut sink);
        let offset = sim.actor().position.x - sim.terrain()[0].rect.x;
        assert!(sim.actor().grounded);
        assert!((offset - start_offset).abs() < 1e-3);
        assert!(sim.terrain()[0].rect.x > 150.0);
    }

    #[test]
    fn falling_out_dies_then_respawns_at_spawn() {
        let spawn = Vec2::new(100.0, 700.0);
        let mut sim = sim(vec![ground()], spawn);
        let mut sink = Vec::new();
        idle(&mut sim, 10, &mut sink);
        sim.actor.position = Vec2::new(1500.0, 1001.0);
        sim.actor.velocity = Vec2::new(2.0, 5.0);
        sim.actor.set_airborne();
        sink.clear();

        idle(&mut sim, 1, &mut sink);
        assert!(sim.actor().is_dying());
        let names: Vec<&str> = sink.iter().map(|stamped| stamped.event.name()).collect();
        assert_eq!(names, vec!["fell", "died"]);
        assert!(matches!(
            sink[0].event,
            PhysicsEvent::Fell { zone: Zone::Bottom }
        ));
        let frozen_at = sim.actor().position;
        idle(&mut sim, 30, &mut sink);
        assert_eq!(sim.actor().position, frozen_at);

        idle(&mut sim, 30, &mut sink);
        assert_eq!(sim.actor().position, spawn);
        assert_eq!(sim.actor().velocity, Vec2::ZERO);
        assert_eq!(sim.actor().jump_charge, 0.0);
        assert!(sim.actor().is_respawning());
        assert_eq!(events_named(&sink, "respawned").len(), 1);
        assert_eq!(sim.deaths(), 1);
    }

    #[test]
    fn charged_jump_from_ground_emits_jumped() {
        let mut sim = sim(vec![ground()], Vec2::new(100.0, 770.0));
        let mut sink = Vec::new();
        idle(&mut sim, 2, &mut sink);
        let hold = InputSnapshot::empty().with_action_down(InputAction::JumpHold, true);
        for _ in 0..20 {
            sim.step(&hold, &mut sink);
        }
        sim.step(&InputSnapshot::empty().with_jump_released(true), &mut sink);
        let jumped = sink
            .iter()
            .find_map(|stamped| match stamped.event {
                PhysicsEvent::Jumped { power } => Some(power),
                _ => None,
            })
            .expect("jumped event");
        assert!((jumped - 9.0).abs() < 1e-3);
        assert!(sim.actor().velocity.y < 0.0);
        assert!(!sim.actor().grounded);
    }

    #[test]
    fn render_view_culls_offscreen_terrain_and_reports_phantoms() {
        let terrain = vec![
            ground(),
            Terrain::new(
                Rect::new(300.0, 750.0, 100.0, 20.0),
                TerrainKind::Concealed(Concealment::new(ConcealMode::Phantom)),
            ),
        ];
        let mut sim = Simulator::new(
            LevelData {
                world_width: 10_000.0,
                world_height: 1000.0,
                spawn: Vec2::new(9000.0, 700.0),
                terrain,
                source_sha256_hex: None,
            },
            PhysicsTuning::default(),
            SimConfig::default(),
        );
        let view = sim.render_view();
        assert_eq!(view.terrain.len(), 0);

        sim.load_level(level(
            vec![
                ground(),
                Terrain::new(
                    Rect::new(300.0, 750.0, 100.0, 20.0),
                    TerrainKind::Concealed(Concealment::new(ConcealMode::Phantom)),
                ),
            ],
            Vec2::new(300.0, 700.0),
        ));
        let view = sim.render_view();
        assert_eq!(view.terrain.len(), 2);
        assert_eq!(view.terrain[1].visual, TerrainVisual::Phantom);
    }

    #[test]
    fn unusable_level_falls_back_to_safety_platform() {
        let sim = Simulator::new(
            LevelData {
                world_width: f32::NAN,
                world_height: 0.0,
                spawn: Vec2::ZERO,
                terrain: Vec::new(),
                source_sha256_hex: None,
            },
            PhysicsTuning::default(),
            SimConfig::default(),
        );
        assert_eq!(sim.level(), &LevelData::fallback());
    }

    proptest! {
        #[test]
        fn splitting_an_interval_never_changes_the_outcome(
            parts in proptest::collection::vec(1u32..4, 1..5),
            move_right in any::<bool>(),
        ) {
            let total: u32 = parts.iter().sum();
            let held = InputSnapshot::empty()
                .with_action_down(InputAction::MoveRight, move_right)
                .with_action_down(InputAction::MoveLeft, !move_right);
            let mut whole = sim(vec![ground()], Vec2::new(500.0, 600.0));
            let mut split = sim(vec![ground()], Vec2::new(500.0, 600.0));

            let mut whole_input = ScriptedInput::holding(held);
            let whole_report = whole.advance(STEP * total, &mut whole_input, &mut ());
            let mut split_input = ScriptedInput::holding(held);
            let mut split_steps = 0;
            for part in &parts {
                split_steps += split.advance(STEP * *part, &mut split_input, &mut ()).steps_run;
            }
            prop_assert_eq!(whole_report.steps_run, total);
            prop_assert_eq!(split_steps, total);
            prop_assert_eq!(whole.actor(), split.actor());
        }
    }
}
