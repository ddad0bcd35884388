//! Axis-separated collision resolution for the single actor.
//!
//! Horizontal pass, vertical pass, a bounded depenetration sweep for whatever overlap is left,
//! then world bounds. All per-variant contact policy lives in this file.

use tracing::trace;

use super::actor::Actor;
use super::events::{EventQueue, PhysicsEvent};
use super::geometry::PushOut;
use super::terrain::{Terrain, TerrainId, TerrainKind, TerrainTag};
use super::tuning::PhysicsTuning;

const DEPENETRATION_PASSES: usize = 4;
const DEPENETRATION_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CollisionOutcome {
    pub out_of_bounds: bool,
}

#[derive(Debug, Clone, Copy)]
struct Landing {
    terrain: TerrainId,
    tag: TerrainTag,
    surface_y: f32,
}

pub(crate) fn resolve(
    actor: &mut Actor,
    terrain: &[Terrain],
    bounds: WorldBounds,
    tuning: &PhysicsTuning,
    step_scale: f32,
    events: &mut EventQueue,
) -> CollisionOutcome {
    let was_grounded = actor.grounded;
    let riding = actor.standing_on.filter(|_| was_grounded);
    resolve_horizontal(actor, terrain, tuning, step_scale);
    let landed = resolve_vertical(actor, terrain, tuning, step_scale, riding, events);
    depenetrate(actor, terrain, tuning, landed, was_grounded, events);
    clamp_to_world(actor, bounds)
}

fn id_of(index: usize) -> TerrainId {
    TerrainId(index as u32)
}

fn resolve_horizontal(
    actor: &mut Actor,
    terrain: &[Terrain],
    tuning: &PhysicsTuning,
    step_scale: f32,
) {
    let before = actor.rect();
    actor.position.x += actor.velocity.x * step_scale;

    for piece in terrain.iter().filter(|piece| piece.blocks_horizontally()) {
        let rect = actor.rect();
        // Overlap that predates this move is left to depenetration.
        if before.overlaps(&piece.rect) || !rect.overlaps(&piece.rect) {
            continue;
        }
        let push_left = rect.center().x < piece.rect.center().x;
        actor.position.x = if push_left {
            piece.rect.left() - actor.size.x
        } else {
            piece.rect.right()
        };

        let mut vx = (piece.velocity_x(step_scale) - actor.velocity.x) * tuning.wall_damping;
        if vx.abs() < tuning.wall_min_kick {
            vx = if push_left {
                -tuning.wall_min_kick
            } else {
                tuning.wall_min_kick
            };
        }
        actor.velocity.x = vx;
    }
}

/// Returns whether a supporting surface was found this step.
///
/// `riding` is the piece the actor stood on when the step began. A slope keeps an actor that was
/// riding it snapped to its surface for as long as the actor's center stays over the span, even
/// when the surface drops away faster than the actor falls.
fn resolve_vertical(
    actor: &mut Actor,
    terrain: &[Terrain],
    tuning: &PhysicsTuning,
    step_scale: f32,
    riding: Option<TerrainId>,
    events: &mut EventQueue,
) -> bool {
    let prev_feet = actor.rect().bottom();
    let prev_head = actor.rect().top();
    let vy = actor.velocity.y;
    actor.position.y += vy * step_scale;

    let rect = actor.rect();
    let center_x = rect.center().x;
    let mut landing: Option<Landing> = None;
    let mut ceiling: Option<f32> = None;

    let mut offer = |candidate: Landing| {
        if landing.map_or(true, |best| candidate.surface_y < best.surface_y) {
            landing = Some(candidate);
        }
    };

    for (index, piece) in terrain.iter().enumerate() {
        if !piece.is_solid() {
            continue;
        }
        let tag = piece.tag();
        match piece.kind {
            TerrainKind::SlopeLeft | TerrainKind::SlopeRight => {
                if vy < 0.0 || center_x < piece.rect.left() || center_x > piece.rect.right() {
                    continue;
                }
                let Some(surface_y) = piece.slope_surface_y(center_x) else {
                    continue;
                };
                let still_riding = riding == Some(id_of(index));
                if still_riding
                    || (rect.bottom() >= surface_y
                        && prev_feet <= surface_y + tuning.slope_snap_tolerance)
                {
                    offer(Landing {
                        terrain: id_of(index),
                        tag,
                        surface_y,
                    });
                }
            }
            TerrainKind::OneDirectional => {
                if vy > 0.0
                    && rect.overlaps(&piece.rect)
                    && prev_feet <= piece.rect.top() + tuning.one_way_tolerance
                {
                    offer(Landing {
                        terrain: id_of(index),
                        tag,
                        surface_y: piece.rect.top(),
                    });
                }
            }
            _ => {
                if !rect.overlaps(&piece.rect) {
                    continue;
                }
                if vy >= 0.0 && prev_feet <= piece.rect.top() + tuning.contact_tolerance {
                    offer(Landing {
                        terrain: id_of(index),
                        tag,
                        surface_y: piece.rect.top(),
                    });
                } else if vy < 0.0 && prev_head >= piece.rect.bottom() - tuning.contact_tolerance
                {
                    let bottom = piece.rect.bottom();
                    ceiling = Some(ceiling.map_or(bottom, |current: f32| current.max(bottom)));
                }
            }
        }
    }

    let Some(landing) = landing else {
        if let Some(bottom) = ceiling {
            actor.position.y = bottom;
            actor.velocity.y = 0.0;
            trace!(y = bottom, "actor_ceiling_bump");
        }
        actor.set_airborne();
        return false;
    };

    apply_landing(actor, terrain, landing, tuning, riding.is_some(), events)
}

/// Snaps the actor onto `landing` and applies the piece's contact policy.
///
/// Returns `false` when the contact launched the actor instead of supporting it.
fn apply_landing(
    actor: &mut Actor,
    terrain: &[Terrain],
    landing: Landing,
    tuning: &PhysicsTuning,
    was_grounded: bool,
    events: &mut EventQueue,
) -> bool {
    actor.position.y = landing.surface_y - actor.size.y;
    match landing.tag {
        TerrainTag::Bouncy => {
            actor.velocity.y = -tuning.bounce_impulse;
            actor.set_airborne();
            actor.last_support_y = landing.surface_y;
            events.push(PhysicsEvent::Bounced {
                terrain: landing.terrain,
            });
            return false;
        }
        TerrainTag::SlopeLeft | TerrainTag::SlopeRight => {
            actor.velocity.y = tuning.slope_stick_speed;
            let direction = terrain
                .get(landing.terrain.index())
                .map_or(0.0, Terrain::slope_slide_direction);
            actor.velocity.x = direction * tuning.slope_slide_speed;
        }
        _ => actor.velocity.y = 0.0,
    }
    actor.set_supported(landing.terrain, landing.tag, landing.surface_y);
    if !was_grounded {
        trace!(
            terrain = landing.terrain.0,
            surface = landing.tag.label(),
            "actor_landed"
        );
        events.push(PhysicsEvent::Landed {
            terrain: landing.terrain,
            surface: landing.tag,
        });
    }
    true
}

/// Smallest-overlap push-out against any blocking piece still overlapping the actor.
///
/// An upward push counts as a landing on that piece unless the vertical pass already found one.
fn depenetrate(
    actor: &mut Actor,
    terrain: &[Terrain],
    tuning: &PhysicsTuning,
    mut supported: bool,
    was_grounded: bool,
    events: &mut EventQueue,
) {
    for _ in 0..DEPENETRATION_PASSES {
        let mut moved = false;
        for (index, piece) in terrain.iter().enumerate() {
            if !piece.blocks_horizontally() {
                continue;
            }
            let Some(penetration) = actor.rect().penetration(&piece.rect) else {
                continue;
            };
            if penetration.depth() <= DEPENETRATION_EPSILON {
                continue;
            }
            moved = true;
            let (direction, depth) = penetration.smallest();
            match direction {
                PushOut::Up => {
                    actor.position.y -= depth;
                    if actor.velocity.y > 0.0 {
                        actor.velocity.y = 0.0;
                    }
                    if !supported {
                        let landing = Landing {
                            terrain: id_of(index),
                            tag: piece.tag(),
                            surface_y: piece.rect.top(),
                        };
                        supported =
                            apply_landing(actor, terrain, landing, tuning, was_grounded, events);
                    }
                }
                PushOut::Down => {
                    actor.position.y += depth;
                    if actor.velocity.y < 0.0 {
                        actor.velocity.y = 0.0;
                    }
                }
                PushOut::Left => {
                    actor.position.x -= depth;
                    actor.velocity.x = actor.velocity.x.min(0.0);
                }
                PushOut::Right => {
                    actor.position.x += depth;
                    actor.velocity.x = actor.velocity.x.max(0.0);
                }
            }
            trace!(terrain = index, ?direction, depth, "actor_depenetrated");
        }
        if !moved {
            break;
        }
    }
}

fn clamp_to_world(actor: &mut Actor, bounds: WorldBounds) -> CollisionOutcome {
    let max_x = (bounds.width - actor.size.x).max(0.0);
    if actor.position.x < 0.0 {
        actor.position.x = 0.0;
        actor.velocity.x = 0.0;
    } else if actor.position.x > max_x {
        actor.position.x = max_x;
        actor.velocity.x = 0.0;
    }
    CollisionOutcome {
        out_of_bounds: actor.position.y > bounds.height,
    }
}
