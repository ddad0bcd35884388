use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// Handle into the terrain arena. Stable for the lifetime of a loaded level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerrainId(pub u32);

impl TerrainId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fieldless variant tag, mirrored onto the actor as its surface type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainTag {
    Static,
    Oscillating,
    Collapsible,
    Bouncy,
    LowFriction,
    OneDirectional,
    Concealed,
    SlopeLeft,
    SlopeRight,
}

impl TerrainTag {
    /// Resolves level-file class names, both the map editor names and the Rust-side names.
    pub fn from_level_name(name: &str) -> Option<Self> {
        let tag = match name.trim() {
            "normal" | "static" => TerrainTag::Static,
            "moving" | "oscillating" => TerrainTag::Oscillating,
            "broken" | "collapsible" => TerrainTag::Collapsible,
            "bouncy" => TerrainTag::Bouncy,
            "ice" | "lowFriction" | "low_friction" => TerrainTag::LowFriction,
            "oneWay" | "oneDirectional" | "one_directional" => TerrainTag::OneDirectional,
            "fake" | "concealed" => TerrainTag::Concealed,
            "slopeLeft" | "slope_left" => TerrainTag::SlopeLeft,
            "slopeRight" | "slope_right" => TerrainTag::SlopeRight,
            _ => return None,
        };
        Some(tag)
    }

    pub fn label(self) -> &'static str {
        match self {
            TerrainTag::Static => "static",
            TerrainTag::Oscillating => "oscillating",
            TerrainTag::Collapsible => "collapsible",
            TerrainTag::Bouncy => "bouncy",
            TerrainTag::LowFriction => "low_friction",
            TerrainTag::OneDirectional => "one_directional",
            TerrainTag::Concealed => "concealed",
            TerrainTag::SlopeLeft => "slope_left",
            TerrainTag::SlopeRight => "slope_right",
        }
    }

    pub fn is_slope(self) -> bool {
        matches!(self, TerrainTag::SlopeLeft | TerrainTag::SlopeRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillation {
    pub origin_x: f32,
    pub range: f32,
    pub speed: f32,
    pub direction: f32,
    /// Horizontal displacement applied during the most recent step.
    pub last_displacement: f32,
}

impl Oscillation {
    pub fn new(origin_x: f32, range: f32, speed: f32) -> Self {
        Self {
            origin_x,
            range: range.abs(),
            speed,
            direction: 1.0,
            last_displacement: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseState {
    pub collapsed: bool,
    pub armed: bool,
    pub collapse_timer: Duration,
    pub respawn_timer: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcealMode {
    /// Looks like a platform, never holds the actor.
    Phantom,
    /// Alternates solid and hidden on a fixed interval regardless of contact.
    Periodic { interval: Duration },
    /// Vanishes as soon as the actor stands on it, returns after the respawn delay.
    Trapdoor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concealment {
    pub mode: ConcealMode,
    pub solid: bool,
    pub timer: Duration,
}

impl Concealment {
    pub fn new(mode: ConcealMode) -> Self {
        Self {
            mode,
            solid: !matches!(mode, ConcealMode::Phantom),
            timer: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerrainKind {
    Static,
    Oscillating(Oscillation),
    Collapsible(CollapseState),
    Bouncy,
    LowFriction,
    OneDirectional,
    Concealed(Concealment),
    SlopeLeft,
    SlopeRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainTransition {
    Collapsed,
    Restored,
    Hidden,
    Revealed,
}

/// What a terrain piece may observe while advancing its own state.
#[derive(Debug, Clone, Copy)]
pub struct TerrainStepContext {
    pub step: Duration,
    pub step_scale: f32,
    pub actor_standing_on: Option<TerrainId>,
    pub collapse_delay: Duration,
    pub collapse_respawn: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terrain {
    pub rect: Rect,
    pub kind: TerrainKind,
}

impl Terrain {
    pub fn new(rect: Rect, kind: TerrainKind) -> Self {
        Self { rect, kind }
    }

    pub fn tag(&self) -> TerrainTag {
        match self.kind {
            TerrainKind::Static => TerrainTag::Static,
            TerrainKind::Oscillating(_) => TerrainTag::Oscillating,
            TerrainKind::Collapsible(_) => TerrainTag::Collapsible,
            TerrainKind::Bouncy => TerrainTag::Bouncy,
            TerrainKind::LowFriction => TerrainTag::LowFriction,
            TerrainKind::OneDirectional => TerrainTag::OneDirectional,
            TerrainKind::Concealed(_) => TerrainTag::Concealed,
            TerrainKind::SlopeLeft => TerrainTag::SlopeLeft,
            TerrainKind::SlopeRight => TerrainTag::SlopeRight,
        }
    }

    /// Whether the piece takes part in any collision test this step.
    pub fn is_solid(&self) -> bool {
        match self.kind {
            TerrainKind::Collapsible(state) => !state.collapsed,
            TerrainKind::Concealed(conceal) => conceal.solid,
            _ => true,
        }
    }

    /// Solid pieces that also stop sideways motion. One-way and sloped pieces never do.
    pub fn blocks_horizontally(&self) -> bool {
        self.is_solid()
            && !matches!(
                self.kind,
                TerrainKind::OneDirectional | TerrainKind::SlopeLeft | TerrainKind::SlopeRight
            )
    }

    /// Horizontal velocity in reference-step units.
    pub fn velocity_x(&self, step_scale: f32) -> f32 {
        match self.kind {
            TerrainKind::Oscillating(osc) if step_scale > 0.0 => osc.last_displacement / step_scale,
            _ => 0.0,
        }
    }

    /// Displacement to carry a resting actor along with this piece.
    pub fn carry_displacement(&self) -> f32 {
        match self.kind {
            TerrainKind::Oscillating(osc) => osc.last_displacement,
            _ => 0.0,
        }
    }

    /// Surface height of a slope under world x, clamped to the piece's span.
    ///
    /// `SlopeLeft` is low at its left edge and high at its right edge; `SlopeRight` mirrors it.
    pub fn slope_surface_y(&self, world_x: f32) -> Option<f32> {
        let t = if self.rect.w > 0.0 {
            ((world_x - self.rect.x) / self.rect.w).clamp(0.0, 1.0)
        } else {
            0.5
        };
        match self.kind {
            TerrainKind::SlopeLeft => Some(self.rect.y + (1.0 - t) * self.rect.h),
            TerrainKind::SlopeRight => Some(self.rect.y + t * self.rect.h),
            _ => None,
        }
    }

    /// Sideways velocity a slope imposes, directed toward its low side.
    pub fn slope_slide_direction(&self) -> f32 {
        match self.kind {
            TerrainKind::SlopeLeft => -1.0,
            TerrainKind::SlopeRight => 1.0,
            _ => 0.0,
        }
    }

    pub fn update(&mut self, id: TerrainId, ctx: &TerrainStepContext) -> Option<TerrainTransition> {
        match &mut self.kind {
            TerrainKind::Oscillating(osc) => {
                let before = self.rect.x;
                let mut next = before + osc.speed * osc.direction * ctx.step_scale;
                let min_x = osc.origin_x - osc.range;
                let max_x = osc.origin_x + osc.range;
                if next >= max_x {
                    next = max_x;
                    osc.direction = -1.0;
                } else if next <= min_x {
                    next = min_x;
                    osc.direction = 1.0;
                }
                self.rect.x = next;
                osc.last_displacement = next - before;
                None
            }
            TerrainKind::Collapsible(state) => {
                if state.collapsed {
                    state.respawn_timer += ctx.step;
                    if state.respawn_timer >= ctx.collapse_respawn {
                        *state = CollapseState::default();
                        return Some(TerrainTransition::Restored);
                    }
                    return None;
                }
                if !state.armed && ctx.actor_standing_on == Some(id) {
                    state.armed = true;
                }
                if state.armed {
                    state.collapse_timer += ctx.step;
                    if state.collapse_timer >= ctx.collapse_delay {
                        state.collapsed = true;
                        state.armed = false;
                        state.collapse_timer = Duration::ZERO;
                        state.respawn_timer = Duration::ZERO;
                        return Some(TerrainTransition::Collapsed);
                    }
                }
                None
            }
            TerrainKind::Concealed(conceal) => match conceal.mode {
                ConcealMode::Phantom => None,
                ConcealMode::Periodic { interval } => {
                    if interval.is_zero() {
                        return None;
                    }
                    conceal.timer += ctx.step;
                    if conceal.timer < interval {
                        return None;
                    }
                    conceal.timer -= interval;
                    conceal.solid = !conceal.solid;
                    Some(if conceal.solid {
                        TerrainTransition::Revealed
                    } else {
                        TerrainTransition::Hidden
                    })
                }
                ConcealMode::Trapdoor => {
                    if conceal.solid {
                        if ctx.actor_standing_on == Some(id) {
                            conceal.solid = false;
                            conceal.timer = Duration::ZERO;
                            return Some(TerrainTransition::Hidden);
                        }
                        return None;
                    }
                    conceal.timer += ctx.step;
                    if conceal.timer >= ctx.collapse_respawn {
                        conceal.solid = true;
                        conceal.timer = Duration::ZERO;
                        return Some(TerrainTransition::Revealed);
                    }
                    None
                }
            },
            TerrainKind::Static
            | TerrainKind::Bouncy
            | TerrainKind::LowFriction
            | TerrainKind::OneDirectional
            | TerrainKind::SlopeLeft
            | TerrainKind::SlopeRight => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_nanos(16_666_667);

    fn ctx(standing_on: Option<TerrainId>) -> TerrainStepContext {
        TerrainStepContext {
            step: STEP,
            step_scale: 1.0,
            actor_standing_on: standing_on,
            collapse_delay: Duration::from_millis(1500),
            collapse_respawn: Duration::from_secs(1),
        }
    }

    #[test]
    fn oscillating_clamps_and_reverses_at_range_bounds() {
        let mut piece = Terrain::new(
            Rect::new(100.0, 0.0, 50.0, 10.0),
            TerrainKind::Oscillating(Oscillation::new(100.0, 5.0, 2.0)),
        );
        let id = TerrainId(0);
        let mut xs = Vec::new();
        for _ in 0..6 {
            piece.update(id, &ctx(None));
            xs.push(piece.rect.x);
        }
        assert_eq!(xs, vec![102.0, 104.0, 105.0, 103.0, 101.0, 99.0]);
        let TerrainKind::Oscillating(osc) = piece.kind else {
            panic!("kind changed");
        };
        assert_eq!(osc.last_displacement, -2.0);
        assert_eq!(piece.velocity_x(1.0), -2.0);
    }

    #[test]
    fn collapsible_arms_on_contact_and_keeps_counting_after_actor_leaves() {
        let id = TerrainId(3);
        let mut piece = Terrain::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            TerrainKind::Collapsible(CollapseState::default()),
        );
        assert_eq!(piece.update(id, &ctx(None)), None);
        assert_eq!(piece.update(id, &ctx(Some(TerrainId(9)))), None);
        assert_eq!(piece.update(id, &ctx(Some(id))), None);

        let mut collapsed_after = None;
        for step in 2..=200 {
            if piece.update(id, &ctx(None)) == Some(TerrainTransition::Collapsed) {
                collapsed_after = Some(step);
                break;
            }
        }
        assert_eq!(collapsed_after, Some(90));
        assert!(!piece.is_solid());
    }

    #[test]
    fn collapsed_piece_restores_after_respawn_delay_regardless_of_contact() {
        let id = TerrainId(0);
        let mut piece = Terrain::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            TerrainKind::Collapsible(CollapseState {
                collapsed: true,
                ..CollapseState::default()
            }),
        );
        let mut restored_at = None;
        for step in 1..=120 {
            if piece.update(id, &ctx(Some(id))) == Some(TerrainTransition::Restored) {
                restored_at = Some(step);
                break;
            }
        }
        assert_eq!(restored_at, Some(60));
        assert!(piece.is_solid());
        assert_eq!(piece.kind, TerrainKind::Collapsible(CollapseState::default()));
    }

    #[test]
    fn periodic_concealed_toggles_without_contact() {
        let id = TerrainId(0);
        let mut piece = Terrain::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            TerrainKind::Concealed(Concealment::new(ConcealMode::Periodic {
                interval: STEP * 3,
            })),
        );
        assert!(piece.is_solid());
        let transitions = (0..6)
            .filter_map(|_| piece.update(id, &ctx(None)))
            .collect::<Vec<_>>();
        assert_eq!(
            transitions,
            vec![TerrainTransition::Hidden, TerrainTransition::Revealed]
        );
    }

    #[test]
    fn trapdoor_hides_on_contact_and_phantom_is_never_solid() {
        let id = TerrainId(1);
        let mut trapdoor = Terrain::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            TerrainKind::Concealed(Concealment::new(ConcealMode::Trapdoor)),
        );
        assert_eq!(
            trapdoor.update(id, &ctx(Some(id))),
            Some(TerrainTransition::Hidden)
        );
        assert!(!trapdoor.is_solid());
        assert!(!trapdoor.blocks_horizontally());

        let phantom = Terrain::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            TerrainKind::Concealed(Concealment::new(ConcealMode::Phantom)),
        );
        assert!(!phantom.is_solid());
    }

    #[test]
    fn slope_surface_interpolates_between_edges() {
        let left = Terrain::new(Rect::new(0.0, 100.0, 200.0, 50.0), TerrainKind::SlopeLeft);
        let right = Terrain::new(Rect::new(0.0, 100.0, 200.0, 50.0), TerrainKind::SlopeRight);
        assert_eq!(left.slope_surface_y(0.0), Some(150.0));
        assert_eq!(left.slope_surface_y(200.0), Some(100.0));
        assert_eq!(left.slope_surface_y(50.0), Some(137.5));
        assert_eq!(right.slope_surface_y(50.0), Some(112.5));
        assert_eq!(right.slope_surface_y(-40.0), Some(100.0));
        assert!(left.slope_slide_direction() < 0.0);
        assert!(right.slope_slide_direction() > 0.0);
    }

    #[test]
    fn level_names_cover_editor_and_rust_spellings() {
        assert_eq!(TerrainTag::from_level_name("broken"), Some(TerrainTag::Collapsible));
        assert_eq!(TerrainTag::from_level_name("ice"), Some(TerrainTag::LowFriction));
        assert_eq!(TerrainTag::from_level_name("oneWay"), Some(TerrainTag::OneDirectional));
        assert_eq!(TerrainTag::from_level_name("fake"), Some(TerrainTag::Concealed));
        assert_eq!(TerrainTag::from_level_name("slope_right"), Some(TerrainTag::SlopeRight));
        assert_eq!(TerrainTag::from_level_name("lava"), None);
    }
}
