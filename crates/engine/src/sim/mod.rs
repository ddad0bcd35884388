mod actor;
mod camera;
mod clock;
mod collision;
mod events;
mod geometry;
mod input;
mod shared;
mod simulator;
mod terrain;
mod tuning;
mod world;

pub use actor::{Actor, Facing, LifeState, SurfaceType};
pub use camera::Camera;
pub use events::{EventSink, PhysicsEvent, StampedEvent, Zone};
pub use geometry::{Penetration, PushOut, Rect, Vec2};
pub use input::{InputAction, InputSnapshot, InputSource, ScriptedInput};
pub use shared::SharedSimulator;
pub use simulator::{
    fixed_step_for_rate, ActorView, AdvanceReport, RenderView, SimConfig, Simulator, TerrainView,
    TerrainVisual,
};
pub use terrain::{
    CollapseState, ConcealMode, Concealment, Oscillation, Terrain, TerrainId, TerrainKind,
    TerrainTag,
};
pub use tuning::PhysicsTuning;
pub use world::{LevelData, FALLBACK_WORLD_HEIGHT, FALLBACK_WORLD_WIDTH};

pub(crate) use clock::normalize_non_zero_duration;
pub(crate) use input::ActionStates;
