use super::terrain::{TerrainId, TerrainTag};

/// Coarse vertical band of the world, used to classify where falls start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    Top,
    Mid,
    Bottom,
}

impl Zone {
    /// Splits the world into equal thirds by height.
    pub fn classify(y: f32, world_height: f32) -> Self {
        if world_height <= 0.0 || !y.is_finite() {
            return Zone::Bottom;
        }
        let band = y / world_height;
        if band < 1.0 / 3.0 {
            Zone::Top
        } else if band < 2.0 / 3.0 {
            Zone::Mid
        } else {
            Zone::Bottom
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Zone::Top => "top",
            Zone::Mid => "mid",
            Zone::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsEvent {
    Jumped { power: f32 },
    Bounced { terrain: TerrainId },
    Landed { terrain: TerrainId, surface: TerrainTag },
    Fell { zone: Zone },
    Died,
    Respawned,
    TerrainCollapsed { terrain: TerrainId },
    TerrainRestored { terrain: TerrainId },
    TerrainHidden { terrain: TerrainId },
    TerrainRevealed { terrain: TerrainId },
}

impl PhysicsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PhysicsEvent::Jumped { .. } => "jumped",
            PhysicsEvent::Bounced { .. } => "bounced",
            PhysicsEvent::Landed { .. } => "landed",
            PhysicsEvent::Fell { .. } => "fell",
            PhysicsEvent::Died => "died",
            PhysicsEvent::Respawned => "respawned",
            PhysicsEvent::TerrainCollapsed { .. } => "terrain_collapsed",
            PhysicsEvent::TerrainRestored { .. } => "terrain_restored",
            PhysicsEvent::TerrainHidden { .. } => "terrain_hidden",
            PhysicsEvent::TerrainRevealed { .. } => "terrain_revealed",
        }
    }
}

/// Events emitted during the current fixed step, in emission order.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: Vec<PhysicsEvent>,
}

impl EventQueue {
    pub(crate) fn push(&mut self, event: PhysicsEvent) {
        self.events.push(event);
    }

    pub(crate) fn as_slice(&self) -> &[PhysicsEvent] {
        &self.events
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}

/// Receives the events of every fixed step, once per step, after the step has finished.
pub trait EventSink {
    fn receive(&mut self, step: u64, events: &[PhysicsEvent]);
}

impl EventSink for () {
    fn receive(&mut self, _step: u64, _events: &[PhysicsEvent]) {}
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn receive(&mut self, step: u64, events: &[PhysicsEvent]) {
        (**self).receive(step, events);
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn receive(&mut self, step: u64, events: &[PhysicsEvent]) {
        (**self).receive(step, events);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampedEvent {
    pub step: u64,
    pub event: PhysicsEvent,
}

impl EventSink for Vec<StampedEvent> {
    fn receive(&mut self, step: u64, events: &[PhysicsEvent]) {
        self.extend(events.iter().map(|event| StampedEvent {
            step,
            event: *event,
        }));
    }
}
