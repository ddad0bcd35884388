use std::collections::BTreeMap;
use std::time::Duration;

use engine::{EventSink, PhysicsEvent, SessionObserver, Zone};
use tracing::{debug, info};

const STUCK_DEATHS_IN_ZONE: u32 = 3;
const IDLE_TRIGGER_AFTER: Duration = Duration::from_secs(12);
const TRIGGER_COOLDOWN: Duration = Duration::from_secs(6);
const TAUNT_DISPLAY: Duration = Duration::from_secs(4);

const DEATH_TAUNTS: &[&str] = &[
    "Dead again?",
    "Wow. Impressive.",
    "Which attempt is this now?",
    "Come on, you can do it. Probably.",
    "That one was easy, you know.",
    "Down you go.",
];
const IDLE_TAUNTS: &[&str] = &[
    "What are you doing?",
    "Fell asleep?",
    "Playing or not?",
    "Given up already?",
    "Still alive over there?",
];
const STUCK_TAUNTS: &[&str] = &[
    "Stuck here, huh?",
    "Same spot again?",
    "Maybe learn from the last ten tries.",
    "Try literally anything else.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    Stuck,
    Death,
    Idle,
}

impl Trigger {
    fn label(self) -> &'static str {
        match self {
            Trigger::Stuck => "stuck",
            Trigger::Death => "death",
            Trigger::Idle => "idle",
        }
    }

    fn lines(self) -> &'static [&'static str] {
        match self {
            Trigger::Stuck => STUCK_TAUNTS,
            Trigger::Death => DEATH_TAUNTS,
            Trigger::Idle => IDLE_TAUNTS,
        }
    }

    fn slot(self) -> usize {
        match self {
            Trigger::Stuck => 0,
            Trigger::Death => 1,
            Trigger::Idle => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveTaunt {
    pub(crate) trigger: Trigger,
    pub(crate) line: &'static str,
    remaining: Duration,
}

/// Watches the physics event stream and picks when to heckle the player.
///
/// Timers advance by one fixed step per received batch, so a replayed session heckles at the
/// same steps as the live one.
#[derive(Debug)]
pub(crate) struct BehaviorTracker {
    step: Duration,
    deaths: u32,
    reacted_deaths: u32,
    deaths_by_zone: BTreeMap<Zone, u32>,
    last_death_zone: Option<Zone>,
    pending_fall_zone: Option<Zone>,
    idle: Duration,
    cooldown: Duration,
    muted: bool,
    taunt_cursor: [usize; 3],
    active: Option<ActiveTaunt>,
}

impl BehaviorTracker {
    pub(crate) fn new(step: Duration) -> Self {
        Self {
            step,
            deaths: 0,
            reacted_deaths: 0,
            deaths_by_zone: BTreeMap::new(),
            last_death_zone: None,
            pending_fall_zone: None,
            idle: Duration::ZERO,
            cooldown: Duration::ZERO,
            muted: false,
            taunt_cursor: [0; 3],
            active: None,
        }
    }

    pub(crate) fn deaths(&self) -> u32 {
        self.deaths
    }

    pub(crate) fn deaths_in_zone(&self, zone: Zone) -> u32 {
        self.deaths_by_zone.get(&zone).copied().unwrap_or(0)
    }

    pub(crate) fn active_taunt(&self) -> Option<&ActiveTaunt> {
        self.active.as_ref()
    }

    fn note_activity(&mut self) {
        self.idle = Duration::ZERO;
    }

    fn record_event(&mut self, event: &PhysicsEvent) {
        match event {
            PhysicsEvent::Fell { zone } => self.pending_fall_zone = Some(*zone),
            PhysicsEvent::Died => {
                let zone = self.pending_fall_zone.take().unwrap_or(Zone::Bottom);
                self.deaths = self.deaths.saturating_add(1);
                *self.deaths_by_zone.entry(zone).or_default() += 1;
                self.last_death_zone = Some(zone);
                debug!(
                    deaths = self.deaths,
                    zone = zone.label(),
                    in_zone = self.deaths_in_zone(zone),
                    "death_tracked"
                );
            }
            PhysicsEvent::Jumped { .. } | PhysicsEvent::Bounced { .. } => self.note_activity(),
            _ => {}
        }
    }

    fn tick(&mut self) {
        self.idle = self.idle.saturating_add(self.step);
        self.cooldown = self.cooldown.saturating_sub(self.step);
        if let Some(active) = &mut self.active {
            active.remaining = active.remaining.saturating_sub(self.step);
            if active.remaining.is_zero() {
                debug!(trigger = active.trigger.label(), "taunt_expired");
                self.active = None;
            }
        }
    }

    /// Priority is stuck, then death, then idle.
    fn select_trigger(&self) -> Option<Trigger> {
        if self.muted || !self.cooldown.is_zero() {
            return None;
        }
        if self.deaths > self.reacted_deaths {
            let in_zone = self
                .last_death_zone
                .map_or(0, |zone| self.deaths_in_zone(zone));
            return Some(if in_zone >= STUCK_DEATHS_IN_ZONE {
                Trigger::Stuck
            } else {
                Trigger::Death
            });
        }
        (self.idle > IDLE_TRIGGER_AFTER).then_some(Trigger::Idle)
    }

    fn fire(&mut self, step: u64, trigger: Trigger) {
        self.cooldown = TRIGGER_COOLDOWN;
        self.reacted_deaths = self.deaths;
        if trigger == Trigger::Idle {
            self.idle = Duration::ZERO;
        }

        let lines = trigger.lines();
        let cursor = &mut self.taunt_cursor[trigger.slot()];
        let line = lines[*cursor % lines.len()];
        *cursor = cursor.wrapping_add(1);

        info!(
            step,
            trigger = trigger.label(),
            deaths = self.deaths,
            zone = self.last_death_zone.map(Zone::label).unwrap_or("none"),
            line,
            "taunt_triggered"
        );
        self.active = Some(ActiveTaunt {
            trigger,
            line,
            remaining: TAUNT_DISPLAY,
        });
    }
}

impl EventSink for BehaviorTracker {
    fn receive(&mut self, step: u64, events: &[PhysicsEvent]) {
        self.tick();
        for event in events {
            self.record_event(event);
        }
        if self.muted {
            self.reacted_deaths = self.deaths;
            return;
        }
        if let Some(trigger) = self.select_trigger() {
            self.fire(step, trigger);
        }
    }
}

impl SessionObserver for BehaviorTracker {
    fn on_frame(&mut self, _frame_dt: Duration, input_activity: bool) {
        if input_activity {
            self.note_activity();
        }
    }

    fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        if self.muted {
            self.active = None;
        }
        info!(muted = self.muted, "taunts_mute_toggled");
    }

    fn status_line(&self) -> Option<String> {
        if self.muted {
            return Some("taunts muted".to_string());
        }
        self.active_taunt().map(|active| active.line.to_string())
    }

    fn shutdown(&mut self) {
        info!(
            deaths = self.deaths(),
            top = self.deaths_in_zone(Zone::Top),
            mid = self.deaths_in_zone(Zone::Mid),
            bottom = self.deaths_in_zone(Zone::Bottom),
            "session_summary"
        );
    }
}
