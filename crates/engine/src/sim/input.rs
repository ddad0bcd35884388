use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    JumpHold,
}

const ACTION_COUNT: usize = 3;
const JUMP_RELEASED_BIT: u8 = 1 << ACTION_COUNT;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn any_down(&self) -> bool {
        self.down.iter().any(|down| *down)
    }
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::JumpHold,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::JumpHold => 2,
        }
    }
}

/// Input sampled for exactly one fixed step: level-triggered holds plus the jump-release edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    actions: ActionStates,
    jump_released: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(actions: ActionStates, jump_released: bool) -> Self {
        Self {
            actions,
            jump_released,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn jump_released(&self) -> bool {
        self.jump_released
    }

    pub fn has_activity(&self) -> bool {
        self.actions.any_down() || self.jump_released
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_jump_released(mut self, released: bool) -> Self {
        self.jump_released = released;
        self
    }

    /// Same holds, edges cleared.
    pub fn held_only(self) -> Self {
        self.with_jump_released(false)
    }

    /// Compact encoding used by replays.
    pub fn to_bits(&self) -> u8 {
        let mut bits = 0u8;
        for action in InputAction::ALL {
            if self.is_down(action) {
                bits |= 1 << action.index();
            }
        }
        if self.jump_released {
            bits |= JUMP_RELEASED_BIT;
        }
        bits
    }

    pub fn from_bits(bits: u8) -> Self {
        let mut snapshot = Self::empty();
        for action in InputAction::ALL {
            snapshot = snapshot.with_action_down(action, bits & (1 << action.index()) != 0);
        }
        snapshot.with_jump_released(bits & JUMP_RELEASED_BIT != 0)
    }
}

/// Supplies one snapshot per fixed step. Edges must be handed out to a single step only.
pub trait InputSource {
    fn snapshot_for_step(&mut self) -> InputSnapshot;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn snapshot_for_step(&mut self) -> InputSnapshot {
        (**self).snapshot_for_step()
    }
}

/// Plays a queued sequence of snapshots, then keeps returning the idle snapshot.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: VecDeque<InputSnapshot>,
    idle: InputSnapshot,
}

impl ScriptedInput {
    pub fn new<I: IntoIterator<Item = InputSnapshot>>(frames: I) -> Self {
        Self {
            queue: frames.into_iter().collect(),
            idle: InputSnapshot::empty(),
        }
    }

    /// Holds `snapshot` forever; a release edge in it fires on the first step only.
    pub fn holding(snapshot: InputSnapshot) -> Self {
        Self {
            queue: VecDeque::from([snapshot]),
            idle: snapshot.held_only(),
        }
    }

    pub fn push(&mut self, snapshot: InputSnapshot) {
        self.queue.push_back(snapshot);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl InputSource for ScriptedInput {
    fn snapshot_for_step(&mut self) -> InputSnapshot {
        self.queue.pop_front().unwrap_or(self.idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip_every_combination() {
        for bits in 0u8..16 {
            assert_eq!(InputSnapshot::from_bits(bits).to_bits(), bits);
        }
    }

    #[test]
    fn holding_fires_release_edge_once() {
        let mut input = ScriptedInput::holding(
            InputSnapshot::empty()
                .with_action_down(InputAction::MoveRight, true)
                .with_jump_released(true),
        );
        let first = input.snapshot_for_step();
        let second = input.snapshot_for_step();
        assert!(first.jump_released());
        assert!(!second.jump_released());
        assert!(second.is_down(InputAction::MoveRight));
    }

    #[test]
    fn exhausted_script_returns_empty_input() {
        let mut input = ScriptedInput::new([InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)]);
        assert!(input.snapshot_for_step().is_down(InputAction::MoveLeft));
        assert_eq!(input.snapshot_for_step(), InputSnapshot::empty());
        assert_eq!(input.remaining(), 0);
    }
}
