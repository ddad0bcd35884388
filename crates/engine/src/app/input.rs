use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::sim::{ActionStates, InputAction, InputSnapshot, InputSource};

const JUMP_KEY_SPACE: u8 = 1 << 0;
const JUMP_KEY_W: u8 = 1 << 1;
const JUMP_KEY_UP: u8 = 1 << 2;

/// Keyboard state between fixed steps.
///
/// Holds are level-triggered; the jump release edge and the shell edges (quit, mute) are latched
/// until the first consumer takes them.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    jump_keys_down: u8,
    jump_released_edge: bool,
    mute_key_is_down: bool,
    mute_pressed_edge: bool,
    activity_since_frame: bool,
}

impl InputCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        if key_event.repeat {
            return;
        }
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        self.handle_mute_key_state(is_mute_key(key_event), key_event.state);
    }

    /// Focus loss drops every hold without producing a jump.
    pub(crate) fn release_all(&mut self) {
        self.action_states = ActionStates::default();
        self.jump_keys_down = 0;
        self.jump_released_edge = false;
        self.mute_key_is_down = false;
    }

    pub(crate) fn take_mute_pressed(&mut self) -> bool {
        let was_pressed = self.mute_pressed_edge;
        self.mute_pressed_edge = false;
        was_pressed
    }

    /// True once per frame if any key changed state since the last call.
    pub(crate) fn take_activity(&mut self) -> bool {
        let active = self.activity_since_frame;
        self.activity_since_frame = false;
        active
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match code {
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            KeyCode::Space => self.set_jump_key(JUMP_KEY_SPACE, is_pressed),
            KeyCode::KeyW => self.set_jump_key(JUMP_KEY_W, is_pressed),
            KeyCode::ArrowUp => self.set_jump_key(JUMP_KEY_UP, is_pressed),
            KeyCode::Escape => {
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            _ => return,
        }
        self.activity_since_frame = true;
    }

    fn set_jump_key(&mut self, key_bit: u8, is_pressed: bool) {
        let was_held = self.jump_keys_down != 0;
        if is_pressed {
            self.jump_keys_down |= key_bit;
        } else {
            self.jump_keys_down &= !key_bit;
        }
        let is_held = self.jump_keys_down != 0;
        if was_held && !is_held {
            self.jump_released_edge = true;
        }
        self.action_states.set(InputAction::JumpHold, is_held);
    }

    fn handle_mute_key_state(&mut self, is_mute_key: bool, state: ElementState) {
        if !is_mute_key {
            return;
        }

        match state {
            ElementState::Pressed => {
                if !self.mute_key_is_down {
                    self.mute_pressed_edge = true;
                }
                self.mute_key_is_down = true;
            }
            ElementState::Released => self.mute_key_is_down = false,
        }
    }
}

impl InputSource for InputCollector {
    fn snapshot_for_step(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.action_states, self.jump_released_edge);
        self.jump_released_edge = false;
        snapshot
    }
}

fn is_mute_key(key_event: &KeyEvent) -> bool {
    matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::KeyM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_and_arrow_keys_map_to_actions() {
        let mut input = InputCollector::new();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowUp), true);
        let snapshot = input.snapshot_for_step();
        assert!(snapshot.is_down(InputAction::MoveRight));
        assert!(snapshot.is_down(InputAction::JumpHold));
        assert!(!snapshot.is_down(InputAction::MoveLeft));
    }

    #[test]
    fn jump_release_is_edge_triggered_for_single_step() {
        let mut input = InputCollector::new();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        assert!(!input.snapshot_for_step().jump_released());
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), false);

        let first = input.snapshot_for_step();
        let second = input.snapshot_for_step();
        assert!(first.jump_released());
        assert!(!first.is_down(InputAction::JumpHold));
        assert!(!second.jump_released());
    }

    #[test]
    fn releasing_one_of_two_jump_keys_keeps_holding() {
        let mut input = InputCollector::new();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), false);

        let snapshot = input.snapshot_for_step();
        assert!(snapshot.is_down(InputAction::JumpHold));
        assert!(!snapshot.jump_released());

        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyW), false);
        assert!(input.snapshot_for_step().jump_released());
    }

    #[test]
    fn release_all_drops_holds_without_jumping() {
        let mut input = InputCollector::new();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyA), true);
        input.release_all();

        let snapshot = input.snapshot_for_step();
        assert_eq!(snapshot, InputSnapshot::empty());
    }

    #[test]
    fn mute_toggle_is_edge_triggered() {
        let mut input = InputCollector::new();
        input.handle_mute_key_state(true, ElementState::Pressed);
        assert!(input.take_mute_pressed());
        input.handle_mute_key_state(true, ElementState::Pressed);
        assert!(!input.take_mute_pressed());
        input.handle_mute_key_state(true, ElementState::Released);
        input.handle_mute_key_state(true, ElementState::Pressed);
        assert!(input.take_mute_pressed());
    }

    #[test]
    fn escape_requests_quit_and_counts_as_activity() {
        let mut input = InputCollector::new();
        assert!(!input.take_activity());
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        assert!(input.quit_requested());
        assert!(input.take_activity());
        assert!(!input.take_activity());
    }

    #[test]
    fn unmapped_keys_are_not_activity() {
        let mut input = InputCollector::new();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyQ), true);
        assert!(!input.take_activity());
    }
}
