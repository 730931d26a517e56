//! Controller snapshot merger.
//!
//! Three sources feed one logical controller: held keyboard tokens, a
//! gamepad and on-screen touch controls. Each source keeps its own latest
//! state; [`InputSources::merge`] combines them into a [`ControllerSnapshot`].
//! Axes take the value with the greatest magnitude (keyboard, then gamepad,
//! then touch on ties) and buttons are OR-ed.

use crate::config::{AXIS_LIMIT, InputBindings};
use crate::types::{ControllerAction, ControllerButton, KeyboardAxisRole};
use crate::utils::clamp_axis;
use std::collections::BTreeSet;

/// Per-button pressed flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonSet([bool; ControllerButton::COUNT]);

impl ButtonSet {
    pub fn is_pressed(&self, button: ControllerButton) -> bool {
        self.0[button.index()]
    }

    pub fn set(&mut self, button: ControllerButton, pressed: bool) {
        self.0[button.index()] = pressed;
    }

    pub fn union(&self, other: &ButtonSet) -> ButtonSet {
        let mut out = *self;
        for (slot, &other) in out.0.iter_mut().zip(other.0.iter()) {
            *slot |= other;
        }
        out
    }

    /// Buttons pressed now that were not pressed in `previous`
    pub fn rising_edges(&self, previous: &ButtonSet) -> Vec<ControllerButton> {
        ControllerButton::ALL
            .iter()
            .copied()
            .filter(|&b| self.is_pressed(b) && !previous.is_pressed(b))
            .collect()
    }
}

/// The merged logical controller. Axes are indexed 0..4 for axis1..axis4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSnapshot {
    pub axes: [i32; 4],
    pub buttons: ButtonSet,
}

impl ControllerSnapshot {
    pub fn axis(&self, number: usize) -> i32 {
        match number {
            1..=4 => self.axes[number - 1],
            _ => 0,
        }
    }
}

/// Latest state reported by a gamepad or by touch controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceState {
    pub axes: [i32; 4],
    pub buttons: ButtonSet,
}

impl SourceState {
    pub fn set_axes(&mut self, axes: [i32; 4]) {
        self.axes = axes.map(clamp_axis);
    }

    pub fn clear(&mut self) {
        *self = SourceState::default();
    }
}

/// Currently held keyboard tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardState {
    pub enabled: bool,
    held: BTreeSet<String>,
}

impl Default for KeyboardState {
    fn default() -> Self {
        KeyboardState {
            enabled: true,
            held: BTreeSet::new(),
        }
    }
}

impl KeyboardState {
    pub fn token_down(&mut self, raw: &str) {
        if !self.enabled {
            return;
        }
        let token = normalize_key_token(raw);
        if !token.is_empty() {
            self.held.insert(token);
        }
    }

    pub fn token_up(&mut self, raw: &str) {
        let token = normalize_key_token(raw);
        self.held.remove(&token);
    }

    pub fn is_held(&self, token: &str) -> bool {
        self.held.contains(token)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Axis values and buttons implied by the held tokens
    pub fn derive(&self, bindings: &InputBindings) -> SourceState {
        let mut state = SourceState::default();
        if !self.enabled {
            return state;
        }

        for (i, (positive, negative)) in KeyboardAxisRole::AXIS_PAIRS.iter().enumerate() {
            let pos_held = bindings.axis_token(*positive).is_some_and(|t| self.is_held(t));
            let neg_held = bindings.axis_token(*negative).is_some_and(|t| self.is_held(t));
            state.axes[i] = match (pos_held, neg_held) {
                (true, false) => AXIS_LIMIT,
                (false, true) => -AXIS_LIMIT,
                _ => 0,
            };
        }

        for button in ControllerButton::ALL {
            let held = bindings.keyboard_token(button).is_some_and(|t| self.is_held(t));
            state.buttons.set(button, held);
        }
        state
    }
}

/// Canonical form of a platform key name
pub fn normalize_key_token(raw: &str) -> String {
    if raw == " " {
        return "space".to_string();
    }
    let trimmed = raw.trim().to_lowercase();
    match trimmed.as_str() {
        "arrowup" => "up".to_string(),
        "arrowdown" => "down".to_string(),
        "arrowleft" => "left".to_string(),
        "arrowright" => "right".to_string(),
        _ => trimmed.chars().take(12).collect(),
    }
}

/// Scale a gamepad stick reading in [-1, 1] to a controller axis value
pub fn gamepad_axis_value(raw: f32) -> i32 {
    clamp_axis((raw as f64 * AXIS_LIMIT as f64).round() as i32)
}

/// The three input sources plus the binding tables used to interpret them
#[derive(Debug, Clone)]
pub struct InputSources {
    pub keyboard: KeyboardState,
    pub gamepad: SourceState,
    pub touch: SourceState,
    pub gamepad_name: Option<String>,
    bindings: InputBindings,
}

impl InputSources {
    pub fn new(bindings: InputBindings) -> Self {
        InputSources {
            keyboard: KeyboardState::default(),
            gamepad: SourceState::default(),
            touch: SourceState::default(),
            gamepad_name: None,
            bindings,
        }
    }

    pub fn bindings(&self) -> &InputBindings {
        &self.bindings
    }

    pub fn set_keyboard_token(&mut self, raw: &str, down: bool) {
        if down {
            self.keyboard.token_down(raw);
        } else {
            self.keyboard.token_up(raw);
        }
    }

    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard.enabled = enabled;
        if !enabled {
            self.keyboard.clear();
        }
    }

    pub fn set_gamepad_axes(&mut self, axis1: f32, axis2: f32, axis3: f32, axis4: f32) {
        self.gamepad.axes = [axis1, axis2, axis3, axis4].map(gamepad_axis_value);
    }

    pub fn set_gamepad_button(&mut self, button: ControllerButton, pressed: bool) {
        self.gamepad.buttons.set(button, pressed);
    }

    /// `None` means the gamepad went away; its state is cleared.
    pub fn set_gamepad_connection(&mut self, name: Option<String>) {
        match name.filter(|n| !n.is_empty()) {
            Some(name) => self.gamepad_name = Some(name),
            None => {
                self.gamepad_name = None;
                self.gamepad.clear();
            }
        }
    }

    pub fn set_touch_axes(&mut self, axes: [i32; 4]) {
        self.touch.set_axes(axes);
    }

    pub fn set_touch_button(&mut self, button: ControllerButton, pressed: bool) {
        self.touch.buttons.set(button, pressed);
    }

    /// Take the latest state of every source from a staging copy, keeping our bindings
    pub fn copy_sources_from(&mut self, staged: &InputSources) {
        self.keyboard.clone_from(&staged.keyboard);
        self.gamepad = staged.gamepad;
        self.touch = staged.touch;
        self.gamepad_name.clone_from(&staged.gamepad_name);
    }

    pub fn clear_all(&mut self) {
        self.keyboard.clear();
        self.gamepad.clear();
        self.touch.clear();
    }

    /// Combine all sources into one logical controller state
    pub fn merge(&self) -> ControllerSnapshot {
        let keyboard = self.keyboard.derive(&self.bindings);
        let sources = [keyboard, self.gamepad, self.touch];

        let mut snapshot = ControllerSnapshot::default();
        for axis in 0..4 {
            snapshot.axes[axis] = strongest_axis_value(sources.iter().map(|s| s.axes[axis]));
        }
        snapshot.buttons = sources
            .iter()
            .fold(ButtonSet::default(), |acc, s| acc.union(&s.buttons));
        snapshot
    }
}

/// Value with the greatest magnitude; the first one wins a tie
pub fn strongest_axis_value(values: impl IntoIterator<Item = i32>) -> i32 {
    let mut strongest = 0;
    let mut magnitude = -1;
    for value in values {
        if value.abs() > magnitude {
            strongest = value;
            magnitude = value.abs();
        }
    }
    strongest
}

/// A button press as shown in the input log and written to recordings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub button: ControllerButton,
    pub action: Option<ControllerAction>,
    pub value: String,
}

impl InputEvent {
    pub fn ui_text(&self) -> String {
        format!("BUTTON {} PRESSED : {}", self.button, self.value)
    }

    pub fn record_line(&self) -> String {
        let kind = match self.action {
            Some(action) => action.label(),
            None if self.button.is_dpad() => self.value.as_str(),
            None => self.button.label(),
        };
        format!("BTN_{}:{}", kind, self.value)
    }
}

/// Events for newly pressed buttons: one per bound action, a D-pad event
/// for direction buttons, or NO_ACTION when nothing else applies
pub fn input_events(pressed: &[ControllerButton], bindings: &InputBindings) -> Vec<InputEvent> {
    let mut events = Vec::new();
    for &button in pressed {
        let mut bound = false;
        for action in ControllerAction::ALL {
            if bindings.button_for(action) == button {
                bound = true;
                events.push(InputEvent {
                    button,
                    action: Some(action),
                    value: action.label().to_string(),
                });
            }
        }

        if button.is_dpad() {
            events.push(InputEvent {
                button,
                action: None,
                value: format!("DPAD_{}", button.label()),
            });
        } else if !bound {
            events.push(InputEvent {
                button,
                action: None,
                value: "NO_ACTION".to_string(),
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> InputSources {
        InputSources::new(InputBindings::default())
    }

    #[test]
    fn test_strongest_axis_value() {
        assert_eq!(strongest_axis_value([10, -50, 30]), -50);
        assert_eq!(strongest_axis_value([40, -40, 0]), 40);
        assert_eq!(strongest_axis_value([-40, 40, 40]), -40);
        assert_eq!(strongest_axis_value([0, 0, 0]), 0);
    }

    #[test]
    fn test_merge_picks_largest_magnitude_per_axis() {
        let mut input = sources();
        input.set_gamepad_axes(0.5, -0.25, 0.0, 1.0);
        input.set_touch_axes([-100, 20, 0, 0]);
        input.set_keyboard_token("w", true); // axis3 up

        let snap = input.merge();
        assert_eq!(snap.axis(1), -100); // touch beats gamepad 64
        assert_eq!(snap.axis(2), -32); // gamepad -31.75 rounds to -32
        assert_eq!(snap.axis(3), 127); // keyboard
        assert_eq!(snap.axis(4), 127);
    }

    #[test]
    fn test_keyboard_wins_ties() {
        let mut input = sources();
        input.set_keyboard_token("d", true); // axis1 +127
        input.set_touch_axes([-127, 0, 0, 0]);
        assert_eq!(input.merge().axis(1), 127);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut input = sources();
        input.set_keyboard_token("w", true);
        input.set_keyboard_token("s", true);
        assert_eq!(input.merge().axis(3), 0);
        input.set_keyboard_token("w", false);
        assert_eq!(input.merge().axis(3), -127);
    }

    #[test]
    fn test_buttons_are_ored() {
        let mut input = sources();
        input.set_touch_button(ControllerButton::A, true);
        input.set_gamepad_button(ControllerButton::B, true);
        input.set_keyboard_token("ArrowUp", true);

        let snap = input.merge();
        assert!(snap.buttons.is_pressed(ControllerButton::A));
        assert!(snap.buttons.is_pressed(ControllerButton::B));
        assert!(snap.buttons.is_pressed(ControllerButton::Up));
        assert!(!snap.buttons.is_pressed(ControllerButton::L1));
    }

    #[test]
    fn test_disabled_keyboard_contributes_nothing() {
        let mut input = sources();
        input.set_keyboard_token("1", true);
        input.set_keyboard_enabled(false);
        input.set_keyboard_token("w", true);
        let snap = input.merge();
        assert_eq!(snap.axis(3), 0);
        assert!(!snap.buttons.is_pressed(ControllerButton::L1));
    }

    #[test]
    fn test_gamepad_disconnect_clears_state() {
        let mut input = sources();
        input.set_gamepad_connection(Some("Pad".to_string()));
        input.set_gamepad_axes(1.0, 1.0, 1.0, 1.0);
        input.set_gamepad_button(ControllerButton::R1, true);
        input.set_gamepad_connection(None);
        assert_eq!(input.merge(), ControllerSnapshot::default());
        assert!(input.gamepad_name.is_none());
    }

    #[test]
    fn test_normalize_key_token() {
        assert_eq!(normalize_key_token(" W "), "w");
        assert_eq!(normalize_key_token("ArrowLeft"), "left");
        assert_eq!(normalize_key_token(" "), "space");
        assert_eq!(normalize_key_token("averyveryverylongkey"), "averyveryver");
    }

    #[test]
    fn test_rising_edges() {
        let mut prev = ButtonSet::default();
        prev.set(ControllerButton::A, true);
        let mut now = ButtonSet::default();
        now.set(ControllerButton::A, true);
        now.set(ControllerButton::L1, true);
        assert_eq!(now.rising_edges(&prev), vec![ControllerButton::L1]);
    }

    #[test]
    fn test_input_events() {
        let bindings = InputBindings::default();
        let events = input_events(
            &[ControllerButton::L1, ControllerButton::Up],
            &bindings,
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, Some(ControllerAction::IntakeIn));
        assert_eq!(events[0].ui_text(), "BUTTON L1 PRESSED : INTAKE_IN");
        assert_eq!(events[0].record_line(), "BTN_INTAKE_IN:INTAKE_IN");
        assert_eq!(events[1].record_line(), "BTN_DPAD_UP:DPAD_UP");

        let mut unbound = bindings.clone();
        unbound.actions.insert(ControllerAction::IntakeIn, ControllerButton::R2);
        unbound.actions.insert(ControllerAction::OuttakeIn, ControllerButton::R2);
        let events = input_events(&[ControllerButton::L1, ControllerButton::R2], &unbound);
        assert_eq!(events[0].record_line(), "BTN_L1:NO_ACTION");
        assert_eq!(events.len(), 3);
    }
}
