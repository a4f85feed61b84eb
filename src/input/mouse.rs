//! Mouse translation
//!
//! Pointer motion is clamped to the framebuffer and reported per axis.
//! The legacy mouse has three buttons; hosts with fewer reach the others
//! through ctrl/shift chords on the left and right buttons.

use super::keycodes::{LEGACY_MOUSE_LEFT, LEGACY_MOUSE_MIDDLE, LEGACY_MOUSE_RIGHT};
use super::{ModifierState, PointerState};
use crate::event::{EventEncoder, EventType};
use crate::host::HostButton;

/// Legacy codes posted for the three mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCodes {
    pub left: u16,
    pub middle: u16,
    pub right: u16,
}

impl ButtonCodes {
    /// Middle=128, Right=129
    pub const fn standard() -> Self {
        Self {
            left: LEGACY_MOUSE_LEFT,
            middle: LEGACY_MOUSE_MIDDLE,
            right: LEGACY_MOUSE_RIGHT,
        }
    }

    /// Middle and right swapped, for software built against the old mix-up
    pub const fn legacy_swapped() -> Self {
        Self {
            left: LEGACY_MOUSE_LEFT,
            middle: LEGACY_MOUSE_RIGHT,
            right: LEGACY_MOUSE_MIDDLE,
        }
    }

    /// Resolve a host button against the held modifiers
    ///
    /// Ctrl wins over shift on the left button.
    pub fn resolve(&self, button: HostButton, mods: &ModifierState) -> Option<u16> {
        match button {
            HostButton::Left => Some(if mods.ctrl_down {
                self.right
            } else if mods.shift_down {
                self.middle
            } else {
                self.left
            }),
            HostButton::Right => Some(if mods.shift_down {
                self.middle
            } else {
                self.right
            }),
            HostButton::Middle => Some(self.middle),
            HostButton::Other(_) => None,
        }
    }
}

impl Default for ButtonCodes {
    fn default() -> Self {
        Self::standard()
    }
}

/// Mouse translator over the session's encoder, modifiers and pointer
pub struct MouseHandler<'a> {
    encoder: &'a mut EventEncoder,
    mods: &'a ModifierState,
    pointer: &'a mut PointerState,
    width: u32,
    height: u32,
    codes: ButtonCodes,
}

impl<'a> MouseHandler<'a> {
    pub fn new(
        encoder: &'a mut EventEncoder,
        mods: &'a ModifierState,
        pointer: &'a mut PointerState,
        (width, height): (u32, u32),
        codes: ButtonCodes,
    ) -> Self {
        Self {
            encoder,
            mods,
            pointer,
            width,
            height,
            codes,
        }
    }

    /// Pointer moved to `(x, y)` (may lie outside the framebuffer)
    pub fn motion(&mut self, x: i32, y: i32) {
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        let x = x.clamp(0, max_x) as u16;
        let y = y.clamp(0, max_y) as u16;

        if x != self.pointer.x {
            self.pointer.x = x;
            self.encoder.post(EventType::XLocation, x, true);
        }
        if y != self.pointer.y {
            self.pointer.y = y;
            self.encoder.post(EventType::YLocation, y, true);
        }
    }

    /// Button transition; unmapped buttons are ignored
    pub fn button(&mut self, button: HostButton, down: bool) -> bool {
        match self.codes.resolve(button, self.mods) {
            Some(code) => self.encoder.post(EventType::bistate(down), code, true),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::{decompose, EventQueue};

    fn mods(ctrl: bool, shift: bool) -> ModifierState {
        ModifierState {
            shift_down: shift,
            ctrl_down: ctrl,
            caps_lock_down: false,
        }
    }

    #[test]
    fn test_button_mapping_table() {
        let codes = ButtonCodes::standard();
        let cases = [
            (HostButton::Left, false, false, 130),
            (HostButton::Left, true, false, 129),
            (HostButton::Left, true, true, 129),
            (HostButton::Left, false, true, 128),
            (HostButton::Right, false, false, 129),
            (HostButton::Right, true, false, 129),
            (HostButton::Right, false, true, 128),
            (HostButton::Right, true, true, 128),
            (HostButton::Middle, false, false, 128),
            (HostButton::Middle, true, true, 128),
        ];
        for (button, ctrl, shift, expected) in cases {
            assert_eq!(
                codes.resolve(button, &mods(ctrl, shift)),
                Some(expected),
                "{:?} ctrl={} shift={}",
                button,
                ctrl,
                shift
            );
        }
        assert_eq!(codes.resolve(HostButton::Other(8), &mods(false, false)), None);
    }

    #[test]
    fn test_legacy_swapped_codes() {
        let codes = ButtonCodes::legacy_swapped();
        assert_eq!(codes.resolve(HostButton::Middle, &mods(false, false)), Some(129));
        assert_eq!(codes.resolve(HostButton::Right, &mods(false, false)), Some(128));
    }

    #[test]
    fn test_motion_clamps_and_skips_unchanged_axis() {
        let queue = EventQueue::with_capacity(100).unwrap();
        let mut enc = EventEncoder::new(queue, Box::new(ManualClock::new(0)));
        let m = ModifierState::default();
        let mut pointer = PointerState::default();

        {
            let mut mh = MouseHandler::new(
                &mut enc,
                &m,
                &mut pointer,
                (100, 50),
                ButtonCodes::default(),
            );
            mh.motion(10, 0);
            mh.motion(500, -20);
            mh.motion(99, 0);
        }
        assert_eq!(pointer, PointerState { x: 99, y: 0 });

        let words: Vec<_> = std::iter::from_fn(|| enc.next_word()).map(decompose).collect();
        assert_eq!(
            words,
            vec![(0, 0), (1, 10), (0, 0), (1, 99)],
            "y never left 0 and the last move was fully clamped"
        );
    }

    #[test]
    fn test_diagonal_motion_posts_two_timed_events() {
        let queue = EventQueue::with_capacity(100).unwrap();
        let mut enc = EventEncoder::new(queue, Box::new(ManualClock::new(0)));
        let m = ModifierState::default();
        let mut pointer = PointerState::default();
        MouseHandler::new(&mut enc, &m, &mut pointer, (640, 480), ButtonCodes::default())
            .motion(3, 4);
        let words: Vec<_> = std::iter::from_fn(|| enc.next_word()).map(decompose).collect();
        assert_eq!(words, vec![(0, 0), (1, 3), (0, 0), (2, 4)]);
    }
}
