//! Input handling
//!
//! Translate host input into legacy workstation events.
//! - Keyboard: control keys + decoded text → legacy keycodes with shift bracketing
//! - Mouse: clamped motion + modifier-aware button mapping
//! - evdev + xkbcommon host input (console feature)

#[cfg(feature = "console")]
pub mod evdev;
pub mod keyboard;
pub mod keycodes;
pub mod mouse;

pub use keyboard::{classify_char, decode_first_char, CharClass, KeyTranslator};
pub use mouse::{ButtonCodes, MouseHandler};

/// Modifier keys as last reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub shift_down: bool,
    pub ctrl_down: bool,
    pub caps_lock_down: bool,
}

/// Last pointer position reported to the VM, in framebuffer pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub x: u16,
    pub y: u16,
}
