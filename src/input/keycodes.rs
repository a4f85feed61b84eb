//! Keycode constants
//!
//! Legacy workstation keycodes posted to the VM, plus the evdev codes the
//! console host needs (from <linux/input-event-codes.h>).

#![allow(dead_code)]

// ============================================================================
// Legacy Workstation Keycodes (posted in BiStateOn/BiStateOff events)
// ============================================================================

pub const LEGACY_BACKSPACE: u16 = 8;
pub const LEGACY_TAB: u16 = 9;
// Line feed (10) has no host key
pub const LEGACY_RETURN: u16 = 13;
pub const LEGACY_ESCAPE: u16 = 27;
pub const LEGACY_SPACE: u16 = 32;
pub const LEGACY_DELETE: u16 = 127;

/// Left shift; the right shift code (137) is never posted
pub const LEGACY_SHIFT: u16 = 136;
pub const LEGACY_CTRL: u16 = 138;
pub const LEGACY_CAPS_LOCK: u16 = 139;

/// ← arrow, shares the ASCII '_' position
pub const LEGACY_LEFT_ARROW: u16 = 95;

/// ↑ arrow, shares the ASCII '^' position
pub const LEGACY_UP_ARROW: u16 = 94;

// ============================================================================
// Legacy Mouse Buttons
// ============================================================================

pub const LEGACY_MOUSE_LEFT: u16 = 130;
pub const LEGACY_MOUSE_MIDDLE: u16 = 128;
pub const LEGACY_MOUSE_RIGHT: u16 = 129;

// ============================================================================
// evdev Modifier Keys
// ============================================================================

/// Left Control key
pub const KEY_LEFTCTRL: u32 = 29;

/// Right Control key
pub const KEY_RIGHTCTRL: u32 = 97;

/// Left Shift key
pub const KEY_LEFTSHIFT: u32 = 42;

/// Right Shift key
pub const KEY_RIGHTSHIFT: u32 = 54;

/// Left Alt key
pub const KEY_LEFTALT: u32 = 56;

/// Right Alt key (AltGr on some keyboards)
pub const KEY_RIGHTALT: u32 = 100;

/// Caps Lock key
pub const KEY_CAPSLOCK: u32 = 58;

/// Left Super key
pub const KEY_LEFTMETA: u32 = 125;

/// Right Super key
pub const KEY_RIGHTMETA: u32 = 126;

// ============================================================================
// evdev Mouse Buttons (BTN_* from linux/input-event-codes.h)
// ============================================================================

/// Left mouse button
pub const BTN_LEFT: u32 = 0x110;

/// Right mouse button
pub const BTN_RIGHT: u32 = 0x111;

/// Middle mouse button
pub const BTN_MIDDLE: u32 = 0x112;

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if keycode is a modifier key (never auto-repeats)
#[inline]
pub const fn is_modifier_key(keycode: u32) -> bool {
    matches!(
        keycode,
        KEY_LEFTSHIFT
            | KEY_RIGHTSHIFT
            | KEY_LEFTCTRL
            | KEY_RIGHTCTRL
            | KEY_LEFTALT
            | KEY_RIGHTALT
            | KEY_CAPSLOCK
            | KEY_LEFTMETA
            | KEY_RIGHTMETA
    )
}

/// Check if keycode is a Shift key
#[inline]
pub const fn is_shift_key(keycode: u32) -> bool {
    keycode == KEY_LEFTSHIFT || keycode == KEY_RIGHTSHIFT
}

/// Check if keycode is a Ctrl key
#[inline]
pub const fn is_ctrl_key(keycode: u32) -> bool {
    keycode == KEY_LEFTCTRL || keycode == KEY_RIGHTCTRL
}

/// Check if keycode is an Alt key
#[inline]
pub const fn is_alt_key(keycode: u32) -> bool {
    keycode == KEY_LEFTALT || keycode == KEY_RIGHTALT
}
