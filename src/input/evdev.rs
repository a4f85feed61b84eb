//! evdev input handling
//!
//! Use libinput + xkbcommon to read keyboard/mouse events directly from
//! /dev/input/eventN and turn them into host events.
//!
//! Positions are in screen pixels; the console host shifts them into
//! framebuffer coordinates.

use anyhow::{anyhow, Result};
use input::event::keyboard::{KeyState, KeyboardEventTrait};
use input::event::pointer::ButtonState;
use input::event::{Event, PointerEvent};
use input::{Libinput, LibinputInterface};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;
use std::time::{Duration, Instant};
use xkbcommon::xkb;

use super::keycodes::*;
use crate::config::KeyboardInputConfig;
use crate::host::{HostButton, HostEvent, HostKey, HostMods};

/// LibinputInterface implementation for libinput
struct InputInterface;

impl LibinputInterface for InputInterface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> std::result::Result<OwnedFd, i32> {
        let f = OpenOptions::new()
            .read(true)
            .write((flags & libc::O_WRONLY != 0) || (flags & libc::O_RDWR != 0))
            .custom_flags(flags & !libc::O_WRONLY & !libc::O_RDWR & !libc::O_RDONLY)
            .open(path)
            .map_err(|e| {
                warn!("Cannot open device: {:?}: {}", path, e);
                e.raw_os_error().unwrap_or(-libc::ENOENT)
            })?;
        Ok(OwnedFd::from(f))
    }

    fn close_restricted(&mut self, fd: OwnedFd) {
        drop(fd);
    }
}

/// Key currently auto-repeating its text
struct HeldKey {
    keycode: u32,
    text: String,
    next_repeat: Instant,
}

// evdev keycodes with a fixed host key
const KEY_ESC: u32 = 1;
const KEY_BACKSPACE: u32 = 14;
const KEY_TAB: u32 = 15;
const KEY_ENTER: u32 = 28;
const KEY_SPACE: u32 = 57;
const KEY_KPENTER: u32 = 96;
const KEY_UP: u32 = 103;
const KEY_LEFT: u32 = 105;
const KEY_RIGHT: u32 = 106;
const KEY_DOWN: u32 = 108;
const KEY_DELETE: u32 = 111;

/// Named host key for an evdev keycode
fn named_key(keycode: u32) -> Option<HostKey> {
    let key = match keycode {
        KEY_BACKSPACE => HostKey::Backspace,
        KEY_TAB => HostKey::Tab,
        KEY_ENTER | KEY_KPENTER => HostKey::Return,
        KEY_ESC => HostKey::Escape,
        KEY_SPACE => HostKey::Space,
        KEY_DELETE => HostKey::Delete,
        KEY_LEFTSHIFT => HostKey::LeftShift,
        KEY_RIGHTSHIFT => HostKey::RightShift,
        KEY_LEFTCTRL => HostKey::LeftCtrl,
        KEY_RIGHTCTRL => HostKey::RightCtrl,
        KEY_CAPSLOCK => HostKey::CapsLock,
        KEY_LEFT => HostKey::Left,
        KEY_RIGHT => HostKey::Right,
        KEY_UP => HostKey::Up,
        KEY_DOWN => HostKey::Down,
        _ => return None,
    };
    Some(key)
}

/// Host mouse button for an evdev button code
pub fn host_button(button: u32) -> HostButton {
    match button {
        BTN_LEFT => HostButton::Left,
        BTN_MIDDLE => HostButton::Middle,
        BTN_RIGHT => HostButton::Right,
        other => HostButton::Other(other),
    }
}

/// First character of `text` if it can be typed (not a control character)
fn printable(text: &str) -> Option<&str> {
    match text.chars().next() {
        Some(c) if !c.is_control() => Some(text),
        _ => None,
    }
}

/// evdev input management (keyboard + mouse)
pub struct EvdevInput {
    /// libinput context
    input: Libinput,
    /// Compiled keymap (for unmodified keysyms)
    keymap: xkb::Keymap,
    /// xkbcommon keyboard state
    xkb_state: xkb::State,
    /// libinput raw fd (for poll)
    fd: RawFd,
    /// Shift physical key pressed tracking
    shift_pressed: bool,
    /// Ctrl physical key pressed tracking
    ctrl_pressed: bool,
    /// Alt physical key pressed tracking
    alt_pressed: bool,
    /// Mouse X coordinate (screen pixels)
    mouse_x: f64,
    /// Mouse Y coordinate (screen pixels)
    mouse_y: f64,
    /// Screen width (for mouse coordinate clamping)
    screen_width: f64,
    /// Screen height (for mouse coordinate clamping)
    screen_height: f64,
    /// Text key being auto-repeated
    held: Option<HeldKey>,
    repeat_delay: Duration,
    repeat_rate: Duration,
    /// Events translated but not yet handed out
    pending: VecDeque<HostEvent>,
}

impl EvdevInput {
    /// Initialize evdev input
    ///
    /// Scan /dev/input/event* and add devices to libinput.
    /// Set up keymap with xkbcommon.
    pub fn new(kb_config: &KeyboardInputConfig) -> Result<Self> {
        let mut input = Libinput::new_from_path(InputInterface);

        let mut device_count = 0;
        for entry in std::fs::read_dir("/dev/input")
            .map_err(|e| anyhow!("Cannot scan /dev/input: {}", e))?
        {
            let path = entry?.path();
            let is_event = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("event"));
            if !is_event {
                continue;
            }
            let Some(path_str) = path.to_str() else {
                continue;
            };
            if input.path_add_device(path_str).is_some() {
                debug!("Input device added: {}", path_str);
                device_count += 1;
            }
        }

        if device_count == 0 {
            return Err(anyhow!(
                "No input devices found. Check permissions for /dev/input/event*."
            ));
        }

        info!("evdev: {} input devices added", device_count);

        let fd = input.as_raw_fd();

        // Set fd to non-blocking
        let flags = nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_GETFL)
            .map_err(|e| anyhow!("F_GETFL failed: {}", e))?;
        let mut flags = nix::fcntl::OFlag::from_bits_truncate(flags);
        flags.insert(nix::fcntl::OFlag::O_NONBLOCK);
        nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_SETFL(flags))
            .map_err(|e| anyhow!("F_SETFL failed: {}", e))?;

        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let options = if kb_config.xkb_options.is_empty() {
            None
        } else {
            Some(kb_config.xkb_options.clone())
        };

        let keymap = xkb::Keymap::new_from_names(
            &context,
            "",
            kb_config.xkb_model.as_str(),
            kb_config.xkb_layout.as_str(),
            kb_config.xkb_variant.as_str(),
            options,
            xkb::COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| {
            anyhow!(
                "Failed to create xkb keymap (model={}, layout={}, variant={}, options={})",
                kb_config.xkb_model,
                kb_config.xkb_layout,
                kb_config.xkb_variant,
                kb_config.xkb_options
            )
        })?;

        let xkb_state = xkb::State::new(&keymap);

        info!(
            "evdev keyboard initialized (layout={}, repeat_delay={}ms, repeat_rate={}ms)",
            if kb_config.xkb_layout.is_empty() {
                "default"
            } else {
                &kb_config.xkb_layout
            },
            kb_config.repeat_delay,
            kb_config.repeat_rate
        );

        Ok(Self {
            input,
            keymap,
            xkb_state,
            fd,
            shift_pressed: false,
            ctrl_pressed: false,
            alt_pressed: false,
            mouse_x: 0.0,
            mouse_y: 0.0,
            screen_width: 1.0,
            screen_height: 1.0,
            held: None,
            repeat_delay: Duration::from_millis(kb_config.repeat_delay),
            repeat_rate: Duration::from_millis(kb_config.repeat_rate.max(1)),
            pending: VecDeque::new(),
        })
    }

    /// Return libinput fd (for poll)
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Set the clamping area and center the pointer in it
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_width = width.max(1) as f64;
        self.screen_height = height.max(1) as f64;
        self.mouse_x = (self.screen_width / 2.0).floor();
        self.mouse_y = (self.screen_height / 2.0).floor();
    }

    /// Move the pointer without reporting motion
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.mouse_x = x.clamp(0.0, self.screen_width - 1.0);
        self.mouse_y = y.clamp(0.0, self.screen_height - 1.0);
    }

    /// Get current mouse position (screen pixels)
    pub fn mouse_position(&self) -> (f64, f64) {
        (self.mouse_x, self.mouse_y)
    }

    fn mods(&self) -> HostMods {
        let mut mods = HostMods::empty();
        mods.set(HostMods::SHIFT, self.shift_pressed);
        mods.set(HostMods::CTRL, self.ctrl_pressed);
        mods.set(HostMods::ALT, self.alt_pressed);
        mods
    }

    /// Next translated event, if any
    pub fn pop_event(&mut self) -> Option<HostEvent> {
        self.pending.pop_front()
    }

    /// When the held key next repeats
    pub fn next_repeat(&self) -> Option<Instant> {
        self.held.as_ref().map(|h| h.next_repeat)
    }

    /// Drop pending events and held-key state
    pub fn reset(&mut self) {
        self.pending.clear();
        self.held = None;
    }

    /// Read everything libinput has and translate it
    pub fn dispatch(&mut self) {
        if let Err(e) = self.input.dispatch() {
            warn!("libinput dispatch error: {}", e);
            return;
        }

        while let Some(event) = self.input.next() {
            match event {
                Event::Keyboard(input::event::KeyboardEvent::Key(key_event)) => {
                    self.handle_key(key_event.key(), key_event.key_state());
                }
                Event::Pointer(ptr_event) => self.handle_pointer(ptr_event),
                _ => {}
            }
        }
    }

    fn handle_key(&mut self, evdev_code: u32, key_state: KeyState) {
        let pressed = key_state == KeyState::Pressed;
        // evdev keycode -> xkb keycode (evdev + 8)
        let xkb_keycode = xkb::Keycode::new(evdev_code + 8);

        // Text before the state update, so the key's own modifier does not apply
        let utf8 = self.xkb_state.key_get_utf8(xkb_keycode);

        match evdev_code {
            _ if is_shift_key(evdev_code) => self.shift_pressed = pressed,
            _ if is_ctrl_key(evdev_code) => self.ctrl_pressed = pressed,
            _ if is_alt_key(evdev_code) => self.alt_pressed = pressed,
            _ => {}
        }

        let direction = if pressed {
            xkb::KeyDirection::Down
        } else {
            xkb::KeyDirection::Up
        };
        self.xkb_state.update_key(xkb_keycode, direction);

        let base = self.base_text(xkb_keycode);
        let key = named_key(evdev_code).unwrap_or_else(|| {
            match base.chars().next() {
                Some(c) if c.is_ascii_graphic() => HostKey::Char(c.to_ascii_lowercase()),
                _ => HostKey::Other(evdev_code),
            }
        });

        trace!("key {} {:?} -> {:?}", evdev_code, key_state, key);
        self.pending.push_back(HostEvent::Key {
            key,
            down: pressed,
            mods: self.mods(),
        });

        if !pressed {
            if self.held.as_ref().is_some_and(|h| h.keycode == evdev_code) {
                self.held = None;
            }
            return;
        }

        // Named keys (space, return, ...) are handled from the key event alone
        if !matches!(key, HostKey::Char(_) | HostKey::Other(_)) || is_modifier_key(evdev_code) {
            return;
        }

        // With ctrl held xkb yields control characters; use the plain key instead
        let text = if self.ctrl_pressed { base } else { utf8 };
        if let Some(text) = printable(&text) {
            self.pending.push_back(HostEvent::Text(text.to_string()));
            self.held = Some(HeldKey {
                keycode: evdev_code,
                text: text.to_string(),
                next_repeat: Instant::now() + self.repeat_delay,
            });
        }
    }

    /// Character on the key's base level, ignoring modifiers
    fn base_text(&self, keycode: xkb::Keycode) -> String {
        let syms = self.keymap.key_get_syms_by_level(keycode, 0, 0);
        let Some(&sym) = syms.first() else {
            return String::new();
        };
        xkb::keysym_to_utf8(sym)
            .chars()
            .filter(|&c| c != '\0')
            .collect()
    }

    fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Motion(m) => {
                // Accumulate relative movement, clamped to screen bounds
                self.set_position(self.mouse_x + m.dx(), self.mouse_y + m.dy());
                self.push_motion();
            }
            PointerEvent::MotionAbsolute(m) => {
                // Absolute coordinates (touchpad, tablet, etc.)
                let x = m.absolute_x_transformed(self.screen_width as u32);
                let y = m.absolute_y_transformed(self.screen_height as u32);
                self.set_position(x, y);
                self.push_motion();
            }
            PointerEvent::Button(b) => {
                debug!("Mouse button: {} state={:?}", b.button(), b.button_state());
                self.pending.push_back(HostEvent::Button {
                    button: host_button(b.button()),
                    down: b.button_state() == ButtonState::Pressed,
                });
            }
            other => {
                trace!("Unhandled pointer event: {:?}", other);
            }
        }
    }

    fn push_motion(&mut self) {
        self.pending.push_back(HostEvent::Motion {
            x: self.mouse_x as i32,
            y: self.mouse_y as i32,
        });
    }

    /// Queue text repeats that are due at `now`
    pub fn generate_repeats(&mut self, now: Instant) {
        let Some(held) = self.held.as_mut() else {
            return;
        };
        if now >= held.next_repeat {
            self.pending.push_back(HostEvent::Text(held.text.clone()));
            held.next_repeat = now + self.repeat_rate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys() {
        assert_eq!(named_key(KEY_ENTER), Some(HostKey::Return));
        assert_eq!(named_key(KEY_KPENTER), Some(HostKey::Return));
        assert_eq!(named_key(KEY_LEFTSHIFT), Some(HostKey::LeftShift));
        assert_eq!(named_key(KEY_CAPSLOCK), Some(HostKey::CapsLock));
        assert_eq!(named_key(30), None);
    }

    #[test]
    fn test_host_button() {
        assert_eq!(host_button(BTN_LEFT), HostButton::Left);
        assert_eq!(host_button(BTN_MIDDLE), HostButton::Middle);
        assert_eq!(host_button(BTN_RIGHT), HostButton::Right);
        assert_eq!(host_button(0x113), HostButton::Other(0x113));
    }

    #[test]
    fn test_printable() {
        assert_eq!(printable("a"), Some("a"));
        assert_eq!(printable("\u{3}"), None);
        assert_eq!(printable(""), None);
    }
}
