//! Keyboard translation to legacy keycodes
//!
//! Two channels feed the translator:
//! - control/navigation keys arrive as key transitions and map to fixed codes
//! - printable characters arrive as decoded text and map to the key that
//!   carries them on the legacy layout, plus whether shift must be held
//!
//! The legacy keyboard reports press/release per key, so a shifted
//! character typed on the host is bracketed with synthetic shift
//! transitions whenever the real shift state does not already match.

use log::debug;

use super::keycodes::*;
use super::ModifierState;
use crate::event::{EventEncoder, EventType};
use crate::host::HostKey;

/// How a printable character is produced on the legacy keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Key labelled with the character itself, shift released
    Plain(u8),
    /// Base key that yields the character with shift held
    Shifted(u8),
}

impl CharClass {
    #[inline]
    pub fn keycode(self) -> u16 {
        match self {
            Self::Plain(c) | Self::Shifted(c) => c as u16,
        }
    }

    #[inline]
    pub fn needs_shift(self) -> bool {
        matches!(self, Self::Shifted(_))
    }
}

/// Classify a printable ASCII code point; `None` means no legacy key types it
pub fn classify_char(ch: u16) -> Option<CharClass> {
    if !(b'!' as u16..=b'~' as u16).contains(&ch) {
        return None;
    }
    let c = ch as u8;
    if is_plain_char(c) {
        return Some(CharClass::Plain(c));
    }
    shifted_base(c).map(CharClass::Shifted)
}

/// Characters on unshifted legacy keys
fn is_plain_char(c: u8) -> bool {
    c.is_ascii_lowercase()
        || c.is_ascii_digit()
        || matches!(
            c,
            b'-' | b'=' | b'\\' | b'[' | b']' | b';' | b'\'' | b',' | b'.' | b'/'
        )
}

/// Base key for a shifted character
fn shifted_base(c: u8) -> Option<u8> {
    let base = match c {
        // '+' is printed on the '=' key: shift-down '=' shift-up
        b'+' => b'=',
        b'_' => b'-',
        b'|' => b'\\',
        b'{' => b'[',
        b'}' => b']',
        b':' => b';',
        b'"' => b'\'',
        b'<' => b',',
        b'>' => b'.',
        b'?' => b'/',
        b'!' => b'1',
        b'@' => b'2',
        b'#' => b'3',
        b'$' => b'4',
        b'%' => b'5',
        b'~' => b'6',
        b'&' => b'7',
        b'*' => b'8',
        b'(' => b'9',
        b')' => b'0',
        b'A'..=b'Z' => c.to_ascii_lowercase(),
        _ => return None,
    };
    Some(base)
}

/// First code point of UTF-8 text, 1- and 2-byte sequences only
///
/// Longer sequences (and malformed lead bytes) decode to 0, which no
/// legacy key produces.
pub fn decode_first_char(bytes: &[u8]) -> u16 {
    let Some(&lead) = bytes.first() else {
        return 0;
    };
    if lead <= 0x7F {
        return lead as u16;
    }
    if (0xC0..=0xDF).contains(&lead) {
        let cont = bytes.get(1).copied().unwrap_or(0);
        return (((lead & 0x1F) as u16) << 6) | (cont & 0x3F) as u16;
    }
    0
}

/// Fixed legacy code for a control/navigation key
fn control_keycode(key: HostKey) -> Option<u16> {
    let code = match key {
        HostKey::Backspace => LEGACY_BACKSPACE,
        HostKey::Tab => LEGACY_TAB,
        HostKey::Return => LEGACY_RETURN,
        HostKey::Escape => LEGACY_ESCAPE,
        HostKey::Space => LEGACY_SPACE,
        HostKey::Delete => LEGACY_DELETE,
        HostKey::LeftShift | HostKey::RightShift => LEGACY_SHIFT,
        HostKey::LeftCtrl | HostKey::RightCtrl => LEGACY_CTRL,
        HostKey::CapsLock => LEGACY_CAPS_LOCK,
        HostKey::Left => LEGACY_LEFT_ARROW,
        HostKey::Up => LEGACY_UP_ARROW,
        _ => return None,
    };
    Some(code)
}

/// Keyboard translator over the session's encoder and modifier state
pub struct KeyTranslator<'a> {
    encoder: &'a mut EventEncoder,
    mods: &'a mut ModifierState,
}

impl<'a> KeyTranslator<'a> {
    pub fn new(encoder: &'a mut EventEncoder, mods: &'a mut ModifierState) -> Self {
        Self { encoder, mods }
    }

    /// Handle a control/navigation key transition
    ///
    /// Returns false for keys with no legacy counterpart (characters come
    /// through [`Self::char_event`]).
    pub fn key_event(&mut self, key: HostKey, down: bool) -> bool {
        let Some(code) = control_keycode(key) else {
            return false;
        };
        match key {
            HostKey::LeftShift | HostKey::RightShift => self.mods.shift_down = down,
            HostKey::LeftCtrl | HostKey::RightCtrl => self.mods.ctrl_down = down,
            HostKey::CapsLock => self.mods.caps_lock_down = down,
            _ => {}
        }
        self.encoder.post(EventType::bistate(down), code, true)
    }

    /// Handle one transition of a printable character
    ///
    /// Returns false if the character has no legacy key.
    pub fn char_event(&mut self, ch: u16, down: bool) -> bool {
        let Some(class) = classify_char(ch) else {
            debug!("no legacy key for character {:#x}", ch);
            return false;
        };
        let required = class.needs_shift();
        if down {
            self.send_shift(true, required);
        }
        let queued = self
            .encoder
            .post(EventType::bistate(down), class.keycode(), true);
        if !down {
            self.send_shift(false, required);
        }
        queued
    }

    /// Type a character from the host text stream: press then release
    pub fn type_char(&mut self, ch: u16) -> bool {
        if classify_char(ch).is_none() {
            debug!("no legacy key for character {:#x}", ch);
            return false;
        }
        let pressed = self.char_event(ch, true);
        let released = self.char_event(ch, false);
        pressed && released
    }

    /// Emit a shift transition only where the held state disagrees with
    /// what the character needs
    ///
    /// On the press side a missing shift is pressed and an unwanted one
    /// released; the release side mirrors that.
    pub fn send_shift(&mut self, key_press: bool, shift_required: bool) {
        if shift_required && !self.mods.shift_down {
            self.encoder
                .post(EventType::bistate(key_press), LEGACY_SHIFT, true);
        } else if !shift_required && self.mods.shift_down {
            self.encoder
                .post(EventType::bistate(!key_press), LEGACY_SHIFT, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::{decompose, EventQueue};

    fn encoder() -> EventEncoder {
        let queue = EventQueue::with_capacity(100).unwrap();
        EventEncoder::new(queue, Box::new(ManualClock::new(0)))
    }

    /// Event words without their DeltaTime prefixes
    fn events(enc: &mut EventEncoder) -> Vec<(u16, u16)> {
        std::iter::from_fn(|| enc.next_word())
            .map(decompose)
            .filter(|&(tag, _)| tag != EventType::DeltaTime as u16)
            .collect()
    }

    const ON: u16 = EventType::BiStateOn as u16;
    const OFF: u16 = EventType::BiStateOff as u16;

    #[test]
    fn test_classify() {
        assert_eq!(classify_char(b'a' as u16), Some(CharClass::Plain(b'a')));
        assert_eq!(classify_char(b'7' as u16), Some(CharClass::Plain(b'7')));
        assert_eq!(classify_char(b'/' as u16), Some(CharClass::Plain(b'/')));
        assert_eq!(classify_char(b'Q' as u16), Some(CharClass::Shifted(b'q')));
        assert_eq!(classify_char(b'+' as u16), Some(CharClass::Shifted(b'=')));
        assert_eq!(classify_char(b'~' as u16), Some(CharClass::Shifted(b'6')));
        assert_eq!(classify_char(b')' as u16), Some(CharClass::Shifted(b'0')));
        // '^' and '`' have no legacy key
        assert_eq!(classify_char(b'^' as u16), None);
        assert_eq!(classify_char(b'`' as u16), None);
        assert_eq!(classify_char(b' ' as u16), None);
        assert_eq!(classify_char(0xE9), None);
    }

    #[test]
    fn test_decode_first_char() {
        assert_eq!(decode_first_char(b"a"), b'a' as u16);
        assert_eq!(decode_first_char("é".as_bytes()), 0xE9);
        assert_eq!(decode_first_char("€".as_bytes()), 0);
        assert_eq!(decode_first_char("😀".as_bytes()), 0);
        assert_eq!(decode_first_char(b""), 0);
    }

    #[test]
    fn test_control_keys() {
        let mut enc = encoder();
        let mut mods = ModifierState::default();
        let mut kt = KeyTranslator::new(&mut enc, &mut mods);
        assert!(kt.key_event(HostKey::Return, true));
        assert!(kt.key_event(HostKey::Return, false));
        assert!(kt.key_event(HostKey::Up, true));
        assert!(!kt.key_event(HostKey::Right, true));
        assert!(!kt.key_event(HostKey::Char('a'), true));
        assert_eq!(events(&mut enc), vec![(ON, 13), (OFF, 13), (ON, 94)]);
    }

    #[test]
    fn test_modifier_keys_update_state() {
        let mut enc = encoder();
        let mut mods = ModifierState::default();
        {
            let mut kt = KeyTranslator::new(&mut enc, &mut mods);
            kt.key_event(HostKey::RightShift, true);
            kt.key_event(HostKey::LeftCtrl, true);
            kt.key_event(HostKey::CapsLock, true);
        }
        assert!(mods.shift_down && mods.ctrl_down && mods.caps_lock_down);
        assert_eq!(events(&mut enc), vec![(ON, 136), (ON, 138), (ON, 139)]);

        KeyTranslator::new(&mut enc, &mut mods).key_event(HostKey::LeftShift, false);
        assert!(!mods.shift_down);
        assert_eq!(events(&mut enc), vec![(OFF, 136)]);
    }

    #[test]
    fn test_send_shift_only_on_mismatch() {
        let mut enc = encoder();
        let mut mods = ModifierState::default();
        let mut kt = KeyTranslator::new(&mut enc, &mut mods);
        kt.send_shift(true, false);
        kt.send_shift(false, false);
        assert!(events(&mut enc).is_empty());

        let mut kt = KeyTranslator::new(&mut enc, &mut mods);
        kt.send_shift(true, true);
        assert_eq!(events(&mut enc), vec![(ON, 136)]);

        mods.shift_down = true;
        let mut kt = KeyTranslator::new(&mut enc, &mut mods);
        kt.send_shift(true, true);
        assert!(events(&mut enc).is_empty());
        let mut kt = KeyTranslator::new(&mut enc, &mut mods);
        kt.send_shift(true, false);
        assert_eq!(events(&mut enc), vec![(OFF, 136)]);
        let mut kt = KeyTranslator::new(&mut enc, &mut mods);
        kt.send_shift(false, false);
        assert_eq!(events(&mut enc), vec![(ON, 136)]);
    }

    #[test]
    fn test_shifted_char_bracketing() {
        let mut enc = encoder();
        let mut mods = ModifierState::default();
        assert!(KeyTranslator::new(&mut enc, &mut mods).type_char(b'+' as u16));
        assert_eq!(
            events(&mut enc),
            vec![(ON, 136), (ON, b'=' as u16), (OFF, b'=' as u16), (OFF, 136)]
        );
        assert!(!mods.shift_down);
    }

    #[test]
    fn test_shifted_char_with_shift_held() {
        let mut enc = encoder();
        let mut mods = ModifierState {
            shift_down: true,
            ..Default::default()
        };
        KeyTranslator::new(&mut enc, &mut mods).type_char(b'A' as u16);
        assert_eq!(events(&mut enc), vec![(ON, b'a' as u16), (OFF, b'a' as u16)]);
    }

    #[test]
    fn test_plain_char_releases_held_shift() {
        let mut enc = encoder();
        let mut mods = ModifierState {
            shift_down: true,
            ..Default::default()
        };
        KeyTranslator::new(&mut enc, &mut mods).type_char(b'a' as u16);
        assert_eq!(
            events(&mut enc),
            vec![(OFF, 136), (ON, b'a' as u16), (OFF, b'a' as u16), (ON, 136)]
        );
    }

    #[test]
    fn test_plain_char_no_shift() {
        let mut enc = encoder();
        let mut mods = ModifierState::default();
        KeyTranslator::new(&mut enc, &mut mods).type_char(b'x' as u16);
        assert_eq!(events(&mut enc), vec![(ON, b'x' as u16), (OFF, b'x' as u16)]);
    }

    #[test]
    fn test_rejected_char_posts_nothing() {
        let mut enc = encoder();
        let mut mods = ModifierState::default();
        assert!(!KeyTranslator::new(&mut enc, &mut mods).type_char(b'^' as u16));
        assert!(!KeyTranslator::new(&mut enc, &mut mods).type_char(0));
        assert!(enc.queue().is_empty());
    }
}
