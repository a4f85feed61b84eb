//! Input event protocol
//!
//! Every event is a 16-bit word: a 4-bit type tag in the high nibble and a
//! 12-bit parameter below it.
//!
//! ```text
//!  15    12 11                     0
//! ┌────────┬────────────────────────┐
//! │  type  │       parameter        │
//! └────────┴────────────────────────┘
//! ```
//!
//! `AbsoluteTime` is followed by two raw words (high half, then low half of
//! the millisecond timestamp).

pub mod encoder;
pub mod queue;

pub use encoder::EventEncoder;
pub use queue::EventQueue;

use crate::constants::{MAX_PARAM, TYPE_SHIFT};

/// Event type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    /// Milliseconds since the previous timestamped event
    DeltaTime = 0,
    /// Pointer X moved to the parameter
    XLocation = 1,
    /// Pointer Y moved to the parameter
    YLocation = 2,
    /// Key or button with the parameter's code went down
    BiStateOn = 3,
    /// Key or button with the parameter's code went up
    BiStateOff = 4,
    /// Followed by two raw words with the absolute time
    AbsoluteTime = 5,
}

impl EventType {
    /// Tag value to type, `None` for the unused tags 6..=15
    pub const fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Self::DeltaTime),
            1 => Some(Self::XLocation),
            2 => Some(Self::YLocation),
            3 => Some(Self::BiStateOn),
            4 => Some(Self::BiStateOff),
            5 => Some(Self::AbsoluteTime),
            _ => None,
        }
    }

    /// Types that input handlers may post; time words are produced by the encoder
    #[inline]
    pub const fn is_postable(self) -> bool {
        matches!(
            self,
            Self::XLocation | Self::YLocation | Self::BiStateOn | Self::BiStateOff
        )
    }

    /// `BiStateOn` for a press, `BiStateOff` for a release
    #[inline]
    pub const fn bistate(down: bool) -> Self {
        if down {
            Self::BiStateOn
        } else {
            Self::BiStateOff
        }
    }
}

/// Pack a type and parameter into one event word (parameter masked to 12 bits)
#[inline]
pub const fn compose(ty: EventType, param: u16) -> u16 {
    ((ty as u16) << TYPE_SHIFT) | (param & MAX_PARAM)
}

/// Split an event word into its raw tag and parameter
#[inline]
pub const fn decompose(word: u16) -> (u16, u16) {
    (word >> TYPE_SHIFT, word & MAX_PARAM)
}

/// Event as seen by a consumer of the word stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedEvent {
    DeltaTime(u16),
    AbsoluteTime(u32),
    XLocation(u16),
    YLocation(u16),
    KeyDown(u16),
    KeyUp(u16),
    /// Word with an unused type tag
    Unknown(u16),
}

/// Incremental decoder for the queued word stream
///
/// Feeds one word at a time, the way a VM driver pulls from `next_event`,
/// and reassembles the `AbsoluteTime` triad.
#[derive(Debug, Default)]
pub struct EventDecoder {
    /// Raw words still expected after an AbsoluteTime tag
    pending: u8,
    high: u16,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one word; returns an event once one is complete
    pub fn feed(&mut self, word: u16) -> Option<DecodedEvent> {
        match self.pending {
            2 => {
                self.high = word;
                self.pending = 1;
                return None;
            }
            1 => {
                self.pending = 0;
                let time = ((self.high as u32) << 16) | word as u32;
                return Some(DecodedEvent::AbsoluteTime(time));
            }
            _ => {}
        }

        let (tag, param) = decompose(word);
        let event = match EventType::from_tag(tag) {
            Some(EventType::DeltaTime) => DecodedEvent::DeltaTime(param),
            Some(EventType::XLocation) => DecodedEvent::XLocation(param),
            Some(EventType::YLocation) => DecodedEvent::YLocation(param),
            Some(EventType::BiStateOn) => DecodedEvent::KeyDown(param),
            Some(EventType::BiStateOff) => DecodedEvent::KeyUp(param),
            Some(EventType::AbsoluteTime) => {
                self.pending = 2;
                return None;
            }
            None => DecodedEvent::Unknown(word),
        };
        Some(event)
    }

    /// True while in the middle of an AbsoluteTime triad
    pub fn is_mid_event(&self) -> bool {
        self.pending != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTABLE: [EventType; 4] = [
        EventType::XLocation,
        EventType::YLocation,
        EventType::BiStateOn,
        EventType::BiStateOff,
    ];

    #[test]
    fn test_compose_decompose_full_range() {
        for ty in POSTABLE {
            for param in 0..=MAX_PARAM {
                let (tag, p) = decompose(compose(ty, param));
                assert_eq!(EventType::from_tag(tag), Some(ty));
                assert_eq!(p, param);
            }
        }
    }

    #[test]
    fn test_compose_masks_parameter() {
        assert_eq!(compose(EventType::XLocation, 0x1234), 0x1234);
        assert_eq!(compose(EventType::BiStateOn, 0xF082), 0x3082);
        assert_eq!(compose(EventType::DeltaTime, 0), 0);
    }

    #[test]
    fn test_postable_types() {
        assert!(!EventType::DeltaTime.is_postable());
        assert!(!EventType::AbsoluteTime.is_postable());
        assert!(POSTABLE.iter().all(|t| t.is_postable()));
    }

    #[test]
    fn test_decoder_absolute_triad() {
        let mut dec = EventDecoder::new();
        assert_eq!(dec.feed(compose(EventType::AbsoluteTime, 0)), None);
        assert!(dec.is_mid_event());
        assert_eq!(dec.feed(0x0001), None);
        assert_eq!(dec.feed(0x86A0), Some(DecodedEvent::AbsoluteTime(100_000)));
        assert!(!dec.is_mid_event());
        assert_eq!(
            dec.feed(compose(EventType::BiStateOn, 130)),
            Some(DecodedEvent::KeyDown(130))
        );
    }

    #[test]
    fn test_decoder_raw_words_are_not_tags() {
        // Raw time halves may look like any tag
        let mut dec = EventDecoder::new();
        dec.feed(compose(EventType::AbsoluteTime, 0));
        assert_eq!(dec.feed(0x5000), None);
        assert_eq!(dec.feed(0x3000), Some(DecodedEvent::AbsoluteTime(0x5000_3000)));
    }

    #[test]
    fn test_decoder_unknown_tag() {
        let mut dec = EventDecoder::new();
        assert_eq!(dec.feed(0x7001), Some(DecodedEvent::Unknown(0x7001)));
    }
}
