//! Event encoder: type + parameter + time framing onto the queue
//!
//! A timestamped event is preceded by exactly one time marker: a
//! `DeltaTime` word when the gap since the previous timestamped event fits
//! 12 bits, otherwise an `AbsoluteTime` word and two raw halves.

use log::{debug, trace, warn};

use super::{compose, EventQueue, EventType};
use crate::clock::Clock;
use crate::constants::MAX_PARAM;

/// Encodes input events into the word queue
pub struct EventEncoder {
    queue: EventQueue,
    clock: Box<dyn Clock>,
    /// Time of the last timestamped event (ms)
    last_event: u32,
    /// Debug-log every posted event
    log_events: bool,
}

impl EventEncoder {
    pub fn new(queue: EventQueue, clock: Box<dyn Clock>) -> Self {
        Self {
            queue,
            clock,
            last_event: 0,
            log_events: false,
        }
    }

    /// Current clock reading (ms)
    #[inline]
    pub fn now(&self) -> u32 {
        self.clock.now_ms()
    }

    /// Post one event, optionally preceded by a time marker
    ///
    /// The event and its time marker are queued together or not at all.
    /// Returns false if the event was dropped because the queue is full.
    pub fn post(&mut self, ty: EventType, param: u16, with_time: bool) -> bool {
        debug_assert!(ty.is_postable(), "{:?} cannot be posted directly", ty);

        let now = self.clock.now_ms();
        let diff = now.wrapping_sub(self.last_event);
        let absolute = with_time && diff > MAX_PARAM as u32;
        let needed = match (with_time, absolute) {
            (false, _) => 1,
            (true, false) => 2,
            (true, true) => 4,
        };

        if self.queue.remaining() < needed {
            self.queue.note_dropped(needed);
            warn!(
                "event queue full: dropped {:?}({}) ({} words dropped so far)",
                ty,
                param & MAX_PARAM,
                self.queue.dropped()
            );
            return false;
        }

        let mut queued = true;
        if with_time {
            self.last_event = now;
            if absolute {
                queued &= self.push(compose(EventType::AbsoluteTime, 0));
                queued &= self.push((now >> 16) as u16);
                queued &= self.push(now as u16);
            } else {
                queued &= self.push(compose(EventType::DeltaTime, diff as u16));
            }
        }

        queued &= self.push(compose(ty, param));

        if self.log_events {
            debug!(
                "post {:?}({}) time={} queued={} depth={}",
                ty,
                param & MAX_PARAM,
                with_time,
                queued,
                self.queue.len()
            );
        }
        queued
    }

    fn push(&mut self, word: u16) -> bool {
        trace!("enqueue {:#06x}", word);
        self.queue.enqueue(word)
    }

    /// Pop the oldest word for the VM
    #[inline]
    pub fn next_word(&mut self) -> Option<u16> {
        self.queue.dequeue()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Drop all queued words (time base is kept)
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Forget queued words and the time base
    pub fn reset(&mut self) {
        self.queue.clear();
        self.last_event = 0;
    }

    pub fn last_event(&self) -> u32 {
        self.last_event
    }

    pub fn set_log_events(&mut self, on: bool) {
        self.log_events = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event::decompose;

    fn encoder(start: u32) -> (EventEncoder, ManualClock) {
        let clock = ManualClock::new(start);
        let queue = EventQueue::with_capacity(100).unwrap();
        (EventEncoder::new(queue, Box::new(clock.clone())), clock)
    }

    fn drain(enc: &mut EventEncoder) -> Vec<u16> {
        std::iter::from_fn(|| enc.next_word()).collect()
    }

    #[test]
    fn test_delta_time_prefix() {
        let (mut enc, clock) = encoder(1000);
        enc.post(EventType::XLocation, 5, true);
        clock.advance(4095);
        enc.post(EventType::YLocation, 7, true);

        let words = drain(&mut enc);
        assert_eq!(words.len(), 4);
        // First post: 1000 ms since the zero time base
        assert_eq!(decompose(words[0]), (0, 1000));
        assert_eq!(decompose(words[1]), (1, 5));
        assert_eq!(decompose(words[2]), (0, 4095));
        assert_eq!(decompose(words[3]), (2, 7));
        assert_eq!(enc.last_event(), 5095);
    }

    #[test]
    fn test_absolute_time_fallback() {
        let (mut enc, clock) = encoder(0);
        clock.set(0x0012_3456);
        enc.post(EventType::BiStateOn, 130, true);

        let words = drain(&mut enc);
        assert_eq!(words.len(), 4);
        assert_eq!(decompose(words[0]), (5, 0));
        let time = ((words[1] as u32) << 16) | words[2] as u32;
        assert_eq!(time, 0x0012_3456);
        assert_eq!(decompose(words[3]), (3, 130));
        assert_eq!(enc.last_event(), 0x0012_3456);
    }

    #[test]
    fn test_boundary_4096_is_absolute() {
        let (mut enc, clock) = encoder(0);
        enc.post(EventType::XLocation, 1, true);
        drain(&mut enc);
        clock.advance(4096);
        enc.post(EventType::XLocation, 2, true);
        let words = drain(&mut enc);
        assert_eq!(decompose(words[0]).0, EventType::AbsoluteTime as u16);
        assert_eq!(words.len(), 4);
    }

    #[test]
    fn test_untimed_post() {
        let (mut enc, clock) = encoder(50);
        clock.advance(10);
        enc.post(EventType::BiStateOff, 8, false);
        assert_eq!(drain(&mut enc), vec![compose(EventType::BiStateOff, 8)]);
        assert_eq!(enc.last_event(), 0);
    }

    #[test]
    fn test_overflow_reports_loss() {
        let clock = ManualClock::new(0);
        let queue = EventQueue::with_capacity(4).unwrap();
        let mut enc = EventEncoder::new(queue, Box::new(clock));
        assert!(enc.post(EventType::XLocation, 1, true));
        assert!(enc.post(EventType::XLocation, 2, true));
        assert!(!enc.post(EventType::XLocation, 3, true));
        assert_eq!(enc.queue().len(), 4);
    }

    #[test]
    fn test_overflow_never_splits_absolute_time() {
        let clock = ManualClock::new(0);
        let queue = EventQueue::with_capacity(4).unwrap();
        let mut enc = EventEncoder::new(queue, Box::new(clock.clone()));
        assert!(enc.post(EventType::BiStateOn, 9, true));

        // Two slots left, an AbsoluteTime event needs four
        clock.set(100_000);
        assert!(!enc.post(EventType::BiStateOff, 9, true));
        assert_eq!(enc.queue().len(), 2);
        assert_eq!(enc.last_event(), 0);
        assert_eq!(enc.queue().dropped(), 4);

        // A short gap still fits as DeltaTime + event
        clock.set(10);
        assert!(enc.post(EventType::BiStateOn, 32, true));
        assert_eq!(
            drain(&mut enc),
            vec![
                compose(EventType::DeltaTime, 0),
                compose(EventType::BiStateOn, 9),
                compose(EventType::DeltaTime, 10),
                compose(EventType::BiStateOn, 32),
            ]
        );
    }

    #[test]
    fn test_reset_forgets_time_base() {
        let (mut enc, clock) = encoder(0);
        clock.set(100);
        enc.post(EventType::XLocation, 1, true);
        enc.reset();
        assert!(enc.queue().is_empty());
        assert_eq!(enc.last_event(), 0);
    }
}
