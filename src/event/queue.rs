//! Fixed-capacity ring buffer of event words
//!
//! Producer is the poll cycle, consumer is the VM driver. When full, new
//! words are dropped; words already queued are never touched.

use log::warn;

use crate::constants::MIN_QUEUE_CAPACITY;
use crate::error::PalError;

/// Ring buffer of 16-bit event words
#[derive(Debug)]
pub struct EventQueue {
    slots: Box<[u16]>,
    /// Next write position
    head: usize,
    /// Next read position
    tail: usize,
    /// Words currently queued
    count: usize,
    /// Words dropped since creation (for diagnostics)
    dropped: u64,
}

impl EventQueue {
    /// Create a queue holding up to `capacity` words
    pub fn with_capacity(capacity: usize) -> Result<Self, PalError> {
        if capacity < MIN_QUEUE_CAPACITY {
            return Err(PalError::InvalidQueueCapacity {
                capacity,
                min: MIN_QUEUE_CAPACITY,
            });
        }
        Ok(Self {
            slots: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
            dropped: 0,
        })
    }

    /// Append a word; returns false (and logs) if the queue is full
    pub fn enqueue(&mut self, word: u16) -> bool {
        if self.count == self.slots.len() {
            self.dropped += 1;
            warn!(
                "event queue overflow: dropped word {:#06x} ({} dropped so far)",
                word, self.dropped
            );
            return false;
        }
        self.slots[self.head] = word;
        self.head = (self.head + 1) % self.slots.len();
        self.count += 1;
        true
    }

    /// Remove the oldest word, `None` when empty
    pub fn dequeue(&mut self) -> Option<u16> {
        if self.count == 0 {
            return None;
        }
        let word = self.slots[self.tail];
        self.tail = (self.tail + 1) % self.slots.len();
        self.count -= 1;
        Some(word)
    }

    /// Number of queued words
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Free slots left before words start being dropped
    #[inline]
    pub fn remaining(&self) -> usize {
        self.slots.len() - self.count
    }

    /// Total words dropped on overflow
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Count words dropped by a producer that found the queue too full
    pub fn note_dropped(&mut self, words: usize) {
        self.dropped += words as u64;
    }

    /// Discard everything queued
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut q = EventQueue::with_capacity(8).unwrap();
        for w in [1u16, 2, 3] {
            assert!(q.enqueue(w));
        }
        assert_eq!(q.len(), 3);
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.dequeue(), Some(3));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mut q = EventQueue::with_capacity(100).unwrap();
        for w in 0..100u16 {
            assert!(q.enqueue(w));
        }
        assert!(!q.enqueue(0xBEEF));
        assert_eq!(q.len(), 100);
        assert_eq!(q.dropped(), 1);
        for expected in 0..100u16 {
            assert_eq!(q.dequeue(), Some(expected));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_empty_dequeue_keeps_indices() {
        let mut q = EventQueue::with_capacity(4).unwrap();
        q.enqueue(7);
        q.enqueue(8);
        q.dequeue();
        let (head, tail) = (q.head, q.tail);
        q.dequeue();
        let (head2, tail2) = (q.head, q.tail);
        assert_eq!(q.dequeue(), None);
        assert_eq!((q.head, q.tail), (head2, tail2));
        assert_eq!(head, head2);
        assert_ne!(tail, tail2);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_zero_word_is_not_empty() {
        let mut q = EventQueue::with_capacity(4).unwrap();
        q.enqueue(0);
        assert_eq!(q.dequeue(), Some(0));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn test_wraparound() {
        let mut q = EventQueue::with_capacity(4).unwrap();
        for round in 0..10u16 {
            q.enqueue(round);
            q.enqueue(round + 100);
            assert_eq!(q.dequeue(), Some(round));
            assert_eq!(q.dequeue(), Some(round + 100));
        }
        assert_eq!(q.remaining(), 4);
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(matches!(
            EventQueue::with_capacity(3),
            Err(PalError::InvalidQueueCapacity { capacity: 3, .. })
        ));
        assert_eq!(EventQueue::with_capacity(4).unwrap().capacity(), 4);
    }

    #[test]
    fn test_clear() {
        let mut q = EventQueue::with_capacity(4).unwrap();
        q.enqueue(1);
        q.enqueue(2);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.dequeue(), None);
    }
}
