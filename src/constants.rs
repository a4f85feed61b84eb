//! Global constants for monopal
//!
//! Consolidates protocol limits, display format and timing constants
//! to eliminate magic numbers throughout the codebase.

// ============================================================================
// Event Protocol
// ============================================================================

/// Largest value a 12-bit event parameter can carry
pub const MAX_PARAM: u16 = 0x0FFF;

/// Bits the type tag is shifted by inside an event word
pub const TYPE_SHIFT: u16 = 12;

/// Queue capacity used when the config does not override it
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Smallest usable queue: one AbsoluteTime triad plus the event word
pub const MIN_QUEUE_CAPACITY: usize = 4;

// ============================================================================
// Display Format
// ============================================================================

/// Pixels packed into one framebuffer byte
pub const PIXELS_PER_BYTE: u32 = 8;

/// Scan lines are padded to a multiple of this many pixels (one 16-bit word)
pub const PIXELS_PER_WORD: u32 = 16;

/// Largest width/height addressable by 12-bit X/Y location events
pub const MAX_DIMENSION: u32 = MAX_PARAM as u32 + 1;

/// Opaque black (ARGB8888), drawn for set bits
pub const INK_ARGB: u32 = 0xFF00_0000;

/// Opaque white (ARGB8888), drawn for clear bits
pub const PAPER_ARGB: u32 = 0xFFFF_FFFF;

// ============================================================================
// Timing Constants
// ============================================================================

/// Poll timeout used by the demo driver loop in milliseconds
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 30;

/// Key repeat delay in milliseconds
pub const DEFAULT_REPEAT_DELAY_MS: u64 = 400;

/// Key repeat interval in milliseconds
pub const DEFAULT_REPEAT_RATE_MS: u64 = 30;

// ============================================================================
// Helper Functions
// ============================================================================

/// Bytes per scan line of a monochrome bitmap `width` pixels wide
#[inline]
pub const fn stride_bytes(width: u32) -> usize {
    (width.div_ceil(PIXELS_PER_WORD) * PIXELS_PER_WORD / PIXELS_PER_BYTE) as usize
}

/// Check that a geometry fits the event protocol's coordinate range
#[inline]
pub const fn is_valid_dimension(v: u32) -> bool {
    v >= 1 && v <= MAX_DIMENSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_padding() {
        assert_eq!(stride_bytes(1), 2);
        assert_eq!(stride_bytes(16), 2);
        assert_eq!(stride_bytes(17), 4);
        assert_eq!(stride_bytes(100), 14);
        assert_eq!(stride_bytes(608), 76);
    }

    #[test]
    fn test_dimension_range() {
        assert!(!is_valid_dimension(0));
        assert!(is_valid_dimension(1));
        assert!(is_valid_dimension(4096));
        assert!(!is_valid_dimension(4097));
    }
}
