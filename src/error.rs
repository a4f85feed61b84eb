//! Error types surfaced to the embedding VM
//!
//! Host and config internals use `anyhow`; anything that crosses the
//! session boundary is converted into one of these.

use thiserror::Error;

/// Errors returned by session setup
#[derive(Debug, Error)]
pub enum PalError {
    /// Host surface creation failed (window, buffer, framebuffer, CRTC)
    #[error("host surface creation failed: {reason}")]
    Init { reason: String },

    /// Geometry outside the 12-bit coordinate range of the event protocol
    #[error("invalid display geometry {width}x{height} (each side must be 1..={max})")]
    InvalidGeometry { width: u32, height: u32, max: u32 },

    /// Queue too small to hold one absolute-time event
    #[error("event queue capacity {capacity} is too small (minimum {min})")]
    InvalidQueueCapacity { capacity: usize, min: usize },
}

/// Frame conversion failures; the frame is skipped, never fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlitError {
    #[error("display buffer too short ({len} bytes) for size {width}x{height} (need {required})")]
    BufferTooShort {
        len: usize,
        width: u32,
        height: u32,
        required: usize,
    },

    #[error("destination surface has {len} pixels, expected {expected}")]
    SurfaceSize { len: usize, expected: usize },
}
