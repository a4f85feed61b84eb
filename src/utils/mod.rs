//! Utility functions shared across monopal
//!
//! Common helpers that don't fit in specialized modules.

pub mod color;

pub use color::{format_hex_color, parse_hex_argb, parse_hex_color, to_argb};
