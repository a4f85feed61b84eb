//! Host platform abstraction
//!
//! The session talks to the host only through [`Host`]: creating a
//! presentation surface, presenting converted frames, waiting for input,
//! and forwarding cursor requests. Everything behind it is replaceable.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │          Session (poll cycle)            │
//! ├──────────────────────────────────────────┤
//! │  Host::wait_event  →  Key/Mouse handler │
//! │                          ↓               │
//! │          FrameBlitter → Host::present    │
//! └──────────────────────────────────────────┘
//! ```

#[cfg(feature = "console")]
pub mod console;

#[cfg(feature = "console")]
pub use console::ConsoleHost;

use anyhow::Result;
use bitflags::bitflags;
use std::time::Duration;

use crate::frame::{Cursor, Frame};

bitflags! {
    /// Modifier keys held on the host when an event was generated
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct HostMods: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

/// Host key identity (layout-independent where it matters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKey {
    Backspace,
    Tab,
    Return,
    Escape,
    Space,
    Delete,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    CapsLock,
    Left,
    Right,
    Up,
    Down,
    /// Unmodified character on the key (lowercase for letters)
    Char(char),
    /// Anything else, by host-specific code
    Other(u32),
}

/// Host mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostButton {
    Left,
    Middle,
    Right,
    Other(u32),
}

/// One input notification from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Window closed, application terminating, or shutdown signal
    Quit,
    /// Physical key transition
    Key {
        key: HostKey,
        down: bool,
        mods: HostMods,
    },
    /// Text produced by a key press (UTF-8)
    Text(String),
    /// Pointer moved to absolute framebuffer coordinates (unclamped)
    Motion { x: i32, y: i32 },
    /// Mouse button transition
    Button { button: HostButton, down: bool },
}

/// Host windowing/input backend
pub trait Host {
    /// Presentation surface; releases its host resources on drop
    type Surface;

    /// Create a surface able to show a `width × height` frame
    fn create_surface(&mut self, width: u32, height: u32) -> Result<Self::Surface>;

    /// Show a converted frame
    fn present(&mut self, surface: &mut Self::Surface, frame: &Frame) -> Result<()>;

    /// Block up to `timeout` for the next input notification
    fn wait_event(&mut self, timeout: Duration) -> Option<HostEvent>;

    /// Replace the pointer image (`None` restores the default)
    fn set_cursor(&mut self, cursor: Option<Cursor>);

    /// Move the pointer to framebuffer coordinates
    fn warp_pointer(&mut self, x: i32, y: i32);
}
