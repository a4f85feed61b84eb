//! monopal - display and input layer for a monochrome workstation VM
//!
//! The VM owns a 1-bit-per-pixel framebuffer and reads input as a stream of
//! 16-bit event words. monopal shows the framebuffer on a host surface and
//! turns host keyboard/mouse input into those words.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                Session                   │
//! ├──────────────────────────────────────────┤
//! │  Host input  →  Key/Mouse translation   │
//! │                          ↓               │
//! │        EventEncoder → EventQueue → VM    │
//! │                                          │
//! │  VM framebuffer → FrameBlitter → Host    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! With the `console` feature the host is the Linux console (DRM dumb
//! buffer + libinput), and a C ABI is exported for VMs written in C.

pub mod clock;
pub mod config;
pub mod constants;
#[cfg(feature = "console")]
pub mod drm;
pub mod error;
pub mod event;
#[cfg(feature = "console")]
pub mod ffi;
pub mod frame;
pub mod host;
pub mod input;
pub mod session;
pub mod utils;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Config;
pub use error::{BlitError, PalError};
pub use event::{DecodedEvent, EventDecoder, EventType};
pub use frame::{Cursor, Frame, FrameView, Palette, Rect};
pub use host::{Host, HostButton, HostEvent, HostKey, HostMods};
pub use session::{IdleHook, PollStatus, Session};
