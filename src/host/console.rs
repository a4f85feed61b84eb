//! Linux console host
//!
//! Shows the frame on a DRM dumb buffer (centered, border in paper color)
//! and reads keyboard/mouse through libinput. Needs access to
//! /dev/dri/card* and /dev/input/event* and no running display server.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use std::rc::Rc;
use std::sync::Once;
use std::time::{Duration, Instant};

use super::{Host, HostEvent};
use crate::config::Config;
use crate::drm::{
    clear_shutdown_request, find_drm_device, set_crtc, setup_panic_hook, setup_signal_handlers,
    shutdown_requested, Device, DisplayConfig, DumbFramebuffer, SavedCrtc, TtyGuard,
};
use crate::frame::{Cursor, Frame, Palette};
use crate::input::evdev::EvdevInput;

/// Arrow shown until the VM supplies a cursor (16×16, 1bpp)
const DEFAULT_CURSOR: [u8; 32] = [
    0x80, 0x00, 0xC0, 0x00, 0xE0, 0x00, 0xF0, 0x00, //
    0xF8, 0x00, 0xFC, 0x00, 0xFE, 0x00, 0xFF, 0x00, //
    0xF8, 0x00, 0xD8, 0x00, 0x8C, 0x00, 0x0C, 0x00, //
    0x06, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, //
];

static PROCESS_HOOKS: Once = Once::new();

/// Scanout state for one `init`
///
/// Fields drop in order: the saved CRTC is restored before our framebuffer
/// goes away, and the console returns to text mode last.
pub struct ConsoleSurface {
    saved: SavedCrtc,
    fb: DumbFramebuffer,
    origin: (u32, u32),
    width: u32,
    height: u32,
    /// Frame plus cursor, ready to copy out
    composed: Vec<u32>,
    _tty: Option<TtyGuard>,
}

/// DRM + libinput host
pub struct ConsoleHost {
    device: Rc<Device>,
    input: EvdevInput,
    prefer_external: bool,
    palette: Palette,
    cursor: Cursor,
    default_cursor: Cursor,
    /// Frame origin on screen for the current surface
    origin: (u32, u32),
}

impl ConsoleHost {
    /// Open the DRM device and input devices named by the config
    pub fn new(config: &Config) -> Result<Self> {
        PROCESS_HOOKS.call_once(|| {
            setup_signal_handlers();
            setup_panic_hook();
        });

        let path = if config.display.device.is_empty() {
            find_drm_device()?
        } else {
            config.display.device.clone()
        };
        let mut device = Device::open(&path)?;
        device.set_master()?;

        let input = EvdevInput::new(&config.keyboard).context("Failed to initialize input")?;

        let default_cursor = Cursor::from_bitmap(&DEFAULT_CURSOR, 16, 16)
            .ok_or_else(|| anyhow!("Invalid built-in cursor"))?;

        Ok(Self {
            device: Rc::new(device),
            input,
            prefer_external: config.display.prefer_external,
            palette: config.palette(),
            cursor: default_cursor.clone(),
            default_cursor,
            origin: (0, 0),
        })
    }

    /// Screen position → framebuffer position
    fn to_frame(&self, event: HostEvent) -> HostEvent {
        match event {
            HostEvent::Motion { x, y } => HostEvent::Motion {
                x: x - self.origin.0 as i32,
                y: y - self.origin.1 as i32,
            },
            other => other,
        }
    }

    fn pointer_in_frame(&self) -> (i32, i32) {
        let (x, y) = self.input.mouse_position();
        (
            x as i32 - self.origin.0 as i32,
            y as i32 - self.origin.1 as i32,
        )
    }
}

/// Paint the whole buffer with one XRGB color
fn fill(bytes: &mut [u8], color: u32) {
    let px = color.to_le_bytes();
    for chunk in bytes.chunks_exact_mut(4) {
        chunk.copy_from_slice(&px);
    }
}

/// Copy `width × height` pixels into the mapping at `origin`
fn copy_rows(
    bytes: &mut [u8],
    pitch: usize,
    src: &[u32],
    width: u32,
    height: u32,
    origin: (u32, u32),
) {
    let w = width as usize;
    for (y, row) in src.chunks_exact(w).take(height as usize).enumerate() {
        let start = (origin.1 as usize + y) * pitch + origin.0 as usize * 4;
        let Some(line) = bytes.get_mut(start..start + w * 4) else {
            break;
        };
        for (dst, px) in line.chunks_exact_mut(4).zip(row) {
            dst.copy_from_slice(&px.to_le_bytes());
        }
    }
}

impl Host for ConsoleHost {
    type Surface = ConsoleSurface;

    fn create_surface(&mut self, width: u32, height: u32) -> Result<ConsoleSurface> {
        let display = DisplayConfig::auto_detect(&self.device, self.prefer_external)?;
        if width > display.width || height > display.height {
            bail!(
                "{}x{} frame does not fit the {}x{} display mode",
                width,
                height,
                display.width,
                display.height
            );
        }

        let tty = match TtyGuard::acquire() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("Console not taken over: {:#}", e);
                None
            }
        };

        let mut fb = DumbFramebuffer::new(Rc::clone(&self.device), display.width, display.height)?;
        let paper = self.palette.paper;
        fb.with_pixels(|bytes, _| fill(bytes, paper))?;

        let saved = SavedCrtc::save(Rc::clone(&self.device), &display)?;
        set_crtc(&self.device, &display, &fb)?;

        let origin = display.centered_origin(width, height);
        self.origin = origin;
        self.input.reset();
        self.input.set_screen_size(display.width, display.height);

        info!(
            "Console surface {}x{} at ({}, {}) on {}x{}",
            width, height, origin.0, origin.1, display.width, display.height
        );

        Ok(ConsoleSurface {
            saved,
            fb,
            origin,
            width,
            height,
            composed: vec![paper; width as usize * height as usize],
            _tty: tty,
        })
    }

    fn present(&mut self, surface: &mut ConsoleSurface, frame: &Frame) -> Result<()> {
        if frame.width() != surface.width || frame.height() != surface.height {
            bail!(
                "frame is {}x{}, surface is {}x{}",
                frame.width(),
                frame.height(),
                surface.width,
                surface.height
            );
        }

        let (px, py) = self.pointer_in_frame();
        let ConsoleSurface {
            fb,
            composed,
            origin,
            width,
            height,
            ..
        } = surface;

        composed.copy_from_slice(frame.pixels());
        self.cursor
            .overlay(composed, *width, *height, px, py, self.palette.ink);

        fb.with_pixels(|bytes, pitch| {
            copy_rows(bytes, pitch, composed.as_slice(), *width, *height, *origin)
        })
    }

    fn wait_event(&mut self, timeout: Duration) -> Option<HostEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if shutdown_requested() {
                clear_shutdown_request();
                info!("Shutdown signal received");
                return Some(HostEvent::Quit);
            }

            let now = Instant::now();
            self.input.generate_repeats(now);
            if let Some(event) = self.input.pop_event() {
                return Some(self.to_frame(event));
            }
            if now >= deadline {
                return None;
            }

            let wake = self
                .input
                .next_repeat()
                .map_or(deadline, |r| r.min(deadline));
            let ms = wake
                .saturating_duration_since(now)
                .as_micros()
                .div_ceil(1000)
                .min(i32::MAX as u128) as i32;

            let mut pfd = libc::pollfd {
                fd: self.input.fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let ret = unsafe { libc::poll(&mut pfd, 1, ms) };
            if ret < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                warn!("poll failed: {}", err);
                return None;
            }
            if ret > 0 {
                self.input.dispatch();
            }
        }
    }

    fn set_cursor(&mut self, cursor: Option<Cursor>) {
        match cursor {
            Some(c) => {
                debug!("Cursor set: {}x{}", c.width(), c.height());
                self.cursor = c;
            }
            None => self.cursor = self.default_cursor.clone(),
        }
    }

    fn warp_pointer(&mut self, x: i32, y: i32) {
        self.input.set_position(
            (x + self.origin.0 as i32) as f64,
            (y + self.origin.1 as i32) as f64,
        );
    }
}
