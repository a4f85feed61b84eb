//! Display session
//!
//! One `Session` owns everything the VM talks to: the event encoder and
//! queue, the modifier/pointer state, the converted frame and the host
//! surface showing it.
//!
//! Lifecycle: `Uninitialized → init → Running → deinit → Uninitialized`.
//! Each `poll_events` call is one cycle: wait for at most one host event,
//! translate it, convert and present the frame, run the idle hook.

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::{Config, ParsedKeybinds};
use crate::constants::{is_valid_dimension, MAX_DIMENSION};
use crate::error::PalError;
use crate::event::{EventEncoder, EventQueue};
use crate::frame::blit::required_len;
use crate::frame::{Cursor, Frame, FrameBlitter, FrameView, Rect};
use crate::host::{Host, HostEvent};
use crate::input::{
    decode_first_char, ButtonCodes, KeyTranslator, ModifierState, MouseHandler, PointerState,
};

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Session continues; words currently queued for the VM
    Pending(usize),
    /// Host asked to quit (window closed, terminate hotkey, signal)
    Terminated,
}

impl PollStatus {
    pub fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// Work run by the embedding VM once per poll cycle
pub trait IdleHook {
    fn on_idle(&mut self);
}

impl<F: FnMut()> IdleHook for F {
    fn on_idle(&mut self) {
        self()
    }
}

/// State that exists only between `init` and `deinit`
struct Display<S> {
    /// Dropped first: releases the host surface
    surface: S,
    view: FrameView,
    frame: Frame,
    /// Union of `update_area` reports since the last conversion
    dirty: Option<Rect>,
    /// A short-buffer warning was already logged for this view
    warned_short: bool,
}

/// Outcome of dispatching one host event
enum Dispatch {
    Continue,
    Terminate,
}

/// Display session over a host backend
pub struct Session<H: Host> {
    host: H,
    encoder: EventEncoder,
    mods: ModifierState,
    pointer: PointerState,
    blitter: FrameBlitter,
    codes: ButtonCodes,
    terminate: ParsedKeybinds,
    partial_updates: bool,
    display: Option<Display<H::Surface>>,
    idle: Option<Box<dyn IdleHook>>,
}

impl<H: Host> Session<H> {
    /// Create an uninitialized session
    pub fn new(host: H, config: &Config, clock: Box<dyn Clock>) -> Result<Self, PalError> {
        let queue = EventQueue::with_capacity(config.input.queue_capacity)?;
        let mut encoder = EventEncoder::new(queue, clock);
        encoder.set_log_events(config.input.log_events);

        Ok(Self {
            host,
            encoder,
            mods: ModifierState::default(),
            pointer: PointerState::default(),
            blitter: FrameBlitter::new(config.palette()),
            codes: config.button_codes(),
            terminate: config.terminate_keys(),
            partial_updates: config.display.partial_updates,
            display: None,
            idle: None,
        })
    }

    /// Session on the monotonic wall clock
    pub fn with_config(host: H, config: &Config) -> Result<Self, PalError> {
        Self::new(host, config, Box::new(MonotonicClock::new()))
    }

    /// Attach a `width × height` monochrome framebuffer and open a surface
    ///
    /// Any previous surface is released first. On error the session is
    /// left uninitialized.
    pub fn init(&mut self, view: FrameView, width: u32, height: u32) -> Result<(), PalError> {
        self.display = None;

        if !is_valid_dimension(width) || !is_valid_dimension(height) {
            return Err(PalError::InvalidGeometry {
                width,
                height,
                max: MAX_DIMENSION,
            });
        }

        let surface = self.host.create_surface(width, height).map_err(|e| {
            error!("Failed to create {}x{} surface: {:#}", width, height, e);
            PalError::Init {
                reason: format!("{:#}", e),
            }
        })?;

        let required = required_len(width, height);
        if view.len() < required {
            warn!(
                "Framebuffer is {} bytes, {}x{} needs {}; frames will be skipped",
                view.len(),
                width,
                height,
                required
            );
        }

        let frame = Frame::new(width, height, self.blitter.palette().paper);
        let dirty = Some(frame.full_rect());
        self.display = Some(Display {
            surface,
            view,
            frame,
            dirty,
            warned_short: false,
        });
        info!("Display initialized: {}x{}", width, height);
        Ok(())
    }

    /// Release the surface and forget all input state
    pub fn deinit(&mut self) {
        if self.display.take().is_some() {
            info!("Display released");
        }
        self.encoder.reset();
        self.mods = ModifierState::default();
        self.pointer = PointerState::default();
    }

    pub fn is_running(&self) -> bool {
        self.display.is_some()
    }

    /// Geometry of the attached framebuffer
    pub fn size(&self) -> Option<(u32, u32)> {
        self.display
            .as_ref()
            .map(|d| (d.frame.width(), d.frame.height()))
    }

    /// One cycle: at most one host event, then redraw and idle work
    pub fn poll_events(&mut self, timeout: Duration) -> PollStatus {
        if self.display.is_none() {
            return PollStatus::Terminated;
        }

        if let Some(event) = self.host.wait_event(timeout) {
            if let Dispatch::Terminate = self.dispatch(event) {
                info!("Terminate requested");
                return PollStatus::Terminated;
            }
        }

        self.redraw();

        if let Some(hook) = self.idle.as_mut() {
            hook.on_idle();
        }

        PollStatus::Pending(self.encoder.queue().len())
    }

    fn dispatch(&mut self, event: HostEvent) -> Dispatch {
        debug!("host event: {:?}", event);
        match event {
            HostEvent::Quit => return Dispatch::Terminate,
            HostEvent::Key { key, down, mods } => {
                if down && self.terminate.matches(key, mods) {
                    return Dispatch::Terminate;
                }
                KeyTranslator::new(&mut self.encoder, &mut self.mods).key_event(key, down);
            }
            HostEvent::Text(text) => {
                let ch = decode_first_char(text.as_bytes());
                KeyTranslator::new(&mut self.encoder, &mut self.mods).type_char(ch);
            }
            HostEvent::Motion { x, y } => {
                if let Some((w, h)) = self.size() {
                    MouseHandler::new(
                        &mut self.encoder,
                        &self.mods,
                        &mut self.pointer,
                        (w, h),
                        self.codes,
                    )
                    .motion(x, y);
                }
            }
            HostEvent::Button { button, down } => {
                if let Some((w, h)) = self.size() {
                    MouseHandler::new(
                        &mut self.encoder,
                        &self.mods,
                        &mut self.pointer,
                        (w, h),
                        self.codes,
                    )
                    .button(button, down);
                }
            }
        }
        Dispatch::Continue
    }

    /// Convert the framebuffer and present it
    ///
    /// A frame that cannot be converted is not presented, so the surface
    /// keeps showing the previous one.
    fn redraw(&mut self) {
        let Some(display) = self.display.as_mut() else {
            return;
        };

        let full = display.frame.full_rect();
        let area = if self.partial_updates {
            display.dirty.take().unwrap_or(Rect::new(0, 0, 0, 0))
        } else {
            display.dirty = None;
            full
        };

        let blitter = self.blitter;
        let frame = &mut display.frame;
        let result = display
            .view
            .with_bytes(|bytes| blitter.convert_area(bytes, frame, area));

        if let Err(e) = result {
            // Keep the area pending until a conversion succeeds
            if self.partial_updates && !area.is_empty() {
                display.dirty = Some(match display.dirty {
                    Some(prev) => prev.union(&area),
                    None => area,
                });
            }
            if !display.warned_short {
                warn!("Frame skipped: {}", e);
                display.warned_short = true;
            } else {
                debug!("Frame skipped: {}", e);
            }
            return;
        }
        display.warned_short = false;

        if let Err(e) = self.host.present(&mut display.surface, &display.frame) {
            warn!("Present failed: {:#}", e);
        }
    }

    /// Next event word for the VM
    pub fn next_event(&mut self) -> Option<u16> {
        self.encoder.next_word()
    }

    /// Milliseconds on the session clock
    pub fn time(&self) -> u32 {
        self.encoder.now()
    }

    /// Install the per-cycle idle hook (replaces any previous one)
    pub fn set_idle_hook(&mut self, hook: impl IdleHook + 'static) {
        self.idle = Some(Box::new(hook));
    }

    pub fn clear_idle_hook(&mut self) {
        self.idle = None;
    }

    /// Replace the pointer image
    ///
    /// `width` must be a multiple of 8; bad bitmaps are ignored.
    pub fn set_cursor_bitmap(&mut self, bits: &[u8], width: u32, height: u32) {
        match Cursor::from_bitmap(bits, width, height) {
            Some(cursor) => self.host.set_cursor(Some(cursor)),
            None => warn!(
                "Ignoring cursor bitmap {}x{} ({} bytes)",
                width,
                height,
                bits.len()
            ),
        }
    }

    /// Move the pointer (clamped to the framebuffer)
    ///
    /// The VM already knows the new position, so no location event is posted.
    pub fn set_cursor_pos(&mut self, x: i32, y: i32) {
        let Some((w, h)) = self.size() else {
            return;
        };
        let x = x.clamp(0, w as i32 - 1);
        let y = y.clamp(0, h as i32 - 1);
        self.pointer = PointerState {
            x: x as u16,
            y: y as u16,
        };
        self.host.warp_pointer(x, y);
    }

    /// Words waiting in the queue
    pub fn events_pending(&self) -> usize {
        self.encoder.queue().len()
    }

    /// Drop queued words
    pub fn clear_events(&mut self) {
        self.encoder.clear();
    }

    /// Last pointer position reported to the VM
    pub fn mouse_position(&self) -> (u16, u16) {
        (self.pointer.x, self.pointer.y)
    }

    /// Mark a framebuffer region as changed
    ///
    /// Only used with `display.partial_updates`; otherwise every cycle
    /// converts the whole frame.
    pub fn update_area(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let Some(display) = self.display.as_mut() else {
            return;
        };
        let rect =
            Rect::new(x, y, width, height).clip(display.frame.width(), display.frame.height());
        if rect.is_empty() {
            return;
        }
        display.dirty = Some(match display.dirty {
            Some(prev) => prev.union(&rect),
            None => rect,
        });
    }

    pub fn set_event_log(&mut self, on: bool) {
        self.encoder.set_log_events(on);
    }

    pub fn modifiers(&self) -> ModifierState {
        self.mods
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
