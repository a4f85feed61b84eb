//! C ABI for VMs written in C
//!
//! One session per thread, created by `pal_init` and dropped by
//! `pal_deinit`. All functions must be called from the thread that called
//! `pal_init`.

use std::cell::{Cell, RefCell};
use std::os::raw::c_int;
use std::time::Duration;

use log::{error, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::Config;
use crate::frame::FrameView;
use crate::host::ConsoleHost;
use crate::session::{PollStatus, Session};

thread_local! {
    static SESSION: RefCell<Option<Session<ConsoleHost>>> = const { RefCell::new(None) };
    static CLOCK: MonotonicClock = MonotonicClock::new();
    static IDLE: Cell<Option<extern "C" fn()>> = const { Cell::new(None) };
}

/// Catch panics at the ABI boundary and return a default instead
///
/// Only effective where panics unwind (debug and test builds). Release
/// builds use `panic = "abort"`, so a panic there ends the process after
/// the panic hook has restored the console.
macro_rules! catch_panic {
    ($default:expr, $body:expr) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $body)) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("[monopal FFI] Caught panic: {:?}", e);
                $default
            }
        }
    };
}

/// Run `f` on the live session, or return `default` when there is none
///
/// Re-entrant calls (from inside the idle callback) see no session.
fn with_session<R>(default: R, f: impl FnOnce(&mut Session<ConsoleHost>) -> R) -> R {
    SESSION.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => match slot.as_mut() {
            Some(session) => f(session),
            None => default,
        },
        Err(_) => {
            warn!("Session is busy (re-entrant call)");
            default
        }
    })
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

fn create_session(config: &Config) -> Option<Session<ConsoleHost>> {
    let host = match ConsoleHost::new(config) {
        Ok(host) => host,
        Err(e) => {
            error!("Failed to open console: {:#}", e);
            return None;
        }
    };
    let clock = CLOCK.with(|c| *c);
    match Session::new(host, config, Box::new(clock)) {
        Ok(session) => Some(session),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            None
        }
    }
}

/// Open the display for a `width × height` 1bpp framebuffer at `buffer`
///
/// Returns 1 on success, 0 on failure. `buffer` must stay valid for
/// `length` bytes until `pal_deinit` or the next `pal_init`.
#[no_mangle]
pub extern "C" fn pal_init(buffer: *const u8, length: usize, width: u32, height: u32) -> c_int {
    catch_panic!(0, {
        init_logging();

        // SAFETY: lifetime of the buffer is the caller's contract above
        let Some(view) = (unsafe { FrameView::from_raw(buffer, length) }) else {
            error!("pal_init: null framebuffer");
            return 0;
        };

        SESSION.with(|cell| {
            let Ok(mut slot) = cell.try_borrow_mut() else {
                error!("pal_init called re-entrantly");
                return 0;
            };
            if slot.is_none() {
                *slot = create_session(&Config::load());
            }
            let Some(session) = slot.as_mut() else {
                return 0;
            };
            match session.init(view, width, height) {
                Ok(()) => 1,
                Err(e) => {
                    error!("pal_init: {}", e);
                    *slot = None;
                    0
                }
            }
        })
    })
}

/// Close the display and drop all input state
#[no_mangle]
pub extern "C" fn pal_deinit() {
    catch_panic!((), {
        SESSION.with(|cell| match cell.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(mut session) = slot.take() {
                    session.deinit();
                }
            }
            Err(_) => warn!("pal_deinit called re-entrantly"),
        })
    })
}

/// Replace the pointer image (`width` a multiple of 8, 1bpp MSB-first)
///
/// # Safety
/// `bits` must be valid for reads of `width / 8 * height` bytes.
#[no_mangle]
pub unsafe extern "C" fn pal_set_cursor_bitmap(bits: *const u8, width: u32, height: u32) {
    catch_panic!((), {
        if bits.is_null() {
            warn!("pal_set_cursor_bitmap: null bitmap");
            return;
        }
        let len = (width as usize / 8) * height as usize;
        // SAFETY: caller guarantees `len` readable bytes
        let slice = unsafe { std::slice::from_raw_parts(bits, len) };
        with_session((), |s| s.set_cursor_bitmap(slice, width, height))
    })
}

#[no_mangle]
pub extern "C" fn pal_set_cursor_pos(x: c_int, y: c_int) {
    catch_panic!((), with_session((), |s| s.set_cursor_pos(x, y)))
}

/// One poll cycle; returns queued word count, or -1 when the VM should exit
#[no_mangle]
pub extern "C" fn pal_process_events(timeout_ms: u32) -> c_int {
    catch_panic!(-1, {
        let status = with_session(PollStatus::Terminated, |s| {
            s.poll_events(Duration::from_millis(timeout_ms as u64))
        });
        match status {
            PollStatus::Terminated => -1,
            PollStatus::Pending(n) => {
                // Outside the session borrow, so the callback may call back in
                if let Some(idle) = IDLE.with(|c| c.get()) {
                    idle();
                }
                with_session(n, |s| s.events_pending()) as c_int
            }
        }
    })
}

/// Next event word, or 0 when the queue is empty
#[no_mangle]
pub extern "C" fn pal_next_event() -> c_int {
    catch_panic!(0, with_session(0, |s| s.next_event().map_or(0, c_int::from)))
}

/// Milliseconds on the event clock
#[no_mangle]
pub extern "C" fn pal_get_time() -> u32 {
    catch_panic!(0, CLOCK.with(|c| c.now_ms()))
}

/// Install (or with NULL, remove) the per-cycle idle callback
#[no_mangle]
pub extern "C" fn pal_set_idle(callback: Option<extern "C" fn()>) {
    IDLE.with(|c| c.set(callback));
}

/// Report a changed framebuffer region (used with partial updates)
#[no_mangle]
pub extern "C" fn pal_update_area(x: u32, y: u32, width: u32, height: u32) {
    catch_panic!((), with_session((), |s| s.update_area(x, y, width, height)))
}

#[no_mangle]
pub extern "C" fn pal_events_pending() -> c_int {
    catch_panic!(0, with_session(0, |s| s.events_pending() as c_int))
}

#[no_mangle]
pub extern "C" fn pal_clear_events() {
    catch_panic!((), with_session((), |s| s.clear_events()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_without_session_are_inert() {
        assert_eq!(pal_next_event(), 0);
        assert_eq!(pal_events_pending(), 0);
        assert_eq!(pal_process_events(0), -1);
        pal_clear_events();
        pal_update_area(0, 0, 8, 8);
        pal_set_cursor_pos(1, 1);
        pal_deinit();
    }

    #[test]
    fn test_init_rejects_null_buffer() {
        assert_eq!(pal_init(std::ptr::null(), 0, 8, 8), 0);
    }

    #[test]
    fn test_time_is_monotonic() {
        let a = pal_get_time();
        let b = pal_get_time();
        assert!(b >= a);
    }
}
