//! DRM device management
//!
//! Opens the DRM device (/dev/dri/card*), enumerates connectors, CRTCs and
//! encoders, and owns DRM master while a surface is shown.
//!
//! Also holds the console-side state that must be undone on exit: the
//! controlling TTY's termios and KD mode, and the shutdown signal flag.

use anyhow::{anyhow, Context, Result};
use drm::control::{connector, crtc, encoder, Device as ControlDevice, ResourceHandles};
use drm::Device as BasicDevice;
use log::{debug, info, warn};
use nix::sys::termios::{self, Termios};
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Global flag for shutdown requested via signal (SIGTERM/SIGINT/SIGHUP)
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Global TTY fd for panic hook recovery.
/// When set (>= 0), the panic hook restores KD_TEXT so the console is
/// not left in graphics mode.
static PANIC_RECOVERY_TTY_FD: AtomicI32 = AtomicI32::new(-1);

/// Check if shutdown was requested (SIGTERM, SIGINT, or SIGHUP)
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Forget a handled shutdown request (a new session may start afterwards)
pub fn clear_shutdown_request() {
    SHUTDOWN_REQUESTED.store(false, Ordering::Relaxed);
}

/// Set up signal handlers for graceful shutdown
///
/// Handles SIGTERM (systemd stop), SIGINT (Ctrl+C), and SIGHUP (terminal hangup).
pub fn setup_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGHUP,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
    }
}

extern "C" fn shutdown_signal_handler(_signo: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Install a panic hook that restores the console to text mode.
///
/// Even with `panic = "abort"`, `std::panic::set_hook` runs before the abort.
pub fn setup_panic_hook() {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let fd = PANIC_RECOVERY_TTY_FD.load(Ordering::Relaxed);
        if fd >= 0 {
            unsafe { libc::ioctl(fd, KDSETMODE, KD_TEXT) };
        }
        eprintln!("[monopal] PANIC: {}", info);
        prev(info);
    }));
}

/// Auto-detect DRM device: first card with a connected output
pub fn find_drm_device() -> Result<String> {
    let mut first = None;
    for i in 0..8 {
        let path = format!("/dev/dri/card{}", i);
        if !Path::new(&path).exists() {
            continue;
        }
        first.get_or_insert_with(|| path.clone());
        match Device::open(&path) {
            Ok(dev) if !dev.get_connected_connectors().is_empty() => return Ok(path),
            Ok(_) => debug!("{}: no connected outputs", path),
            Err(e) => debug!("{}: {:#}", path, e),
        }
    }
    first.ok_or_else(|| anyhow!("/dev/dri/card* not found"))
}

/// DRM device wrapper
pub struct Device {
    file: File,
    resources: ResourceHandles,
    is_master: bool,
}

// Trait implementations required by drm crate
impl AsFd for Device {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl BasicDevice for Device {}
impl ControlDevice for Device {}

impl Device {
    /// Open DRM device
    ///
    /// # Arguments
    /// * `path` - Device path (e.g., "/dev/dri/card0")
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening DRM device: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Cannot open DRM device {}", path.display()))?;

        // Create temporary device wrapper to get resources
        struct TempDevice<'a>(&'a File);
        impl AsFd for TempDevice<'_> {
            fn as_fd(&self) -> BorrowedFd<'_> {
                self.0.as_fd()
            }
        }
        impl BasicDevice for TempDevice<'_> {}
        impl ControlDevice for TempDevice<'_> {}

        let resources = TempDevice(&file)
            .resource_handles()
            .context("Failed to get DRM resources")?;

        debug!(
            "DRM resources: connectors={}, crtcs={}, encoders={}",
            resources.connectors().len(),
            resources.crtcs().len(),
            resources.encoders().len(),
        );

        Ok(Self {
            file,
            resources,
            is_master: false,
        })
    }

    /// Get connector info
    pub fn get_connector(&self, handle: connector::Handle) -> Result<connector::Info> {
        ControlDevice::get_connector(self, handle, false)
            .with_context(|| format!("Failed to get connector {:?} info", handle))
    }

    /// Get encoder info
    pub fn get_encoder(&self, handle: encoder::Handle) -> Result<encoder::Info> {
        ControlDevice::get_encoder(self, handle)
            .with_context(|| format!("Failed to get encoder {:?} info", handle))
    }

    /// Get CRTC info
    pub fn get_crtc(&self, handle: crtc::Handle) -> Result<crtc::Info> {
        ControlDevice::get_crtc(self, handle)
            .with_context(|| format!("Failed to get CRTC {:?} info", handle))
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Find preferred connected connector based on priority
    ///
    /// When prefer_external is true, external connectors (HDMI, DP, DVI, VGA)
    /// are prioritized over internal (eDP, LVDS).
    pub fn find_preferred_connector(
        &self,
        prefer_external: bool,
    ) -> Result<(connector::Handle, connector::Info)> {
        let mut connectors = self.get_connected_connectors();
        if connectors.is_empty() {
            return Err(anyhow!("No connected connector found"));
        }

        // Stable sort: equal priorities keep enumeration order
        connectors.sort_by_key(|(_, info)| connector_priority(info.interface(), prefer_external));

        let (handle, info) = connectors.swap_remove(0);
        info!("Selected connector: {:?} ({:?})", handle, info.interface());
        Ok((handle, info))
    }

    /// Get all connected connectors with their info
    pub fn get_connected_connectors(&self) -> Vec<(connector::Handle, connector::Info)> {
        let mut result = Vec::new();
        for &handle in self.resources.connectors() {
            if let Ok(info) = self.get_connector(handle) {
                if info.state() == connector::State::Connected {
                    result.push((handle, info));
                }
            }
        }
        result
    }

    /// Find CRTC for connector
    pub fn find_crtc_for_connector(&self, connector: &connector::Info) -> Result<crtc::Handle> {
        // First check current encoder
        if let Some(encoder_handle) = connector.current_encoder() {
            let encoder = self.get_encoder(encoder_handle)?;
            if let Some(crtc_handle) = encoder.crtc() {
                return Ok(crtc_handle);
            }
        }

        // Any CRTC one of the connector's encoders can drive
        for &encoder_handle in connector.encoders() {
            let encoder = self.get_encoder(encoder_handle)?;
            let possible = encoder.possible_crtcs();
            if let Some(&crtc_handle) = self.resources.filter_crtcs(possible).first() {
                return Ok(crtc_handle);
            }
        }

        Err(anyhow!("No CRTC found for connector"))
    }

    /// Acquire DRM master privileges
    pub fn set_master(&mut self) -> Result<()> {
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), drm_ioctl::DRM_IOCTL_SET_MASTER) };
        if ret < 0 {
            return Err(anyhow!(
                "SET_MASTER failed: {} (another display server running?)",
                std::io::Error::last_os_error()
            ));
        }
        self.is_master = true;
        info!("DRM master acquired");
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.is_master {
            unsafe {
                libc::ioctl(self.file.as_raw_fd(), drm_ioctl::DRM_IOCTL_DROP_MASTER);
            }
        }
    }
}

// DRM ioctl constants
mod drm_ioctl {
    // Linux: include/uapi/drm/drm.h
    // _IO('d', 0x1e) = SET_MASTER, _IO('d', 0x1f) = DROP_MASTER
    const DRM_IOCTL_BASE: u64 = 0x64;
    pub const DRM_IOCTL_SET_MASTER: libc::c_ulong =
        nix::request_code_none!(DRM_IOCTL_BASE, 0x1e) as libc::c_ulong;
    pub const DRM_IOCTL_DROP_MASTER: libc::c_ulong =
        nix::request_code_none!(DRM_IOCTL_BASE, 0x1f) as libc::c_ulong;
}

// KDSETMODE constants (from linux/kd.h)
const KDSETMODE: libc::c_ulong = 0x4B3A;
const KD_TEXT: libc::c_long = 0x00;
const KD_GRAPHICS: libc::c_long = 0x01;

/// Controlling console switched to raw input and graphics mode
///
/// Raw mode keeps keystrokes (read through libinput) from echoing on the
/// console; KD_GRAPHICS stops the kernel from drawing text over the
/// framebuffer. Both are restored on drop.
pub struct TtyGuard {
    tty: File,
    orig_termios: Option<Termios>,
    graphics: bool,
}

impl TtyGuard {
    /// Take over the controlling terminal
    pub fn acquire() -> Result<Self> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .context("Cannot open controlling terminal")?;

        let orig_termios = match termios::tcgetattr(tty.as_fd()) {
            Ok(orig) => {
                let mut raw = orig.clone();
                termios::cfmakeraw(&mut raw);
                termios::tcsetattr(tty.as_fd(), termios::SetArg::TCSAFLUSH, &raw)
                    .map_err(|e| anyhow!("tcsetattr failed: {}", e))?;
                Some(orig)
            }
            Err(e) => {
                warn!("tcgetattr failed: {} (input may echo)", e);
                None
            }
        };

        let fd = tty.as_raw_fd();
        let graphics = unsafe { libc::ioctl(fd, KDSETMODE, KD_GRAPHICS) } >= 0;
        if graphics {
            PANIC_RECOVERY_TTY_FD.store(fd, Ordering::Relaxed);
            info!("Console switched to graphics mode");
        } else {
            warn!(
                "KDSETMODE failed: {} (not a virtual console?)",
                std::io::Error::last_os_error()
            );
        }

        Ok(Self {
            tty,
            orig_termios,
            graphics,
        })
    }
}

impl Drop for TtyGuard {
    fn drop(&mut self) {
        if self.graphics {
            unsafe { libc::ioctl(self.tty.as_raw_fd(), KDSETMODE, KD_TEXT) };
            PANIC_RECOVERY_TTY_FD.store(-1, Ordering::Relaxed);
        }
        if let Some(orig) = &self.orig_termios {
            let _ = termios::tcsetattr(self.tty.as_fd(), termios::SetArg::TCSAFLUSH, orig);
        }
        info!("Console settings restored");
    }
}

/// Get connector priority for display selection
///
/// When prefer_external is true, external connectors are prioritized.
/// Lower number = higher priority.
fn connector_priority(interface: connector::Interface, prefer_external: bool) -> i32 {
    use connector::Interface;

    if !prefer_external {
        // First connected wins
        return 0;
    }
    match interface {
        Interface::HDMIA | Interface::HDMIB => 10,
        Interface::DisplayPort => 20,
        Interface::DVID | Interface::DVII | Interface::DVIA => 30,
        Interface::VGA => 40,
        // Internal displays last
        Interface::EmbeddedDisplayPort => 100,
        Interface::LVDS => 110,
        Interface::DSI => 120,
        _ => 50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector::Interface;

    #[test]
    fn test_connector_priority() {
        assert!(
            connector_priority(Interface::HDMIA, true)
                < connector_priority(Interface::EmbeddedDisplayPort, true)
        );
        assert!(
            connector_priority(Interface::DisplayPort, true)
                < connector_priority(Interface::LVDS, true)
        );
        assert_eq!(
            connector_priority(Interface::HDMIA, false),
            connector_priority(Interface::EmbeddedDisplayPort, false)
        );
    }
}
