//! DRM display management
//!
//! Mode selection, dumb-buffer scanout and CRTC save/restore.

use anyhow::{anyhow, bail, Context, Result};
use drm::buffer::{Buffer, DrmFourcc};
use drm::control::{
    connector, crtc, dumbbuffer::DumbBuffer, framebuffer, Device as ControlDevice, Mode,
};
use log::{debug, info, warn};
use std::rc::Rc;

use super::device::Device;

/// Display configuration
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub connector_handle: connector::Handle,
    pub crtc_handle: crtc::Handle,
    pub mode: Mode,
    pub width: u32,
    pub height: u32,
}

impl DisplayConfig {
    /// Pick a connected display, its CRTC and preferred mode
    pub fn auto_detect(device: &Device, prefer_external: bool) -> Result<Self> {
        let (connector_handle, connector_info) = device.find_preferred_connector(prefer_external)?;

        let crtc_handle = device.find_crtc_for_connector(&connector_info)?;
        debug!("CRTC: {:?}", crtc_handle);

        let modes = connector_info.modes();
        if modes.is_empty() {
            bail!("No available display modes");
        }

        let mode = modes
            .iter()
            .find(|m| {
                m.mode_type()
                    .contains(drm::control::ModeTypeFlags::PREFERRED)
            })
            .or_else(|| modes.first())
            .cloned()
            .ok_or_else(|| anyhow!("Failed to select display mode"))?;

        let (width, height) = mode.size();
        info!(
            "Display mode: {}x{} @ {}Hz",
            width,
            height,
            mode.vrefresh()
        );

        Ok(Self {
            connector_handle,
            crtc_handle,
            mode,
            width: width as u32,
            height: height as u32,
        })
    }

    /// Top-left corner that centers a `width × height` frame on screen
    pub fn centered_origin(&self, width: u32, height: u32) -> (u32, u32) {
        (
            self.width.saturating_sub(width) / 2,
            self.height.saturating_sub(height) / 2,
        )
    }
}

/// XRGB8888 dumb buffer registered as a DRM framebuffer
pub struct DumbFramebuffer {
    device: Rc<Device>,
    buffer: Option<DumbBuffer>,
    fb: framebuffer::Handle,
}

impl DumbFramebuffer {
    pub fn new(device: Rc<Device>, width: u32, height: u32) -> Result<Self> {
        let buffer = device
            .create_dumb_buffer((width, height), DrmFourcc::Xrgb8888, 32)
            .context("Failed to create dumb buffer")?;
        let fb = match device.add_framebuffer(&buffer, 24, 32) {
            Ok(fb) => fb,
            Err(e) => {
                let _ = device.destroy_dumb_buffer(buffer);
                return Err(anyhow!("Failed to add framebuffer: {}", e));
            }
        };
        debug!(
            "Framebuffer created: {:?}, {}x{}, pitch={}",
            fb,
            width,
            height,
            buffer.pitch()
        );
        Ok(Self {
            device,
            buffer: Some(buffer),
            fb,
        })
    }

    pub fn handle(&self) -> framebuffer::Handle {
        self.fb
    }

    /// Map the buffer and run `f` over its bytes
    pub fn with_pixels<R>(&mut self, f: impl FnOnce(&mut [u8], usize) -> R) -> Result<R> {
        let device = Rc::clone(&self.device);
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| anyhow!("Framebuffer already released"))?;
        let pitch = buffer.pitch() as usize;
        let mut mapping = device
            .map_dumb_buffer(buffer)
            .context("Failed to map dumb buffer")?;
        Ok(f(&mut *mapping, pitch))
    }
}

impl Drop for DumbFramebuffer {
    fn drop(&mut self) {
        if let Err(e) = self.device.destroy_framebuffer(self.fb) {
            warn!("Failed to remove framebuffer: {}", e);
        }
        if let Some(buffer) = self.buffer.take() {
            if let Err(e) = self.device.destroy_dumb_buffer(buffer) {
                warn!("Failed to destroy dumb buffer: {}", e);
            }
        }
    }
}

/// Set display mode
pub fn set_crtc(device: &Device, config: &DisplayConfig, fb: &DumbFramebuffer) -> Result<()> {
    device
        .set_crtc(
            config.crtc_handle,
            Some(fb.handle()),
            (0, 0),
            &[config.connector_handle],
            Some(config.mode),
        )
        .context("Failed to set display mode")?;
    Ok(())
}

/// Save and restore original CRTC configuration
pub struct SavedCrtc {
    device: Rc<Device>,
    handle: crtc::Handle,
    info: crtc::Info,
    connector: connector::Handle,
}

impl SavedCrtc {
    pub fn save(device: Rc<Device>, config: &DisplayConfig) -> Result<Self> {
        let info = device.get_crtc(config.crtc_handle)?;
        Ok(Self {
            device,
            handle: config.crtc_handle,
            info,
            connector: config.connector_handle,
        })
    }
}

impl Drop for SavedCrtc {
    fn drop(&mut self) {
        if let Some(fb) = self.info.framebuffer() {
            let restored = self.device.set_crtc(
                self.handle,
                Some(fb),
                self.info.position(),
                &[self.connector],
                self.info.mode(),
            );
            if let Err(e) = restored {
                warn!("Failed to restore CRTC: {}", e);
            }
        }
    }
}
