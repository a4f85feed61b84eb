//! DRM/KMS display management

pub mod device;
pub mod display;

pub use device::{
    clear_shutdown_request, find_drm_device, setup_panic_hook, setup_signal_handlers,
    shutdown_requested, Device, TtyGuard,
};
pub use display::{set_crtc, DisplayConfig, DumbFramebuffer, SavedCrtc};
