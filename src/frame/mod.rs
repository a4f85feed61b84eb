//! Monochrome framebuffer view and converted output frame

pub mod blit;
pub mod cursor;

pub use blit::FrameBlitter;
pub use cursor::Cursor;

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::constants::{INK_ARGB, PAPER_ARGB};

/// Borrowed view of the VM's 1-bit-per-pixel framebuffer
///
/// The bytes stay owned by the VM; the session only reads them while
/// converting a frame.
#[derive(Debug, Clone)]
pub enum FrameView {
    /// Buffer shared with Rust code in the same thread
    Shared(Rc<RefCell<Vec<u8>>>),
    /// Buffer handed over through the C ABI
    Raw { ptr: NonNull<u8>, len: usize },
}

impl FrameView {
    pub fn shared(buffer: Rc<RefCell<Vec<u8>>>) -> Self {
        Self::Shared(buffer)
    }

    /// Wrap a foreign buffer
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `len` bytes until the view is
    /// dropped (the next `init`/`deinit`), and nothing may write to it while
    /// a frame is being converted.
    pub unsafe fn from_raw(ptr: *const u8, len: usize) -> Option<Self> {
        NonNull::new(ptr as *mut u8).map(|ptr| Self::Raw { ptr, len })
    }

    /// Run `f` over the current framebuffer bytes
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match self {
            Self::Shared(buf) => f(&buf.borrow()),
            // SAFETY: validity for `len` bytes is the contract of `from_raw`
            Self::Raw { ptr, len } => f(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), *len) }),
        }
    }

    /// Byte length of the view
    pub fn len(&self) -> usize {
        match self {
            Self::Shared(buf) => buf.borrow().len(),
            Self::Raw { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ink and paper colors (ARGB8888)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Color of set bits
    pub ink: u32,
    /// Color of clear bits
    pub paper: u32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            ink: INK_ARGB,
            paper: PAPER_ARGB,
        }
    }
}

/// Pixel rectangle in framebuffer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Intersection with `[0, width) × [0, height)`
    pub fn clip(&self, width: u32, height: u32) -> Rect {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Converted frame, ARGB8888, exactly `width × height` pixels
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl Frame {
    /// New frame filled with `fill`
    pub fn new(width: u32, height: u32, fill: u32) -> Self {
        Self {
            pixels: vec![fill; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// One scan line
    pub fn row(&self, y: u32) -> &[u32] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    pub fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_union() {
        let a = Rect::new(10, 10, 5, 5);
        let b = Rect::new(0, 12, 3, 10);
        assert_eq!(a.union(&b), Rect::new(0, 10, 15, 12));
        assert_eq!(Rect::new(0, 0, 0, 0).union(&a), a);
    }

    #[test]
    fn test_rect_clip() {
        assert_eq!(Rect::new(90, 90, 20, 20).clip(100, 95), Rect::new(90, 90, 10, 5));
        assert!(Rect::new(200, 0, 5, 5).clip(100, 100).is_empty());
    }

    #[test]
    fn test_frame_view_shared_len() {
        let buf = Rc::new(RefCell::new(vec![0u8; 32]));
        let view = FrameView::shared(buf.clone());
        assert_eq!(view.len(), 32);
        buf.borrow_mut().push(1);
        assert_eq!(view.len(), 33);
        assert_eq!(view.with_bytes(|b| b[32]), 1);
    }

    #[test]
    fn test_frame_view_raw() {
        let bytes = [0xAAu8; 4];
        let view = unsafe { FrameView::from_raw(bytes.as_ptr(), bytes.len()) }.unwrap();
        assert_eq!(view.with_bytes(|b| b.to_vec()), bytes.to_vec());
        assert!(unsafe { FrameView::from_raw(std::ptr::null(), 4) }.is_none());
    }
}
