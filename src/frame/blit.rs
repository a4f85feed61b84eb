//! Monochrome to ARGB8888 frame conversion
//!
//! Source layout: 1 bit per pixel, most significant bit leftmost, each scan
//! line padded to a whole 16-bit word. A set bit is ink (black by default),
//! a clear bit is paper, the reverse of most framebuffers.

use super::{Frame, Palette, Rect};
use crate::constants::{stride_bytes, PIXELS_PER_BYTE};
use crate::error::BlitError;

/// Bytes a `width × height` bitmap needs, including scan-line padding
///
/// Never less than `width * height / 8`.
pub fn required_len(width: u32, height: u32) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }
    let last_row = (width as usize).div_ceil(PIXELS_PER_BYTE as usize);
    stride_bytes(width) * (height as usize - 1) + last_row
}

/// Converts monochrome bitmaps into frames
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameBlitter {
    palette: Palette,
}

impl FrameBlitter {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Convert the whole bitmap into `frame`
    pub fn convert(&self, src: &[u8], frame: &mut Frame) -> Result<(), BlitError> {
        let area = frame.full_rect();
        self.convert_area(src, frame, area)
    }

    /// Convert only `area` (clipped to the frame)
    ///
    /// On error the frame is left untouched.
    pub fn convert_area(&self, src: &[u8], frame: &mut Frame, area: Rect) -> Result<(), BlitError> {
        let (width, height) = (frame.width(), frame.height());
        let expected = width as usize * height as usize;
        if frame.pixels().len() != expected {
            return Err(BlitError::SurfaceSize {
                len: frame.pixels().len(),
                expected,
            });
        }

        let required = required_len(width, height);
        if src.len() < required {
            return Err(BlitError::BufferTooShort {
                len: src.len(),
                width,
                height,
                required,
            });
        }

        let area = area.clip(width, height);
        if area.is_empty() {
            return Ok(());
        }

        let stride = stride_bytes(width);
        let Palette { ink, paper } = self.palette;
        let dst = frame.pixels_mut();

        for y in area.y..area.y + area.height {
            let line = &src[y as usize * stride..];
            let out = &mut dst[y as usize * width as usize..][..width as usize];
            for x in area.x..area.x + area.width {
                let byte = line[(x >> 3) as usize];
                let bit = (byte >> (7 - (x & 7))) & 1;
                out[x as usize] = if bit != 0 { ink } else { paper };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{INK_ARGB, PAPER_ARGB};

    #[test]
    fn test_all_ones_is_ink() {
        let mut frame = Frame::new(100, 100, 0);
        let src = vec![0xFF; required_len(100, 100)];
        FrameBlitter::default().convert(&src, &mut frame).unwrap();
        assert!(frame.pixels().iter().all(|&p| p == INK_ARGB));
    }

    #[test]
    fn test_all_zeros_is_paper() {
        let mut frame = Frame::new(37, 5, 0);
        let src = vec![0x00; required_len(37, 5)];
        FrameBlitter::default().convert(&src, &mut frame).unwrap();
        assert!(frame.pixels().iter().all(|&p| p == PAPER_ARGB));
    }

    #[test]
    fn test_bit_order_and_stride_padding() {
        // 20 pixels wide → 4 bytes per line (padded to 32 pixels)
        let mut src = vec![0u8; 4 * 2];
        src[0] = 0b1000_0000; // (0, 0)
        src[2] = 0b0001_0000; // (19, 0): byte 2, bit 3 from the left
        src[4 + 1] = 0b0000_0001; // (15, 1)
        let mut frame = Frame::new(20, 2, 0);
        FrameBlitter::default().convert(&src, &mut frame).unwrap();

        let ink_at: Vec<(usize, usize)> = (0..2)
            .flat_map(|y| (0..20).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.row(y as u32)[x] == INK_ARGB)
            .collect();
        assert_eq!(ink_at, vec![(0, 0), (19, 0), (15, 1)]);
    }

    #[test]
    fn test_short_buffer_leaves_frame_untouched() {
        let mut frame = Frame::new(100, 100, 0x1234_5678);
        let src = vec![0xFF; 100 * 100 / 8 - 1];
        let err = FrameBlitter::default().convert(&src, &mut frame).unwrap_err();
        assert!(matches!(err, BlitError::BufferTooShort { len: 1249, .. }));
        assert!(frame.pixels().iter().all(|&p| p == 0x1234_5678));
    }

    #[test]
    fn test_padding_shortfall_is_rejected() {
        // Exactly width*height/8 bytes, but the padded stride needs more
        let mut frame = Frame::new(100, 100, 0);
        let src = vec![0u8; 1250];
        assert!(FrameBlitter::default().convert(&src, &mut frame).is_err());
        assert_eq!(required_len(100, 100), 14 * 99 + 13);
    }

    #[test]
    fn test_partial_area() {
        let mut frame = Frame::new(16, 2, 0);
        let src = vec![0xFF; 4];
        FrameBlitter::default()
            .convert_area(&src, &mut frame, Rect::new(4, 1, 100, 100))
            .unwrap();
        assert!(frame.row(0).iter().all(|&p| p == 0));
        assert!(frame.row(1)[..4].iter().all(|&p| p == 0));
        assert!(frame.row(1)[4..].iter().all(|&p| p == INK_ARGB));
    }

    #[test]
    fn test_custom_palette() {
        let palette = Palette {
            ink: 0xFF00_FF00,
            paper: 0xFF10_1010,
        };
        let mut frame = Frame::new(16, 1, 0);
        FrameBlitter::new(palette).convert(&[0xF0, 0x0F], &mut frame).unwrap();
        assert_eq!(frame.row(0)[0], 0xFF00_FF00);
        assert_eq!(frame.row(0)[4], 0xFF10_1010);
        assert_eq!(frame.row(0)[15], 0xFF00_FF00);
    }
}
