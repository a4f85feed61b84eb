//! Pointer image supplied by the VM

use crate::constants::PIXELS_PER_BYTE;

/// 1bpp pointer bitmap (MSB leftmost, rows packed to `width / 8` bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    bits: Vec<u8>,
    width: u32,
    height: u32,
}

impl Cursor {
    /// Build from packed bits; `width` must be a non-zero multiple of 8
    pub fn from_bitmap(bits: &[u8], width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || width % PIXELS_PER_BYTE != 0 {
            return None;
        }
        let len = (width / PIXELS_PER_BYTE) as usize * height as usize;
        if bits.len() < len {
            return None;
        }
        Some(Self {
            bits: bits[..len].to_vec(),
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let row = (self.width / PIXELS_PER_BYTE) as usize;
        let byte = self.bits[y as usize * row + (x >> 3) as usize];
        (byte >> (7 - (x & 7))) & 1 != 0
    }

    /// Draw set bits into an ARGB buffer with the top-left corner at `(x, y)`
    ///
    /// Pixels falling outside `dst_w × dst_h` are skipped.
    pub fn overlay(&self, dst: &mut [u32], dst_w: u32, dst_h: u32, x: i32, y: i32, color: u32) {
        for cy in 0..self.height {
            let py = y + cy as i32;
            if py < 0 || py >= dst_h as i32 {
                continue;
            }
            for cx in 0..self.width {
                let px = x + cx as i32;
                if px < 0 || px >= dst_w as i32 || !self.is_set(cx, cy) {
                    continue;
                }
                if let Some(p) = dst.get_mut(py as usize * dst_w as usize + px as usize) {
                    *p = color;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(Cursor::from_bitmap(&[0; 16], 12, 8).is_none());
        assert!(Cursor::from_bitmap(&[0; 16], 0, 8).is_none());
        assert!(Cursor::from_bitmap(&[0; 15], 16, 8).is_none());
        assert!(Cursor::from_bitmap(&[0; 16], 16, 8).is_some());
    }

    #[test]
    fn test_is_set() {
        let c = Cursor::from_bitmap(&[0x80, 0x01, 0x00, 0x40], 16, 2).unwrap();
        assert!(c.is_set(0, 0));
        assert!(c.is_set(15, 0));
        assert!(c.is_set(9, 1));
        assert!(!c.is_set(1, 0));
        assert!(!c.is_set(16, 0));
    }

    #[test]
    fn test_overlay_clips_at_edges() {
        let c = Cursor::from_bitmap(&[0xFF; 8], 8, 8).unwrap();
        let mut dst = vec![0u32; 4 * 4];
        c.overlay(&mut dst, 4, 4, 2, -6, 7);
        // rows 0..2 covered from x=2 onward
        assert_eq!(&dst[0..4], &[0, 0, 7, 7]);
        assert_eq!(&dst[4..8], &[0, 0, 7, 7]);
        assert!(dst[8..].iter().all(|&p| p == 0));
    }

    #[test]
    fn test_overlay_places_top_left_at_pointer() {
        let c = Cursor::from_bitmap(&[0x80], 8, 1).unwrap();
        let mut dst = vec![0u32; 9];
        c.overlay(&mut dst, 3, 3, 1, 1, 9);
        assert_eq!(dst[4], 9);
        assert_eq!(dst.iter().filter(|&&p| p == 9).count(), 1);
    }
}
