//! Color parsing utilities
//!
//! Palette colors are written in the config as hex strings.

/// Parse 6-digit hex color (e.g., "ff0000" -> (255, 0, 0))
/// Also supports 3-digit short format (e.g., "f00" -> (255, 0, 0))
/// Returns None on invalid input.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            // Short format: expand F -> FF
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// Pack RGB into opaque ARGB8888
#[inline]
pub const fn to_argb((r, g, b): (u8, u8, u8)) -> u32 {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Parse a hex color straight to ARGB8888
pub fn parse_hex_argb(hex: &str) -> Option<u32> {
    parse_hex_color(hex).map(to_argb)
}

/// Format ARGB8888 back to `#rrggbb` (alpha dropped)
pub fn format_hex_color(argb: u32) -> String {
    format!("#{:06x}", argb & 0x00FF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("ff0000"), Some((255, 0, 0)));
        assert_eq!(parse_hex_color("00ff00"), Some((0, 255, 0)));
        assert_eq!(parse_hex_color("#0000ff"), Some((0, 0, 255)));
        assert_eq!(parse_hex_color("#f00"), Some((255, 0, 0)));
        assert_eq!(parse_hex_color("invalid"), None);
        assert_eq!(parse_hex_color("ééé"), None);
    }

    #[test]
    fn test_argb() {
        assert_eq!(parse_hex_argb("#000000"), Some(0xFF00_0000));
        assert_eq!(parse_hex_argb("fff"), Some(0xFFFF_FFFF));
        assert_eq!(parse_hex_argb("#12ab34"), Some(0xFF12_AB34));
        assert_eq!(format_hex_color(0xFF12_AB34), "#12ab34");
    }
}
