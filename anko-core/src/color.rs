//! Terminal color representation
//!
//! Supports:
//! - Default (inherited) foreground/background
//! - 256-color indexed palette
//! - 24-bit true color (RGB)
//!
//! Also defines the packed single-integer color encoding used by the
//! scrollback disk log. The bit layout is a persisted on-disk contract
//! and must not change.

use serde::{Deserialize, Serialize};

/// Represents a terminal color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// Default foreground or background color
    #[default]
    Default,
    /// 256-color palette index (0-255)
    Indexed(u8),
    /// 24-bit RGB color
    Rgb(Rgb),
}

impl Color {
    /// Resolve to a concrete RGB value.
    ///
    /// `Indexed` is looked up in the xterm 256-color table; `Default`
    /// resolves to the caller-supplied default.
    pub fn resolve(self, default: Rgb) -> Rgb {
        match self {
            Color::Default => default,
            Color::Indexed(index) => palette_256()[index as usize],
            Color::Rgb(rgb) => rgb,
        }
    }
}

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// The xterm 256-color palette
/// Colors 0-15: Standard ANSI colors
/// Colors 16-231: 6x6x6 color cube
/// Colors 232-255: Grayscale ramp
pub fn palette_256() -> [Rgb; 256] {
    let mut palette = [Rgb::new(0, 0, 0); 256];

    // Standard colors (0-7)
    palette[0] = Rgb::new(0, 0, 0); // Black
    palette[1] = Rgb::new(205, 0, 0); // Red
    palette[2] = Rgb::new(0, 205, 0); // Green
    palette[3] = Rgb::new(205, 205, 0); // Yellow
    palette[4] = Rgb::new(0, 0, 238); // Blue
    palette[5] = Rgb::new(205, 0, 205); // Magenta
    palette[6] = Rgb::new(0, 205, 205); // Cyan
    palette[7] = Rgb::new(229, 229, 229); // White

    // Bright colors (8-15)
    palette[8] = Rgb::new(127, 127, 127); // Bright Black
    palette[9] = Rgb::new(255, 0, 0); // Bright Red
    palette[10] = Rgb::new(0, 255, 0); // Bright Green
    palette[11] = Rgb::new(255, 255, 0); // Bright Yellow
    palette[12] = Rgb::new(92, 92, 255); // Bright Blue
    palette[13] = Rgb::new(255, 0, 255); // Bright Magenta
    palette[14] = Rgb::new(0, 255, 255); // Bright Cyan
    palette[15] = Rgb::new(255, 255, 255); // Bright White

    // 6x6x6 color cube (16-231)
    let cube_values = [0u8, 95, 135, 175, 215, 255];
    for r in 0..6 {
        for g in 0..6 {
            for b in 0..6 {
                let index = 16 + r * 36 + g * 6 + b;
                palette[index] = Rgb::new(cube_values[r], cube_values[g], cube_values[b]);
            }
        }
    }

    // Grayscale ramp (232-255)
    for i in 0..24 {
        let gray = (i * 10 + 8) as u8;
        palette[232 + i] = Rgb::new(gray, gray, gray);
    }

    palette
}

/// Pack a color into a single integer for the disk log.
///
/// Bit layout: top byte 0 = default, 1 = indexed (low byte = index),
/// 2 = RGB (next three bytes = R, G, B).
pub fn pack_color(color: Color) -> u32 {
    match color {
        Color::Default => 0,
        Color::Indexed(index) => (1 << 24) | index as u32,
        Color::Rgb(Rgb { r, g, b }) => {
            (2 << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
        }
    }
}

/// Reverse of [`pack_color`]. Unknown tags decode as `Default`.
pub fn unpack_color(packed: u32) -> Color {
    match packed >> 24 {
        1 => Color::Indexed((packed & 0xFF) as u8),
        2 => Color::Rgb(Rgb::new(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
        )),
        _ => Color::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_palette_size() {
        let palette = palette_256();
        assert_eq!(palette.len(), 256);
    }

    #[test]
    fn test_ansi_colors() {
        let palette = palette_256();
        assert_eq!(palette[1], Rgb::new(205, 0, 0));
        assert_eq!(palette[12], Rgb::new(92, 92, 255));
        assert_eq!(palette[15], Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_color_cube() {
        let palette = palette_256();
        // Color 16 is black, 231 is white
        assert_eq!(palette[16], Rgb::new(0, 0, 0));
        assert_eq!(palette[231], Rgb::new(255, 255, 255));
        // 16 + 1*36 + 2*6 + 3 uses levels {95, 135, 175}
        assert_eq!(palette[16 + 36 + 12 + 3], Rgb::new(95, 135, 175));
    }

    #[test]
    fn test_grayscale_ramp() {
        let palette = palette_256();
        assert_eq!(palette[232], Rgb::new(8, 8, 8));
        assert_eq!(palette[255], Rgb::new(238, 238, 238));
    }

    #[test]
    fn test_resolve() {
        let default = Rgb::new(170, 170, 170);
        assert_eq!(Color::Default.resolve(default), default);
        assert_eq!(Color::Indexed(9).resolve(default), Rgb::new(255, 0, 0));
        let direct = Rgb::new(1, 2, 3);
        assert_eq!(Color::Rgb(direct).resolve(default), direct);
    }

    #[test]
    fn test_pack_layout() {
        assert_eq!(pack_color(Color::Default), 0);
        assert_eq!(pack_color(Color::Indexed(100)), 0x0100_0064);
        assert_eq!(pack_color(Color::Rgb(Rgb::new(128, 64, 32))), 0x0280_4020);
    }

    proptest! {
        #[test]
        fn prop_pack_unpack_roundtrip(tag in 0u8..3, a: u8, b: u8, c: u8) {
            let color = match tag {
                0 => Color::Default,
                1 => Color::Indexed(a),
                _ => Color::Rgb(Rgb::new(a, b, c)),
            };
            prop_assert_eq!(unpack_color(pack_color(color)), color);
        }
    }
}
