//! Screen colors: parsing from config strings and `#RRGGBB` formatting.

use std::fmt;

use crate::error::BlinkError;

/// An opaque RGB color as shown on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value; the top byte is ignored.
    pub const fn from_u32(val: u32) -> Self {
        Color {
            r: ((val >> 16) & 0xFF) as u8,
            g: ((val >> 8) & 0xFF) as u8,
            b: (val & 0xFF) as u8,
        }
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FFFFFF"`, `"FFFFFF"`, `"#ffffff"`
/// - Named: `"black"`, `"white"`, `"red"`, `"green"`, `"blue"`, `"yellow"`,
///   `"orange"`, `"purple"`, `"cyan"`
pub fn parse_color(s: &str) -> crate::error::Result<Color> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "black" | "off" => return Ok(Color::BLACK),
        "white" => return Ok(Color::WHITE),
        "red" => return Ok(Color::from_u32(0xFF0000)),
        "green" => return Ok(Color::from_u32(0x00FF00)),
        "blue" => return Ok(Color::from_u32(0x0000FF)),
        "yellow" => return Ok(Color::from_u32(0xFFFF00)),
        "orange" => return Ok(Color::from_u32(0xFF8000)),
        "purple" => return Ok(Color::from_u32(0x8000FF)),
        "cyan" => return Ok(Color::from_u32(0x00FFFF)),
        _ => {}
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(BlinkError::Color(format!(
            "Invalid color: {s} (use #RRGGBB or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| BlinkError::Color(format!("Invalid hex color: {s}")))?;
    Ok(Color::from_u32(val))
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}
