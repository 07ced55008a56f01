use serde::{Deserialize, Serialize};

/// 8-bit sRGB color as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::from_rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::from_rgba(0, 0, 0, 0);

    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::from_rgba(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Some(Self::from_rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Normalized `[r, g, b, a]` in 0.0-1.0, no transfer function applied.
    pub fn to_unit_rgba(&self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_digit_hex() {
        let c = Color::from_hex("#cccccc").unwrap();
        assert_eq!(c, Color::from_rgba(0xcc, 0xcc, 0xcc, 255));
    }

    #[test]
    fn parses_eight_digit_hex_without_hash() {
        let c = Color::from_hex("ff000080").unwrap();
        assert_eq!(c, Color::from_rgba(255, 0, 0, 0x80));
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(Color::from_hex("#ccc").is_none());
        assert!(Color::from_hex("#gggggg").is_none());
        assert!(Color::from_hex("#ééé").is_none());
    }

    #[test]
    fn hex_round_trip() {
        assert_eq!(Color::from_rgba(1, 2, 3, 255).to_hex(), "#010203");
        assert_eq!(Color::from_rgba(1, 2, 3, 4).to_hex(), "#01020304");
    }

    #[test]
    fn unit_rgba_scales_channels() {
        let [r, g, b, a] = Color::from_rgba(255, 0, 51, 255).to_unit_rgba();
        assert!((r - 1.0).abs() < f32::EPSILON);
        assert!(g.abs() < f32::EPSILON);
        assert!((b - 0.2).abs() < 1e-6);
        assert!((a - 1.0).abs() < f32::EPSILON);
    }
}
