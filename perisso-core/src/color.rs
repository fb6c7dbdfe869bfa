use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("unknown color name: {0}")]
    UnknownName(String),
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
    #[error("expected 3 or 4 color components, got {0}")]
    InvalidComponents(usize),
}

/// RGBA 颜色，各分量 0–255。传输格式为 `[r, g, b, a]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

const PALETTE: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 128, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("orange", [255, 165, 0, 255]),
    ("purple", [128, 0, 128, 255]),
    ("pink", [255, 192, 203, 255]),
    ("brown", [165, 42, 42, 255]),
    ("gray", [128, 128, 128, 255]),
    ("grey", [128, 128, 128, 255]),
    ("lime", [0, 255, 0, 255]),
    ("navy", [0, 0, 128, 255]),
    ("olive", [128, 128, 0, 255]),
    ("silver", [192, 192, 192, 255]),
    ("teal", [0, 128, 128, 255]),
    ("maroon", [128, 0, 0, 255]),
    ("transparent", [0, 0, 0, 0]),
];

impl Color {
    /// 默认高亮色。
    pub const HIGHLIGHT: Color = Color::rgba(77, 235, 103, 100);
    /// 未高亮元素的默认颜色。
    pub const MUTED: Color = Color::rgba(164, 166, 165, 128);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 名称不区分大小写。
    pub fn from_name(name: &str) -> Result<Self, ColorError> {
        let lowered = name.trim().to_ascii_lowercase();
        PALETTE
            .iter()
            .find(|(candidate, _)| *candidate == lowered)
            .map(|(_, rgba)| Color::from(*rgba))
            .ok_or_else(|| ColorError::UnknownName(name.to_string()))
    }

    pub fn palette_names() -> impl Iterator<Item = &'static str> {
        PALETTE.iter().map(|(name, _)| *name)
    }

    /// 解析 `#RRGGBB` 或 `#RRGGBBAA`，`#` 可省略。
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || ColorError::InvalidHex(hex.to_string());
        if !matches!(digits.len(), 6 | 8) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    /// 整数分量，超出 0–255 的值被截断到边界。
    pub fn from_ints(components: &[i64]) -> Result<Self, ColorError> {
        let clamp = |v: i64| v.clamp(0, 255) as u8;
        match *components {
            [r, g, b] => Ok(Self::rgb(clamp(r), clamp(g), clamp(b))),
            [r, g, b, a] => Ok(Self::rgba(clamp(r), clamp(g), clamp(b), clamp(a))),
            _ => Err(ColorError::InvalidComponents(components.len())),
        }
    }

    /// 0.0–1.0 浮点分量，按 `round(v * 255)` 转换并截断。
    pub fn from_floats(components: &[f64]) -> Result<Self, ColorError> {
        match *components {
            [r, g, b] => Ok(Self::from_rgb_float(r, g, b)),
            [r, g, b, a] => Ok(Self::from_rgba_float(r, g, b, a)),
            _ => Err(ColorError::InvalidComponents(components.len())),
        }
    }

    pub fn from_rgb_float(r: f64, g: f64, b: f64) -> Self {
        Self::from_rgba_float(r, g, b, 1.0)
    }

    pub fn from_rgba_float(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self::rgba(
            float_channel(r),
            float_channel(g),
            float_channel(b),
            float_channel(a),
        )
    }

    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgba_float(self) -> [f64; 4] {
        self.to_array().map(|c| f64::from(c) / 255.0)
    }

    pub fn to_hex(self, include_alpha: bool) -> String {
        if include_alpha {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        } else {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        }
    }

    #[inline]
    pub fn with_alpha(self, alpha: u8) -> Self {
        Self { a: alpha, ..self }
    }

    /// 向白色混合，`factor` 限定在 0–1。
    pub fn lighten(self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let mix = |c: u8| (f64::from(c) + (255.0 - f64::from(c)) * factor).min(255.0) as u8;
        Self::rgba(mix(self.r), mix(self.g), mix(self.b), self.a)
    }

    /// 向黑色混合，`factor` 限定在 0–1。
    pub fn darken(self, factor: f64) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let mix = |c: u8| (f64::from(c) * (1.0 - factor)) as u8;
        Self::rgba(mix(self.r), mix(self.g), mix(self.b), self.a)
    }
}

fn float_channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim_start().starts_with('#') {
            Self::from_hex(value)
        } else {
            Self::from_name(value)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Color(r={}, g={}, b={}, a={})",
            self.r, self.g, self.b, self.a
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_hex_colors() {
        assert_eq!(Color::from_name("Green"), Ok(Color::rgb(0, 128, 0)));
        assert_eq!("transparent".parse::<Color>(), Ok(Color::rgba(0, 0, 0, 0)));
        assert_eq!("#FF8000".parse::<Color>(), Ok(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("#4DEB6764"), Ok(Color::HIGHLIGHT));
        assert!(matches!(
            Color::from_name("chartreuse"),
            Err(ColorError::UnknownName(_))
        ));
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#GG0000").is_err());
    }

    #[test]
    fn numeric_constructors_clamp() {
        assert_eq!(Color::from_ints(&[300, -5, 10]), Ok(Color::rgb(255, 0, 10)));
        assert_eq!(
            Color::from_floats(&[1.0, 0.5, 0.0, 0.5]),
            Ok(Color::rgba(255, 128, 0, 128))
        );
        assert_eq!(Color::from_rgb_float(2.0, -1.0, 0.2).to_array(), [255, 0, 51, 255]);
        assert_eq!(
            Color::from_ints(&[1, 2]),
            Err(ColorError::InvalidComponents(2))
        );
    }

    #[test]
    fn hex_output_and_mixing() {
        let color = Color::rgba(77, 235, 103, 100);
        assert_eq!(color.to_hex(false), "#4DEB67");
        assert_eq!(color.to_hex(true), "#4DEB6764");
        assert_eq!(Color::rgb(100, 100, 100).lighten(0.5), Color::rgb(177, 177, 177));
        assert_eq!(Color::rgb(100, 100, 100).darken(2.0), Color::rgb(0, 0, 0));
        assert_eq!(Color::MUTED.with_alpha(255).a, 255);
    }

    #[test]
    fn serializes_as_component_array() {
        let json = serde_json::to_value(Color::HIGHLIGHT).expect("encode");
        assert_eq!(json, serde_json::json!([77, 235, 103, 100]));
        let back: Color = serde_json::from_value(json).expect("decode");
        assert_eq!(back, Color::HIGHLIGHT);
    }
}
