//! Linear RGB color
//!
//! Colors are stored in the linear working space. Hex and CSS inputs are
//! treated as sRGB-encoded and converted on the way in and out.

use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{utils, MathError, MathResult};

/// Color space tag for colors and textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Raw data, no transfer function (normal maps, roughness, ...)
    #[default]
    None,
    /// sRGB transfer function
    Srgb,
    /// Linear sRGB primaries
    LinearSrgb,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Srgb => write!(f, "srgb"),
            Self::LinearSrgb => write!(f, "srgb-linear"),
        }
    }
}

impl FromStr for ColorSpace {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "srgb" => Ok(Self::Srgb),
            "srgb-linear" | "linear" | "linear-srgb" => Ok(Self::LinearSrgb),
            other => Err(MathError::InvalidFormat(format!("unknown color space '{other}'"))),
        }
    }
}

/// Decode an sRGB-encoded channel to linear
pub fn srgb_to_linear(c: f64) -> f64 {
    if c < 0.04045 {
        c * 0.077_399_380_8
    } else {
        (c * 0.947_867_298_6 + 0.052_132_701_4).powf(2.4)
    }
}

/// Encode a linear channel with the sRGB transfer function
pub fn linear_to_srgb(c: f64) -> f64 {
    if c < 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(0.416_66) - 0.055
    }
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Hue, saturation and lightness, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsl {
    /// Hue as a fraction of a full turn
    pub h: f64,
    /// Saturation
    pub s: f64,
    /// Lightness
    pub l: f64,
}

/// RGB color in the linear working color space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
}

impl_approx_fields!(Color, r, g, b);

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    /// Black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// Create from linear components
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create from an sRGB-encoded `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| f64::from((hex >> shift) & 0xff) / 255.0;
        Self::new(
            srgb_to_linear(channel(16)),
            srgb_to_linear(channel(8)),
            srgb_to_linear(channel(0)),
        )
    }

    /// Encode as an sRGB `0xRRGGBB` value
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_hex(&self) -> u32 {
        let channel = |c: f64| (utils::clamp(linear_to_srgb(c), 0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Parse `#rgb`, `#rrggbb` (leading `#` optional) as sRGB
    pub fn from_css_hex(s: &str) -> MathResult<Self> {
        let digits = s.trim().trim_start_matches('#');
        let invalid = || MathError::InvalidFormat(format!("invalid hex color '{s}'"));
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let hex = match digits.len() {
            3 => {
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16).map_err(|_| invalid())?
            }
            6 => u32::from_str_radix(digits, 16).map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };
        Ok(Self::from_hex(hex))
    }

    /// Assign components expressed in `space`
    pub fn set_rgb(&mut self, r: f64, g: f64, b: f64, space: ColorSpace) -> &mut Self {
        *self = match space {
            ColorSpace::Srgb => Self::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b)),
            ColorSpace::LinearSrgb | ColorSpace::None => Self::new(r, g, b),
        };
        self
    }

    /// Components converted to `space`
    pub fn to_rgb(&self, space: ColorSpace) -> [f64; 3] {
        match space {
            ColorSpace::Srgb => [
                linear_to_srgb(self.r),
                linear_to_srgb(self.g),
                linear_to_srgb(self.b),
            ],
            ColorSpace::LinearSrgb | ColorSpace::None => [self.r, self.g, self.b],
        }
    }

    /// Create from HSL given in sRGB space
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let h = utils::euclidean_modulo(h, 1.0);
        let s = utils::clamp(s, 0.0, 1.0);
        let l = utils::clamp(l, 0.0, 1.0);

        let mut color = Self::BLACK;
        if s == 0.0 {
            color.set_rgb(l, l, l, ColorSpace::Srgb);
        } else {
            let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let q = 2.0 * l - p;
            color.set_rgb(
                hue_to_rgb(q, p, h + 1.0 / 3.0),
                hue_to_rgb(q, p, h),
                hue_to_rgb(q, p, h - 1.0 / 3.0),
                ColorSpace::Srgb,
            );
        }
        color
    }

    /// HSL of the sRGB-encoded color
    pub fn to_hsl(&self) -> Hsl {
        let [r, g, b] = self.to_rgb(ColorSpace::Srgb);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (min + max) / 2.0;

        if (max - min).abs() < f64::EPSILON {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let delta = max - min;
        let s = if l <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        let h = if (max - r).abs() < f64::EPSILON {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if (max - g).abs() < f64::EPSILON {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        Hsl { h: h / 6.0, s, l }
    }

    /// Linear interpolation towards `other`
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(
            utils::lerp(self.r, other.r, t),
            utils::lerp(self.g, other.g, t),
            utils::lerp(self.b, other.b, t),
        )
    }

    /// Component-wise product
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    /// Components as an array
    pub const fn to_array(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Components narrowed to `f32`
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32_array(&self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }
}

impl Add for Color {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl Mul<f64> for Color {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hex_roundtrip() {
        for hex in [0x000000, 0xffffff, 0x336699, 0xff8800, 0x0a0b0c] {
            assert_eq!(Color::from_hex(hex).to_hex(), hex);
        }
    }

    #[test]
    fn test_hex_is_srgb_encoded() {
        let mid_gray = Color::from_hex(0x808080);
        assert!(mid_gray.r < 0.25);
        assert_relative_eq!(mid_gray.r, 0.215_860_5, epsilon = 1e-4);
    }

    #[test]
    fn test_css_hex() {
        assert_eq!(Color::from_css_hex("#fff"), Ok(Color::from_hex(0xffffff)));
        assert_eq!(Color::from_css_hex("336699"), Ok(Color::from_hex(0x336699)));
        assert!(matches!(Color::from_css_hex("#12345"), Err(MathError::InvalidFormat(_))));
        assert!(matches!(Color::from_css_hex("#zzzzzz"), Err(MathError::InvalidFormat(_))));
    }

    #[test]
    fn test_hsl_roundtrip() {
        let c = Color::from_hsl(0.6, 0.5, 0.4);
        let hsl = c.to_hsl();
        assert_relative_eq!(hsl.h, 0.6, epsilon = 1e-4);
        assert_relative_eq!(hsl.s, 0.5, epsilon = 1e-4);
        assert_relative_eq!(hsl.l, 0.4, epsilon = 1e-4);
    }

    #[test]
    fn test_transfer_functions_invert() {
        for c in [0.0, 0.001, 0.2, 0.5, 1.0] {
            assert_relative_eq!(srgb_to_linear(linear_to_srgb(c)), c, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_color_space_parse() {
        assert_eq!("sRGB".parse::<ColorSpace>(), Ok(ColorSpace::Srgb));
        assert_eq!("srgb-linear".parse::<ColorSpace>(), Ok(ColorSpace::LinearSrgb));
        assert!("p3".parse::<ColorSpace>().is_err());
    }
}
