use thiserror::Error;

/// Straight-alpha RGBA color, components in `[0, 1]`.
///
/// Used for the clear color and as the per-draw tint. The quad pipeline blends
/// with `srcAlpha, 1 - srcAlpha`, so colors are NOT premultiplied.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Error returned by [`Color::from_hex`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("hex color must have 6 or 8 digits, got {0}")]
    Length(usize),
    #[error("invalid hex digit in `{0}`")]
    Digit(String),
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);
    pub const DARK_GRAY: Color = Color::rgb(0.25, 0.25, 0.25);
    pub const LIGHT_GRAY: Color = Color::rgb(0.75, 0.75, 0.75);
    pub const ORANGE: Color = Color::rgb(1.0, 0.647, 0.0);
    pub const BROWN: Color = Color::rgb(0.647, 0.164, 0.164);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// From 8-bit channels (`0`–`255`).
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Parses `RRGGBB` or `RRGGBBAA`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 && digits.len() != 8 {
            return Err(ColorParseError::Length(digits.len()));
        }
        if !digits.is_ascii() {
            return Err(ColorParseError::Digit(hex.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| ColorParseError::Digit(hex.to_string()))
        };

        let a = if digits.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::from_rgba8(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Same color with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}
