use super::Vec2;

/// Drawable surface size in logical pixels.
///
/// This is the single basis for pixel → NDC conversion. The host owns the
/// authoritative value; drawables cache the last broadcast copy.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// `false` for zero-area (minimized) or non-finite sizes.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// `width / height`. Only meaningful for a valid viewport.
    #[inline]
    pub fn aspect_ratio(self) -> f32 {
        self.width / self.height
    }

    /// Maps a top-left-origin pixel position to NDC (+Y up).
    #[inline]
    pub fn to_ndc(self, px: Vec2) -> Vec2 {
        Vec2::new(px.x / self.width * 2.0 - 1.0, 1.0 - px.y / self.height * 2.0)
    }
}
