use super::Vec2;

/// Axis-aligned rectangle in pixels (top-left origin).
///
/// This is the `bounds` of a drawable: position and size set together.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x, self.origin.y + self.size.y)
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.min().midpoint(self.max())
    }

    /// Same center, size swapped between axes.
    #[inline]
    pub fn transposed(self) -> Self {
        let c = self.center();
        let size = Vec2::new(self.size.y, self.size.x);
        Rect::from_origin_size(c - size * 0.5, size)
    }
}

impl From<(Vec2, Vec2)> for Rect {
    #[inline]
    fn from((origin, size): (Vec2, Vec2)) -> Self {
        Rect::from_origin_size(origin, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    #[test]
    fn max_is_origin_plus_size() {
        assert_eq!(r(10.0, 20.0, 5.0, 7.0).max(), Vec2::new(15.0, 27.0));
    }

    #[test]
    fn center_of_rect() {
        assert_eq!(r(0.0, 0.0, 100.0, 50.0).center(), Vec2::new(50.0, 25.0));
    }

    #[test]
    fn transposed_keeps_center() {
        let rect = r(700.0, 400.0, 200.0, 100.0);
        let t = rect.transposed();
        assert_eq!(t.center(), rect.center());
        assert_eq!(t.size, Vec2::new(100.0, 200.0));
        assert_eq!(t.origin, Vec2::new(750.0, 350.0));
    }
}
