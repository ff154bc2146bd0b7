//! Coordinate and geometry types shared by transforms, drawables and the host.
//!
//! Canonical CPU space:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down
//!
//! `Viewport::to_ndc` converts into the GPU's [-1, 1] space (+Y up).

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
