//! Color model shared by the host (clear color) and drawables (tint).

pub mod color;

pub use color::{Color, ColorParseError};
