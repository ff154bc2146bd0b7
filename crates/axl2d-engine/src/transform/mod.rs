//! Screen-space transform of a drawable.
//!
//! Pixel space in, NDC quad out:
//! - `geometry` holds the pure corner derivation
//! - `Transform2D` caches the result and recomputes it eagerly on every change

mod geometry;
mod transform2d;

pub use geometry::{compute_vertices, QuadVertex, QUAD_INDICES, QUAD_UVS};
pub use transform2d::Transform2D;
