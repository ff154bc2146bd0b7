use std::f32::consts::TAU;

use crate::broadcast::ViewportListener;
use crate::coords::{Rect, Vec2, Viewport};

use super::geometry::{compute_vertices, QuadVertex, QUAD_UVS};

/// Position, size and rotation of a quad plus its cached NDC geometry.
///
/// Every setter recomputes `vertices` before returning, so the cache always
/// matches the current state. While the viewport is invalid (zero area) the
/// recompute is skipped and the previous geometry is kept.
#[derive(Debug, Clone)]
pub struct Transform2D {
    position: Vec2,
    size: Vec2,
    rotation: f32,
    viewport: Viewport,
    vertices: [QuadVertex; 4],
    recomputes: u64,
}

impl Transform2D {
    pub fn new(position: Vec2, size: Vec2, rotation: f32, viewport: Viewport) -> Self {
        let mut vertices = [QuadVertex::default(); 4];
        for (v, uv) in vertices.iter_mut().zip(QUAD_UVS) {
            v.uv = uv;
        }

        let mut t = Self {
            position,
            size,
            rotation,
            viewport,
            vertices,
            recomputes: 0,
        };
        t.recompute();
        t
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Rotation in radians.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.recompute();
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.recompute();
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.recompute();
    }

    /// Adds `delta` radians to the current rotation, wrapped to `[0, 2π)`.
    pub fn rotate_by(&mut self, delta: f32) {
        self.set_rotation((self.rotation + delta).rem_euclid(TAU));
    }

    /// Position and size as one rectangle.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Sets position and size with a single recompute.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.position = bounds.origin;
        self.size = bounds.size;
        self.recompute();
    }

    /// Adopts a new viewport. Invalid viewports are ignored; returns whether
    /// the geometry was recomputed.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if !viewport.is_valid() {
            return false;
        }
        self.viewport = viewport;
        self.recompute();
        true
    }

    #[inline]
    pub fn vertices(&self) -> &[QuadVertex; 4] {
        &self.vertices
    }

    /// Vertices as `4 × {x, y, z, u, v}`.
    pub fn flattened(&self) -> [f32; 20] {
        let mut out = [0.0; 20];
        for (chunk, v) in out.chunks_exact_mut(5).zip(&self.vertices) {
            chunk[..3].copy_from_slice(&v.position);
            chunk[3..].copy_from_slice(&v.uv);
        }
        out
    }

    /// Number of geometry recomputations so far.
    #[inline]
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    fn recompute(&mut self) {
        if !self.viewport.is_valid() {
            return;
        }
        self.vertices = compute_vertices(self.position, self.size, self.rotation, self.viewport);
        self.recomputes += 1;
    }
}

impl ViewportListener for Transform2D {
    fn viewport_changed(&mut self, viewport: Viewport) {
        self.set_viewport(viewport);
    }
}
