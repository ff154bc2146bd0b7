use bytemuck::{Pod, Zeroable};

use crate::coords::{Vec2, Viewport};

/// One quad corner as uploaded to the GPU: NDC position (z = 0) and UV.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two triangles over the corners in emitted order.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// UVs for bottom-right, top-right, top-left, bottom-left. V grows downward.
pub const QUAD_UVS: [[f32; 2]; 4] = [[1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [0.0, 1.0]];

/// Derives the NDC quad for a pixel-space rectangle rotated around its center.
///
/// `position` is the top-left corner and `size` the extent, both in logical
/// pixels. `rotation` is in radians, counter-clockwise on screen. The viewport
/// must be valid.
pub fn compute_vertices(
    position: Vec2,
    size: Vec2,
    rotation: f32,
    viewport: Viewport,
) -> [QuadVertex; 4] {
    build(position, size, rotation, viewport, true)
}

fn build(
    position: Vec2,
    size: Vec2,
    rotation: f32,
    viewport: Viewport,
    correct_aspect: bool,
) -> [QuadVertex; 4] {
    let top_left = viewport.to_ndc(position);
    let bottom_right = viewport.to_ndc(position + size);

    let mut corners = [
        Vec2::new(bottom_right.x, bottom_right.y),
        Vec2::new(bottom_right.x, top_left.y),
        Vec2::new(top_left.x, top_left.y),
        Vec2::new(top_left.x, bottom_right.y),
    ];

    if rotation != 0.0 {
        let center = top_left.midpoint(bottom_right);
        let aspect = if correct_aspect { viewport.aspect_ratio() } else { 1.0 };
        let (sin, cos) = rotation.sin_cos();
        for corner in &mut corners {
            *corner = rotate_about(*corner, center, cos, sin, aspect);
        }
    }

    let mut out = [QuadVertex::default(); 4];
    for (i, (corner, uv)) in corners.iter().zip(QUAD_UVS).enumerate() {
        out[i] = QuadVertex {
            position: [corner.x, corner.y, 0.0],
            uv,
        };
    }
    out
}

/// NDC is anisotropic on a non-square viewport, so X is stretched into
/// square units before rotating and shrunk back afterwards.
#[inline]
fn rotate_about(p: Vec2, center: Vec2, cos: f32, sin: f32, aspect: f32) -> Vec2 {
    let d = p - center;
    let r = Vec2::new(d.x * aspect, d.y).rotated(cos, sin);
    Vec2::new(r.x / aspect, r.y) + center
}
