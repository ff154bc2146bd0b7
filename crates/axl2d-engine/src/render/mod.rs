//! GPU rendering subsystem.
//!
//! Drawables talk to the GPU only through [`RenderContext`] and the narrow
//! [`GpuBackend`] trait. [`WgpuBackend`] is the real implementation; it owns
//! the single shared [`QuadProgram`].
//!
//! Convention:
//! - geometry arrives already in NDC (see `transform`)
//! - colors are straight alpha

mod backend;
mod ctx;
mod program;
#[cfg(test)]
pub(crate) mod recording;
mod wgpu_backend;

pub use backend::{
    FilterMode, GeometryHandle, GpuBackend, PixelFormat, TextureDesc, TextureHandle,
    TextureOptions, WrapMode,
};
pub use ctx::RenderContext;
pub use program::{check_interface, validate_stage, QuadProgram, ShaderStage};
pub use wgpu_backend::WgpuBackend;
