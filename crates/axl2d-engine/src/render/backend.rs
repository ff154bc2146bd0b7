use crate::error::RenderError;
use crate::paint::Color;
use crate::transform::QuadVertex;

/// Quad geometry owned by one drawable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub(crate) u32);

/// Texture owned by one drawable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

/// Texel layout of uploaded pixel data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    /// Byte order used by web view and capture surfaces.
    Bgra8,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    pub(crate) fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
            PixelFormat::Bgra8 => wgpu::TextureFormat::Bgra8UnormSrgb,
        }
    }
}

/// Texture coordinate wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Per-drawable sampling options.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TextureOptions {
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

impl TextureOptions {
    pub(crate) fn address_mode(self) -> wgpu::AddressMode {
        match self.wrap {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }

    pub(crate) fn filter_mode(self) -> wgpu::FilterMode {
        match self.filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// Initial texture allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub options: TextureOptions,
}

/// Narrow GPU interface used by the frame orchestrator and drawables.
///
/// Frame protocol: `begin_frame`, `use_program`, `clear`, any number of
/// `draw_quad`, `end_frame`. Draws are composited in call order. Each draw
/// carries its own bindings; nothing stays bound between draws.
pub trait GpuBackend {
    /// Acquires the next frame. `Ok(false)` means skip this frame.
    fn begin_frame(&mut self) -> Result<bool, RenderError>;

    /// Selects the shared quad program for subsequent draws.
    fn use_program(&mut self);

    /// Clears the full target.
    fn clear(&mut self, color: Color);

    fn create_geometry(&mut self) -> GeometryHandle;

    /// Replaces the four vertices of `geometry`.
    fn upload_geometry(
        &mut self,
        geometry: GeometryHandle,
        vertices: &[QuadVertex; 4],
    ) -> Result<(), RenderError>;

    fn delete_geometry(&mut self, geometry: GeometryHandle);

    fn create_texture(&mut self, desc: &TextureDesc) -> TextureHandle;

    /// Uploads a full image. The texture is reallocated when the size differs
    /// from its current one.
    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), RenderError>;

    fn delete_texture(&mut self, texture: TextureHandle);

    /// Draws `geometry` with its six fixed indices. `None` samples white, so
    /// the tint alone gives the color.
    fn draw_quad(
        &mut self,
        geometry: GeometryHandle,
        texture: Option<TextureHandle>,
        tint: Color,
    ) -> Result<(), RenderError>;

    /// Submits and presents the frame.
    fn end_frame(&mut self) -> Result<(), RenderError>;

    /// Adapts the target to a new physical size.
    fn resize(&mut self, width: u32, height: u32);
}
