use std::collections::HashMap;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::device::{Gpu, GpuFrame, SurfaceErrorAction};
use crate::error::RenderError;
use crate::paint::Color;
use crate::transform::{QuadVertex, QUAD_INDICES};

use super::backend::{
    GeometryHandle, GpuBackend, PixelFormat, TextureDesc, TextureHandle, TextureOptions,
};
use super::program::{QuadProgram, TintInstance};

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    format: PixelFormat,
    options: TextureOptions,
}

/// Draws queued during the current frame.
///
/// Vertices are copied at draw time, so a drawable moved between two draws in
/// the same frame renders at both positions.
struct FrameRecording {
    frame: GpuFrame,
    clear: Color,
    program_selected: bool,
    vertices: Vec<QuadVertex>,
    tints: Vec<TintInstance>,
    textures: Vec<Option<TextureHandle>>,
}

/// `GpuBackend` on wgpu. Geometry lives CPU-side and is streamed into one
/// vertex buffer per frame; each texture owns its sampler and bind group.
pub struct WgpuBackend {
    gpu: Gpu,
    program: QuadProgram,

    geometries: HashMap<GeometryHandle, [QuadVertex; 4]>,
    textures: HashMap<TextureHandle, GpuTexture>,
    white: GpuTexture,
    next_handle: u32,

    index_buffer: wgpu::Buffer,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    instance_buffer: Option<wgpu::Buffer>,
    instance_capacity: usize,

    frame: Option<FrameRecording>,
}

impl WgpuBackend {
    /// Builds the quad program for the surface format of `gpu`.
    pub fn new(gpu: Gpu) -> Result<Self, RenderError> {
        let program = QuadProgram::new(gpu.device(), gpu.surface_format())?;

        let index_buffer = gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("axl2d quad ibo"),
                contents: bytemuck::cast_slice(&QUAD_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            });

        let white_desc = TextureDesc {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
            options: TextureOptions::default(),
        };
        let white = create_gpu_texture(&gpu, &program, &white_desc, "axl2d white texture");
        write_pixels(&gpu, &white, &[255, 255, 255, 255]);

        Ok(Self {
            gpu,
            program,
            geometries: HashMap::new(),
            textures: HashMap::new(),
            white,
            next_handle: 0,
            index_buffer,
            vertex_buffer: None,
            vertex_capacity: 0,
            instance_buffer: None,
            instance_capacity: 0,
            frame: None,
        })
    }

    fn next_handle(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        id
    }

    fn ensure_vertex_capacity(&mut self, required: usize) {
        if required <= self.vertex_capacity && self.vertex_buffer.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(256);
        self.vertex_buffer = Some(self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("axl2d frame vbo"),
            size: (new_cap * std::mem::size_of::<QuadVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }

    fn ensure_instance_capacity(&mut self, required: usize) {
        if required <= self.instance_capacity && self.instance_buffer.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        self.instance_buffer = Some(self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("axl2d frame instance vbo"),
            size: (new_cap * std::mem::size_of::<TintInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }
}

fn create_gpu_texture(
    gpu: &Gpu,
    program: &QuadProgram,
    desc: &TextureDesc,
    label: &str,
) -> GpuTexture {
    let device = gpu.device();
    let width = desc.width.max(1);
    let height = desc.height.max(1);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: desc.format.to_wgpu(),
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let address_mode = desc.options.address_mode();
    let filter = desc.options.filter_mode();
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("axl2d quad sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("axl2d quad bind group"),
        layout: program.bind_group_layout(),
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    GpuTexture {
        texture,
        bind_group,
        width,
        height,
        format: desc.format,
        options: desc.options,
    }
}

fn write_pixels(gpu: &Gpu, target: &GpuTexture, pixels: &[u8]) {
    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(target.width * target.format.bytes_per_pixel() as u32),
            rows_per_image: Some(target.height),
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
}

impl GpuBackend for WgpuBackend {
    fn begin_frame(&mut self) -> Result<bool, RenderError> {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is open; previous frame dropped");
            self.frame = None;
        }

        if !self.gpu.is_presentable() {
            return Ok(false);
        }

        let frame = match self.gpu.acquire() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.recover(err) {
                    SurfaceErrorAction::Fatal => Err(RenderError::SurfaceLost),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(false),
                };
            }
        };

        self.frame = Some(FrameRecording {
            frame,
            clear: Color::BLACK,
            program_selected: false,
            vertices: Vec::new(),
            tints: Vec::new(),
            textures: Vec::new(),
        });
        Ok(true)
    }

    fn use_program(&mut self) {
        if let Some(rec) = self.frame.as_mut() {
            rec.program_selected = true;
        }
    }

    fn clear(&mut self, color: Color) {
        if let Some(rec) = self.frame.as_mut() {
            rec.clear = color;
        }
    }

    fn create_geometry(&mut self) -> GeometryHandle {
        let handle = GeometryHandle(self.next_handle());
        self.geometries.insert(handle, [QuadVertex::default(); 4]);
        handle
    }

    fn upload_geometry(
        &mut self,
        geometry: GeometryHandle,
        vertices: &[QuadVertex; 4],
    ) -> Result<(), RenderError> {
        let slot = self
            .geometries
            .get_mut(&geometry)
            .ok_or(RenderError::UnknownGeometry)?;
        *slot = *vertices;
        Ok(())
    }

    fn delete_geometry(&mut self, geometry: GeometryHandle) {
        self.geometries.remove(&geometry);
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> TextureHandle {
        let handle = TextureHandle(self.next_handle());
        let texture = create_gpu_texture(&self.gpu, &self.program, desc, "axl2d drawable texture");
        log::debug!("texture {handle:?} created: {}x{} {:?}", desc.width, desc.height, desc.format);
        self.textures.insert(handle, texture);
        handle
    }

    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), RenderError> {
        let current = self.textures.get(&texture).ok_or(RenderError::UnknownTexture)?;

        let expected = width as usize * height as usize * current.format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(RenderError::PixelBufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        if current.width != width || current.height != height {
            let desc = TextureDesc {
                width,
                height,
                format: current.format,
                options: current.options,
            };
            log::debug!(
                "texture {texture:?} reallocated: {}x{} -> {width}x{height}",
                current.width,
                current.height
            );
            let replacement =
                create_gpu_texture(&self.gpu, &self.program, &desc, "axl2d drawable texture");
            self.textures.insert(texture, replacement);
        }

        let target = self.textures.get(&texture).ok_or(RenderError::UnknownTexture)?;
        write_pixels(&self.gpu, target, pixels);
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            log::debug!("texture {texture:?} deleted");
        }
    }

    fn draw_quad(
        &mut self,
        geometry: GeometryHandle,
        texture: Option<TextureHandle>,
        tint: Color,
    ) -> Result<(), RenderError> {
        let vertices = *self
            .geometries
            .get(&geometry)
            .ok_or(RenderError::UnknownGeometry)?;
        if let Some(t) = texture {
            if !self.textures.contains_key(&t) {
                return Err(RenderError::UnknownTexture);
            }
        }

        let rec = self.frame.as_mut().ok_or(RenderError::FrameNotStarted)?;
        rec.vertices.extend_from_slice(&vertices);
        rec.tints.push(TintInstance {
            color: tint.to_array(),
        });
        rec.textures.push(texture);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let rec = self.frame.take().ok_or(RenderError::FrameNotStarted)?;
        let FrameRecording {
            mut frame,
            clear,
            program_selected,
            vertices,
            tints,
            textures,
        } = rec;

        if !textures.is_empty() {
            if !program_selected {
                log::warn!("quads drawn without selecting the program");
            }
            self.ensure_vertex_capacity(vertices.len());
            self.ensure_instance_capacity(tints.len());
        }

        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("axl2d quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let (false, Some(vbo), Some(instances)) = (
                textures.is_empty(),
                self.vertex_buffer.as_ref(),
                self.instance_buffer.as_ref(),
            ) {
                self.gpu.queue().write_buffer(vbo, 0, bytemuck::cast_slice(&vertices));
                self.gpu.queue().write_buffer(instances, 0, bytemuck::cast_slice(&tints));

                rpass.set_pipeline(self.program.pipeline());
                rpass.set_vertex_buffer(0, vbo.slice(..));
                rpass.set_vertex_buffer(1, instances.slice(..));
                rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for (i, texture) in textures.iter().enumerate() {
                    let bind_group = match texture {
                        None => &self.white.bind_group,
                        Some(handle) => match self.textures.get(handle) {
                            Some(t) => &t.bind_group,
                            None => {
                                log::debug!("texture {handle:?} deleted mid-frame; draw skipped");
                                continue;
                            }
                        },
                    };

                    let i = i as u32;
                    rpass.set_bind_group(0, bind_group, &[]);
                    rpass.draw_indexed(0..QUAD_INDICES.len() as u32, (i * 4) as i32, i..i + 1);
                }
            }
        }

        self.gpu.present(frame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }
}
