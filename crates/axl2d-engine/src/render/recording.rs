//! Test backend that records every call instead of touching a GPU.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::RenderError;
use crate::paint::Color;
use crate::transform::QuadVertex;

use super::backend::{GeometryHandle, GpuBackend, TextureDesc, TextureHandle};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GpuCall {
    BeginFrame,
    UseProgram,
    Clear(Color),
    CreateGeometry(GeometryHandle),
    UploadGeometry(GeometryHandle, [QuadVertex; 4]),
    DeleteGeometry(GeometryHandle),
    CreateTexture(TextureHandle, TextureDesc),
    UploadTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
        first_pixel: [u8; 4],
    },
    DeleteTexture(TextureHandle),
    DrawQuad {
        geometry: GeometryHandle,
        texture: Option<TextureHandle>,
        tint: Color,
    },
    EndFrame,
    Resize(u32, u32),
}

/// Shared view of the recorded calls.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Rc<RefCell<Vec<GpuCall>>>);

impl CallLog {
    pub(crate) fn calls(&self) -> Vec<GpuCall> {
        self.0.borrow().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&GpuCall) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, call: GpuCall) {
        self.0.borrow_mut().push(call);
    }
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    log: CallLog,
    next_handle: u32,
    in_frame: bool,
    skip_frames: bool,
    geometries: HashSet<GeometryHandle>,
    textures: HashMap<TextureHandle, TextureDesc>,
}

impl RecordingBackend {
    pub(crate) fn new() -> (Self, CallLog) {
        let backend = Self::default();
        let log = backend.log.clone();
        (backend, log)
    }

    /// Makes `begin_frame` report a skipped frame, as a minimized window does.
    pub(crate) fn skipping_frames() -> (Self, CallLog) {
        let (mut backend, log) = Self::new();
        backend.skip_frames = true;
        (backend, log)
    }

    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GpuBackend for RecordingBackend {
    fn begin_frame(&mut self) -> Result<bool, RenderError> {
        self.log.push(GpuCall::BeginFrame);
        self.in_frame = !self.skip_frames;
        Ok(self.in_frame)
    }

    fn use_program(&mut self) {
        self.log.push(GpuCall::UseProgram);
    }

    fn clear(&mut self, color: Color) {
        self.log.push(GpuCall::Clear(color));
    }

    fn create_geometry(&mut self) -> GeometryHandle {
        let handle = GeometryHandle(self.next_handle());
        self.geometries.insert(handle);
        self.log.push(GpuCall::CreateGeometry(handle));
        handle
    }

    fn upload_geometry(
        &mut self,
        geometry: GeometryHandle,
        vertices: &[QuadVertex; 4],
    ) -> Result<(), RenderError> {
        if !self.geometries.contains(&geometry) {
            return Err(RenderError::UnknownGeometry);
        }
        self.log.push(GpuCall::UploadGeometry(geometry, *vertices));
        Ok(())
    }

    fn delete_geometry(&mut self, geometry: GeometryHandle) {
        self.geometries.remove(&geometry);
        self.log.push(GpuCall::DeleteGeometry(geometry));
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> TextureHandle {
        let handle = TextureHandle(self.next_handle());
        self.textures.insert(handle, *desc);
        self.log.push(GpuCall::CreateTexture(handle, *desc));
        handle
    }

    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), RenderError> {
        let desc = self.textures.get(&texture).ok_or(RenderError::UnknownTexture)?;
        let expected = width as usize * height as usize * desc.format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(RenderError::PixelBufferSize {
                expected,
                actual: pixels.len(),
            });
        }

        let mut first_pixel = [0; 4];
        if let Some(px) = pixels.get(..4) {
            first_pixel.copy_from_slice(px);
        }
        self.log.push(GpuCall::UploadTexture {
            texture,
            width,
            height,
            first_pixel,
        });
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.log.push(GpuCall::DeleteTexture(texture));
    }

    fn draw_quad(
        &mut self,
        geometry: GeometryHandle,
        texture: Option<TextureHandle>,
        tint: Color,
    ) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        if !self.geometries.contains(&geometry) {
            return Err(RenderError::UnknownGeometry);
        }
        if texture.is_some_and(|t| !self.textures.contains_key(&t)) {
            return Err(RenderError::UnknownTexture);
        }
        self.log.push(GpuCall::DrawQuad {
            geometry,
            texture,
            tint,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        self.in_frame = false;
        self.log.push(GpuCall::EndFrame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.push(GpuCall::Resize(width, height));
    }
}
