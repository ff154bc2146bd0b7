use std::fmt;

use bytemuck::{Pod, Zeroable};
use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::RenderError;
use crate::transform::QuadVertex;

const VERTEX_SOURCE: &str = include_str!("shaders/quad_vertex.wgsl");
const FRAGMENT_SOURCE: &str = include_str!("shaders/quad_fragment.wgsl");

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }

    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Parses and validates one stage's WGSL.
///
/// The module must declare the stage's entry point (`vs_main` / `fs_main`).
pub fn validate_stage(stage: ShaderStage, source: &str) -> Result<naga::Module, RenderError> {
    let fail = |message: String| RenderError::ShaderCompile { stage, message };

    let module = wgsl::parse_str(source).map_err(|e| fail(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| fail(e.emit_to_string(source)))?;

    let found = module
        .entry_points
        .iter()
        .any(|ep| ep.name == stage.entry_point() && ep.stage == stage.naga());
    if !found {
        return Err(fail(format!("missing {stage} entry point `{}`", stage.entry_point())));
    }

    Ok(module)
}

/// Checks that every fragment input location is written by the vertex stage.
pub fn check_interface(vertex: &naga::Module, fragment: &naga::Module) -> Result<(), RenderError> {
    let written = locations(vertex, ShaderStage::Vertex);
    let read = locations(fragment, ShaderStage::Fragment);

    match read.iter().find(|loc| !written.contains(loc)) {
        None => Ok(()),
        Some(loc) => Err(RenderError::ShaderCompile {
            stage: ShaderStage::Fragment,
            message: format!("input @location({loc}) is not written by the vertex stage"),
        }),
    }
}

/// Vertex outputs or fragment inputs, by location.
fn locations(module: &naga::Module, stage: ShaderStage) -> Vec<u32> {
    let Some(ep) = module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point())
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut collect = |ty: naga::Handle<naga::Type>, binding: Option<&naga::Binding>| {
        if let Some(naga::Binding::Location { location, .. }) = binding {
            out.push(*location);
        }
        if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
            for m in members {
                if let Some(naga::Binding::Location { location, .. }) = &m.binding {
                    out.push(*location);
                }
            }
        }
    };

    match stage {
        ShaderStage::Vertex => {
            if let Some(result) = &ep.function.result {
                collect(result.ty, result.binding.as_ref());
            }
        }
        ShaderStage::Fragment => {
            for arg in &ep.function.arguments {
                collect(arg.ty, arg.binding.as_ref());
            }
        }
    }
    out
}

/// Straight (non-premultiplied) alpha: `src * a + dst * (1 - a)`.
pub(crate) fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Per-draw instance data.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct TintInstance {
    pub color: [f32; 4],
}

impl TintInstance {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x4];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TintInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// The single shared quad pipeline: textured, tinted, alpha blended.
pub struct QuadProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl QuadProgram {
    /// Validates both stages, then builds the pipeline for `format`.
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let vs = validate_stage(ShaderStage::Vertex, VERTEX_SOURCE)?;
        let fs = validate_stage(ShaderStage::Fragment, FRAGMENT_SOURCE)?;
        check_interface(&vs, &fs)?;

        let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("axl2d quad vertex"),
            source: wgpu::ShaderSource::Wgsl(VERTEX_SOURCE.into()),
        });
        let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("axl2d quad fragment"),
            source: wgpu::ShaderSource::Wgsl(FRAGMENT_SOURCE.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("axl2d quad bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("axl2d quad pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("axl2d quad pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), TintInstance::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(straight_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("quad program built for {format:?}");

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    #[inline]
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    #[inline]
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}
