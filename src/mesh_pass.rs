//! The wgpu implementation of [`Backend`].
//!
//! `MeshPass` turns the GL-style call stream coming from the scene graph into
//! one render pass per frame:
//!
//! - every program keeps a CPU-side [`UniformBlock`] that named uniform writes
//!   land in
//! - each `draw_indexed` snapshots the active block into a staging area, one
//!   slot per draw at the device's uniform offset alignment, and records which
//!   geometry and texture to use
//! - [`MeshPass::finish_frame`] uploads all snapshots in one write, then replays
//!   the draws with dynamic offsets into the uniform buffer
//!
//! # Bind Groups
//!
//! | Group | Binding | Contents                              |
//! |-------|---------|---------------------------------------|
//! | 0     | 0       | `Uniforms` (dynamic offset)           |
//! | 1     | 0       | diffuse texture (`texture_2d<f32>`)   |
//! | 1     | 1       | diffuse sampler                       |
//!
//! Untextured draws get a 1x1 white texture at group 1 so every pipeline sees
//! the same layout.

use std::borrow::Cow;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::backend::{Backend, GeometryId, ShaderId, TextureId};
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::mesh::Vertex;
use crate::shader::{FRAGMENT_ENTRY, ShaderSource, VERTEX_ENTRY};
use crate::texture::{Texture, TextureImage, TextureOptions};
use crate::uniforms::{UniformBlock, UniformSink, UniformValue};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_UNIFORM_SLOTS: u64 = 64;

struct Program {
    label: String,
    fill: wgpu::RenderPipeline,
    wireframe: Option<wgpu::RenderPipeline>,
    uniforms: UniformBlock,
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct PendingDraw {
    program: ShaderId,
    geometry: GeometryId,
    index_count: u32,
    texture: Option<TextureId>,
    uniform_offset: u32,
}

/// Renders the scene's draw calls into the window surface.
///
/// Draws are recorded as the scene issues them and replayed by
/// [`MeshPass::finish_frame`].
pub struct MeshPass {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_slots: u64,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    default_texture: wgpu::BindGroup,
    programs: Vec<Program>,
    geometry: Vec<GpuGeometry>,
    textures: Vec<(Texture, wgpu::BindGroup)>,
    current: Option<ShaderId>,
    bound_texture: Option<TextureId>,
    draws: Vec<PendingDraw>,
    staging: Vec<u8>,
    wireframe: bool,
    line_supported: bool,
    border_supported: bool,
}

impl MeshPass {
    /// Creates the bind group layouts, the uniform buffer, a depth buffer the
    /// size of the surface and the default white texture.
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UniformBlock::SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
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
            label: Some("Planet Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = UniformBlock::SIZE.div_ceil(alignment) * alignment;
        let (uniform_buffer, uniform_bind_group) =
            Self::create_uniform_buffer(device, &uniform_layout, uniform_stride * INITIAL_UNIFORM_SLOTS);

        let white = Texture::white(device, &gpu.queue);
        let default_texture = Self::create_texture_bind_group(device, &texture_layout, &white);

        let line_supported = gpu.supports(wgpu::Features::POLYGON_MODE_LINE);
        if !line_supported {
            log::info!("adapter lacks line polygon mode, wireframe toggle disabled");
        }

        Self {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            surface_format: gpu.config.format,
            pipeline_layout,
            uniform_layout,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_slots: INITIAL_UNIFORM_SLOTS,
            depth_view: Self::create_depth_view(gpu),
            depth_size: (gpu.width(), gpu.height()),
            default_texture,
            programs: Vec::new(),
            geometry: Vec::new(),
            textures: Vec::new(),
            current: None,
            bound_texture: None,
            draws: Vec::new(),
            staging: Vec::new(),
            wireframe: false,
            line_supported,
            border_supported: gpu.supports(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER),
        }
    }

    fn create_uniform_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        size: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(UniformBlock::SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn create_texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Diffuse Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    fn ensure_uniform_slots(&mut self, slots: u64) {
        if slots <= self.uniform_slots {
            return;
        }
        let grown = slots.next_power_of_two();
        log::debug!("growing draw uniform buffer to {grown} slots");
        let (buffer, bind_group) =
            Self::create_uniform_buffer(&self.device, &self.uniform_layout, grown * self.uniform_stride);
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        self.uniform_slots = grown;
    }

    fn create_pipeline(
        &self,
        label: &str,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        polygon_mode: wgpu::PolygonMode,
    ) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Compiles one WGSL stage, turning validation errors into [`Error::Gpu`].
    fn compile(&self, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(Error::Gpu(format!("shader '{label}' failed to compile: {error}"))),
            None => Ok(module),
        }
    }

    /// Switches between filled and line rendering.
    ///
    /// Returns the mode now in effect; wireframe stays off on adapters without
    /// line polygon mode.
    pub fn set_wireframe(&mut self, enabled: bool) -> bool {
        self.wireframe = enabled && self.line_supported;
        self.wireframe
    }

    /// Whether line rendering is on.
    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Draws recorded so far this frame.
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Uploads this frame's uniforms, replays the recorded draws into one
    /// render pass and presents.
    pub fn finish_frame(&mut self, gpu: &GpuContext, clear: wgpu::Color) -> Result<()> {
        self.ensure_depth_size(gpu);
        self.ensure_uniform_slots(self.draws.len() as u64);
        if !self.staging.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.staging);
        }

        let Some(frame) = gpu.acquire_frame()? else {
            self.reset_frame();
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Planet Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &self.draws {
                let (Some(program), Some(geometry)) = (
                    self.programs.get(draw.program.0),
                    self.geometry.get(draw.geometry.0),
                ) else {
                    continue;
                };
                let pipeline = match (&program.wireframe, self.wireframe) {
                    (Some(lines), true) => lines,
                    _ => &program.fill,
                };
                let texture = draw
                    .texture
                    .and_then(|t| self.textures.get(t.0))
                    .map_or(&self.default_texture, |(_, bind_group)| bind_group);

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                render_pass.set_bind_group(1, texture, &[]);
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.reset_frame();
        Ok(())
    }

    fn reset_frame(&mut self) {
        self.draws.clear();
        self.staging.clear();
    }
}

impl UniformSink for MeshPass {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(program) = self.current.and_then(|id| self.programs.get_mut(id.0)) else {
            log::warn!("uniform '{name}' set with no active shader program");
            return;
        };
        if !program.uniforms.apply(name, value) {
            log::debug!("program '{}' has no uniform '{name}' taking {value:?}", program.label);
        }
    }
}

impl Backend for MeshPass {
    fn upload_geometry(
        &mut self,
        slot: Option<GeometryId>,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<GeometryId> {
        let uploaded = GpuGeometry {
            vertex_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
        };

        match slot {
            Some(id) => {
                let existing = self
                    .geometry
                    .get_mut(id.0)
                    .ok_or_else(|| Error::invalid_handle("geometry", id.0))?;
                *existing = uploaded;
                Ok(id)
            }
            None => {
                self.geometry.push(uploaded);
                Ok(GeometryId(self.geometry.len() - 1))
            }
        }
    }

    fn upload_texture(&mut self, image: &TextureImage, options: TextureOptions) -> Result<TextureId> {
        let texture = Texture::from_image(&self.device, &self.queue, image, options, self.border_supported);
        let bind_group = Self::create_texture_bind_group(&self.device, &self.texture_layout, &texture);
        log::debug!("uploaded texture {} ({}x{})", image.label(), texture.width, texture.height);
        self.textures.push((texture, bind_group));
        Ok(TextureId(self.textures.len() - 1))
    }

    fn create_shader(&mut self, source: &ShaderSource) -> Result<ShaderId> {
        let vertex = self.compile(&format!("{} (vertex)", source.label()), source.vertex())?;
        let fragment = self.compile(&format!("{} (fragment)", source.label()), source.fragment())?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let fill = self.create_pipeline(source.label(), &vertex, &fragment, wgpu::PolygonMode::Fill);
        let wireframe = self
            .line_supported
            .then(|| self.create_pipeline(source.label(), &vertex, &fragment, wgpu::PolygonMode::Line));
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::Gpu(format!(
                "program '{}' failed to link: {error}",
                source.label()
            )));
        }

        log::info!("compiled shader program '{}'", source.label());
        self.programs.push(Program {
            label: source.label().to_owned(),
            fill,
            wireframe,
            uniforms: UniformBlock::default(),
        });
        Ok(ShaderId(self.programs.len() - 1))
    }

    fn use_shader(&mut self, shader: ShaderId) -> Result<()> {
        if shader.0 >= self.programs.len() {
            return Err(Error::invalid_handle("shader", shader.0));
        }
        self.current = Some(shader);
        Ok(())
    }

    fn bind_texture(&mut self, _unit: u32, texture: TextureId) -> Result<()> {
        if texture.0 >= self.textures.len() {
            return Err(Error::invalid_handle("texture", texture.0));
        }
        self.bound_texture = Some(texture);
        Ok(())
    }

    fn draw_indexed(&mut self, geometry: GeometryId, index_count: u32) -> Result<()> {
        let shader = self.current.ok_or(Error::NotInitialized("shader program"))?;
        let uploaded = self
            .geometry
            .get(geometry.0)
            .ok_or_else(|| Error::invalid_handle("geometry", geometry.0))?;
        if index_count > uploaded.index_count {
            return Err(Error::Gpu(format!(
                "draw of {index_count} indices exceeds the {} uploaded",
                uploaded.index_count
            )));
        }
        let program = self
            .programs
            .get(shader.0)
            .ok_or_else(|| Error::invalid_handle("shader", shader.0))?;

        let offset = self.staging.len();
        self.staging.extend_from_slice(bytemuck::bytes_of(&program.uniforms));
        self.staging.resize(offset + self.uniform_stride as usize, 0);

        self.draws.push(PendingDraw {
            program: shader,
            geometry,
            index_count,
            texture: self.bound_texture,
            uniform_offset: offset as u32,
        });
        Ok(())
    }
}
