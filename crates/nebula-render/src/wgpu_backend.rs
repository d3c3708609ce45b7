//! [`DrawBackend`] on top of wgpu.
//!
//! Draws are recorded during the frame and replayed by [`WgpuBackend::flush`]
//! once the surface texture is known. Every draw gets its own 256-byte block
//! in a shared uniform buffer, selected with a dynamic offset.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::backend::{DrawBackend, RenderError, RenderTarget, TargetId};
use crate::shaders::{EFFECTS_SHADER_SOURCE, all_programs, entry_points};
use crate::stage::{Geometry, PipelineStage, ProgramId, UNIFORM_SLOTS};

const BLOCK_SIZE: u64 = (UNIFORM_SLOTS * 16) as u64;
const INITIAL_BLOCKS: u64 = 256;

type UniformBlock = [[f32; 4]; UNIFORM_SLOTS];

struct Offscreen {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

enum Recorded {
    Clear {
        target: RenderTarget,
        color: [f32; 4],
    },
    Draw {
        target: RenderTarget,
        program: ProgramId,
        block: u32,
        texture: Option<TargetId>,
        geometry: Geometry,
    },
}

impl Recorded {
    fn target(&self) -> RenderTarget {
        match self {
            Recorded::Clear { target, .. } | Recorded::Draw { target, .. } => *target,
        }
    }
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    pipelines: FxHashMap<ProgramId, wgpu::RenderPipeline>,
    params_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    quad_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    params_capacity: u64,
    targets: FxHashMap<TargetId, Offscreen>,
    retired: Vec<TargetId>,
    next_id: u32,
    recorded: Vec<Recorded>,
    blocks: Vec<UniformBlock>,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("effects-shader"),
            source: wgpu::ShaderSource::Wgsl(EFFECTS_SHADER_SOURCE.into()),
        });

        let params_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effects-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(BLOCK_SIZE),
                },
                count: None,
            }],
        });
        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effects-texture-bgl"),
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

        let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effects-plain-layout"),
            bind_group_layouts: &[&params_bgl],
            immediate_size: 0,
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effects-textured-layout"),
            bind_group_layouts: &[&params_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let mut pipelines = FxHashMap::default();
        for program in all_programs() {
            let layout = if program.samples_texture() {
                &textured_layout
            } else {
                &plain_layout
            };
            pipelines.insert(
                program,
                create_effect_pipeline(device, &shader, layout, program, format),
            );
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("effects-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let mut quad = Vec::with_capacity(8);
        quad.extend_from_slice(&Geometry::UnitQuad.vertices());
        quad.extend_from_slice(&Geometry::CenteredQuad.vertices());
        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("effects-quads"),
            contents: bytemuck::cast_slice(&quad),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (params_buffer, params_bind_group) =
            create_params_buffer(device, &params_bgl, INITIAL_BLOCKS);

        log::info!(
            "Effects backend ready: {} pipelines, {format:?}",
            pipelines.len()
        );

        Self {
            device: device.clone(),
            queue: queue.clone(),
            format,
            pipelines,
            params_bgl,
            texture_bgl,
            sampler,
            quad_buffer,
            params_buffer,
            params_bind_group,
            params_capacity: INITIAL_BLOCKS,
            targets: FxHashMap::default(),
            retired: Vec::new(),
            next_id: 0,
            recorded: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Number of commands waiting for [`flush`](Self::flush).
    pub fn pending(&self) -> usize {
        self.recorded.len()
    }

    /// Replay this frame's commands into `screen` and submit them.
    pub fn flush(&mut self, screen: &wgpu::TextureView) {
        let recorded = std::mem::take(&mut self.recorded);
        let blocks = std::mem::take(&mut self.blocks);
        if !recorded.is_empty() {
            self.upload_blocks(&blocks);
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("effects-encoder"),
                });
            self.encode(&mut encoder, screen, &recorded);
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        for id in self.retired.drain(..) {
            self.targets.remove(&id);
        }
    }

    fn upload_blocks(&mut self, blocks: &[UniformBlock]) {
        let needed = blocks.len() as u64;
        if needed > self.params_capacity {
            let capacity = needed.next_power_of_two();
            log::debug!("Growing effect uniform buffer to {capacity} blocks");
            let (buffer, bind_group) = create_params_buffer(&self.device, &self.params_bgl, capacity);
            self.params_buffer = buffer;
            self.params_bind_group = bind_group;
            self.params_capacity = capacity;
        }
        let mut bytes = Vec::with_capacity(blocks.len() * BLOCK_SIZE as usize);
        for block in blocks {
            bytes.extend_from_slice(bytemuck::cast_slice(block));
        }
        self.queue.write_buffer(&self.params_buffer, 0, &bytes);
    }

    fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        screen: &wgpu::TextureView,
        recorded: &[Recorded],
    ) {
        let mut i = 0;
        while i < recorded.len() {
            let target = recorded[i].target();
            let mut load = wgpu::LoadOp::Load;
            if let Recorded::Clear { color, .. } = recorded[i] {
                load = wgpu::LoadOp::Clear(wgpu::Color {
                    r: color[0] as f64,
                    g: color[1] as f64,
                    b: color[2] as f64,
                    a: color[3] as f64,
                });
                i += 1;
            }
            let start = i;
            while i < recorded.len()
                && matches!(recorded[i], Recorded::Draw { .. })
                && recorded[i].target() == target
            {
                i += 1;
            }

            let view = match target {
                RenderTarget::Screen => screen,
                RenderTarget::Offscreen(id) => match self.targets.get(&id) {
                    Some(t) => &t.view,
                    None => {
                        log::warn!("Skipping commands for released {id}");
                        continue;
                    }
                },
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("effects-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));

            for cmd in &recorded[start..i] {
                let Recorded::Draw {
                    program,
                    block,
                    texture,
                    geometry,
                    ..
                } = cmd
                else {
                    continue;
                };
                let Some(pipeline) = self.pipelines.get(program) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                let offset = (*block as u64 * BLOCK_SIZE) as u32;
                pass.set_bind_group(0, &self.params_bind_group, &[offset]);
                if let Some(id) = texture {
                    match self.targets.get(id) {
                        Some(source) => pass.set_bind_group(1, &source.bind_group, &[]),
                        None => continue,
                    }
                }
                let first = geometry.first_vertex();
                pass.draw(first..first + 4, 0..1);
            }
        }
    }

    fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

impl DrawBackend for WgpuBackend {
    fn create_target(&mut self, width: u32, height: u32) -> Result<TargetId, RenderError> {
        let max = self.max_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::ResourceExhausted { width, height });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("effects-offscreen"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effects-offscreen-bg"),
            layout: &self.texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(
            id,
            Offscreen {
                _texture: texture,
                view,
                bind_group,
            },
        );
        log::debug!("Created {width}x{height} {id}");
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        // Commands recorded this frame may still reference it.
        if self.targets.contains_key(&id) && !self.retired.contains(&id) {
            self.retired.push(id);
        }
    }

    fn clear(&mut self, target: RenderTarget, color: [f32; 4]) -> Result<(), RenderError> {
        self.check_target(target)?;
        self.recorded.push(Recorded::Clear { target, color });
        Ok(())
    }

    fn draw(
        &mut self,
        target: RenderTarget,
        stage: &PipelineStage,
        geometry: Geometry,
    ) -> Result<(), RenderError> {
        self.check_target(target)?;
        if let Some(id) = stage.texture {
            self.check_target(RenderTarget::Offscreen(id))?;
        }
        if stage.program.samples_texture() && stage.texture.is_none() {
            return Err(RenderError::Backend(format!(
                "{:?} needs a source texture",
                stage.program
            )));
        }
        let block = self.blocks.len() as u32;
        self.blocks.push(stage.packed_uniforms());
        self.recorded.push(Recorded::Draw {
            target,
            program: stage.program,
            block,
            texture: stage.texture,
            geometry,
        });
        Ok(())
    }
}

impl WgpuBackend {
    fn check_target(&self, target: RenderTarget) -> Result<(), RenderError> {
        match target {
            RenderTarget::Screen => Ok(()),
            RenderTarget::Offscreen(id) => {
                if self.targets.contains_key(&id) && !self.retired.contains(&id) {
                    Ok(())
                } else {
                    Err(RenderError::UnknownTarget(id))
                }
            }
        }
    }
}

fn create_params_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    blocks: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("effects-params"),
        size: blocks * BLOCK_SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("effects-params-bg"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(BLOCK_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_effect_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    program: ProgramId,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let (vs, fs) = entry_points(program);
    let label = format!("effects-{program:?}");
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label.as_str()),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}
