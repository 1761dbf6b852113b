//! wgpu Backend
//!
//! Headless [`GraphicsBackend`] implementation over wgpu. Owns the device
//! and queue, an offscreen color + depth target, and the resource tables
//! for buffers and linked programs.
//!
//! Frames are recorded, not streamed: `begin_frame` opens a draw list,
//! `draw` appends to it, and `end_frame` encodes the whole list into a
//! single render pass (clear, replay, submit). Per-draw uniform data is
//! packed into one dynamic-offset uniform buffer that grows on demand.
//!
//! Surface presentation is an external collaborator — the core's `present`
//! maps to `end_frame`, after which the color target holds the finished
//! frame for whatever output path the host attaches.

use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::errors::{Result, VesperError};
use crate::graphics::GraphicsSettings;
use crate::resources::shader::ShaderStage;
use crate::resources::vertex::Vertex;

use super::{
    BufferDescriptor, BufferId, BufferUsage, DrawCall, DrawUniforms, GraphicsBackend,
    ProgramDescriptor, ProgramId,
};

/// Byte stride between per-draw uniform blocks. Matches the conservative
/// `min_uniform_buffer_offset_alignment` so dynamic offsets are always valid.
const UNIFORM_STRIDE: u64 = 256;

/// Uniform arena capacity to start with, in draws.
const INITIAL_DRAW_CAPACITY: u64 = 64;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    label: String,
}

/// Draws recorded since `begin_frame`.
struct PendingFrame {
    clear_color: [f32; 4],
    draws: Vec<DrawCall>,
}

/// Dynamic-offset uniform arena shared by every draw in a frame.
struct UniformArena {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Capacity in draws.
    capacity: u64,
}

struct BackendState {
    buffers: SlotMap<BufferId, GpuBuffer>,
    programs: SlotMap<ProgramId, GpuProgram>,
    frame: Option<PendingFrame>,
    uniforms: UniformArena,
}

/// Headless wgpu rendering backend.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    bind_group_layout: wgpu::BindGroupLayout,
    state: Mutex<BackendState>,
}

impl WgpuBackend {
    /// Acquires an adapter and device and builds the offscreen frame target.
    pub fn new(settings: &GraphicsSettings) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: settings.backends.unwrap_or(wgpu::Backends::all()),
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: settings.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| VesperError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: settings.required_features,
            required_limits: settings.required_limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))?;

        log::info!(
            "wgpu backend ready: {} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let color_view = Self::create_target_texture(
            &device,
            settings.width,
            settings.height,
            settings.color_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            Some("Frame Color Target"),
        );
        let depth_view = Self::create_target_texture(
            &device,
            settings.width,
            settings.height,
            settings.depth_format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            Some("Depth Texture"),
        );

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw Uniforms Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<DrawUniforms>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let uniforms =
            Self::create_uniform_arena(&device, &bind_group_layout, INITIAL_DRAW_CAPACITY);

        Ok(Self {
            device,
            queue,
            color_view,
            depth_view,
            color_format: settings.color_format,
            depth_format: settings.depth_format,
            bind_group_layout,
            state: Mutex::new(BackendState {
                buffers: SlotMap::with_key(),
                programs: SlotMap::with_key(),
                frame: None,
                uniforms,
            }),
        })
    }

    fn create_target_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: Option<&str>,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_uniform_arena(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u64,
    ) -> UniformArena {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: capacity * UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniforms BindGroup"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });
        UniformArena {
            buffer,
            bind_group,
            capacity,
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId> {
        let usage = match descriptor.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label,
            size: descriptor.size,
            usage,
            mapped_at_creation: false,
        });

        let mut state = self.state.lock();
        Ok(state.buffers.insert(GpuBuffer {
            buffer,
            size: descriptor.size,
        }))
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let state = self.state.lock();
        let gpu_buffer = state
            .buffers
            .get(id)
            .ok_or_else(|| VesperError::BackendError("write to a destroyed buffer".to_string()))?;
        if offset + data.len() as u64 > gpu_buffer.size {
            return Err(VesperError::BackendError(format!(
                "write of {} bytes at offset {offset} exceeds allocation of {} bytes",
                data.len(),
                gpu_buffer.size
            )));
        }
        self.queue.write_buffer(&gpu_buffer.buffer, offset, data);
        Ok(())
    }

    fn destroy_buffer(&self, id: BufferId) {
        let mut state = self.state.lock();
        if let Some(gpu_buffer) = state.buffers.remove(id) {
            gpu_buffer.buffer.destroy();
        }
    }

    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId> {
        // Stage sources were validated by the front end; everything the
        // device still rejects here counts as a link failure.
        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vs_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Vertex Shader"),
                source: wgpu::ShaderSource::Wgsl(descriptor.vertex_source.into()),
            });
        let fs_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Fragment Shader"),
                source: wgpu::ShaderSource::Wgsl(descriptor.fragment_source.into()),
            });

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Program Pipeline Layout"),
                bind_group_layouts: &[Some(&self.bind_group_layout)],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: descriptor.label,
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vs_module,
                    entry_point: None,
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs_module,
                    entry_point: None,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: self.depth_format,
                    depth_write_enabled: Some(true),
                    depth_compare: Some(wgpu::CompareFunction::Less),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(error_scope.pop()) {
            return Err(VesperError::CompileError {
                stage: ShaderStage::Link,
                log: error.to_string(),
            });
        }

        let mut state = self.state.lock();
        Ok(state.programs.insert(GpuProgram {
            pipeline,
            label: descriptor.label.unwrap_or("Program").to_string(),
        }))
    }

    fn destroy_program(&self, id: ProgramId) {
        let mut state = self.state.lock();
        state.programs.remove(id);
    }

    fn begin_frame(&self, clear_color: [f32; 4]) {
        let mut state = self.state.lock();
        if let Some(frame) = &state.frame {
            log::debug!("begin_frame discarded {} recorded draws", frame.draws.len());
        }
        state.frame = Some(PendingFrame {
            clear_color,
            draws: Vec::new(),
        });
    }

    fn draw(&self, call: &DrawCall) -> Result<()> {
        let mut state = self.state.lock();

        if !state.programs.contains_key(call.program) {
            return Err(VesperError::BackendError(
                "draw references a destroyed program".to_string(),
            ));
        }
        if !state.buffers.contains_key(call.vertex_buffer) {
            return Err(VesperError::BackendError(
                "draw references a destroyed vertex buffer".to_string(),
            ));
        }
        if let Some((index_buffer, _)) = call.index_buffer {
            if !state.buffers.contains_key(index_buffer) {
                return Err(VesperError::BackendError(
                    "draw references a destroyed index buffer".to_string(),
                ));
            }
        }

        let frame = state.frame.as_mut().ok_or_else(|| {
            VesperError::ProtocolViolation("draw recorded with no open frame".to_string())
        })?;
        frame.draws.push(*call);
        Ok(())
    }

    fn end_frame(&self) -> Result<()> {
        let mut state = self.state.lock();
        let frame = state.frame.take().ok_or_else(|| {
            VesperError::ProtocolViolation("frame submitted with no open frame".to_string())
        })?;

        // Grow the uniform arena before any borrows for the pass are taken.
        let needed = frame.draws.len() as u64;
        if needed > state.uniforms.capacity {
            let capacity = needed.next_power_of_two();
            log::debug!(
                "Growing draw uniform arena from {} to {capacity} draws",
                state.uniforms.capacity
            );
            state.uniforms =
                Self::create_uniform_arena(&self.device, &self.bind_group_layout, capacity);
        }
        for (i, call) in frame.draws.iter().enumerate() {
            self.queue.write_buffer(
                &state.uniforms.buffer,
                i as u64 * UNIFORM_STRIDE,
                bytemuck::bytes_of(&call.uniforms),
            );
        }

        let [r, g, b, a] = frame.clear_color;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
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
                multiview_mask: None,
            });

            for (i, call) in frame.draws.iter().enumerate() {
                // Handles were checked at record time; a resource dropped
                // between record and submit skips its draw.
                let (Some(program), Some(vertex_buffer)) = (
                    state.programs.get(call.program),
                    state.buffers.get(call.vertex_buffer),
                ) else {
                    log::error!("Skipping draw whose resources were destroyed mid-frame");
                    continue;
                };

                pass.set_pipeline(&program.pipeline);
                pass.set_bind_group(
                    0,
                    &state.uniforms.bind_group,
                    &[(i as u64 * UNIFORM_STRIDE) as u32],
                );
                pass.set_vertex_buffer(0, vertex_buffer.buffer.slice(..));

                match call.index_buffer {
                    Some((index_id, index_count)) => {
                        let Some(index_buffer) = state.buffers.get(index_id) else {
                            log::error!(
                                "Skipping indexed draw for program {:?}: index buffer destroyed",
                                program.label
                            );
                            continue;
                        };
                        pass.set_index_buffer(
                            index_buffer.buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        pass.draw_indexed(0..index_count, 0, 0..1);
                    }
                    None => {
                        pass.draw(0..call.vertex_count, 0..1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("Submitted frame with {} draws", frame.draws.len());
        Ok(())
    }
}
