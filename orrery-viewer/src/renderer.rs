/// wgpu renderer drawing one shared textured mesh many times per frame
use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use orrery_core::geometry::{UV_OFFSET, VERTEX_STRIDE_BYTES};
use orrery_core::{Mat4, Renderer, VertexStream};
use std::num::NonZeroU64;
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MATRIX_SIZE: u64 = std::mem::size_of::<[f32; 16]>() as u64;

/// Position at location 0, texture coordinates at location 1.
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: (UV_OFFSET * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
        shader_location: 1,
    },
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("shader pipeline rejected: {0}")]
    Pipeline(String),
    #[error("texture has no image data")]
    MissingTexture,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view: [f32; 16],
    proj: [f32; 16],
}

impl CameraUniform {
    fn new(view: &Mat4, projection: &Mat4) -> Self {
        Self {
            view: view.to_cols_array(),
            proj: projection.to_cols_array(),
        }
    }
}

/// Model matrices packed at `stride` so each draw binds its own slot.
struct ModelUniforms {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl ModelUniforms {
    fn new(device: &wgpu::Device, layout: wgpu::BindGroupLayout, capacity: usize) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = aligned_stride(MATRIX_SIZE, align);
        let (buffer, bind_group) = Self::allocate(device, &layout, stride, capacity);
        Self {
            layout,
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("model uniforms"),
            size: stride * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(MATRIX_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Grow the buffer when the scene has more bodies than slots.
    fn reserve(&mut self, device: &wgpu::Device, count: usize) {
        if count <= self.capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("growing model uniforms from {} to {capacity}", self.capacity);
        self.buffer.destroy();
        let (buffer, bind_group) = Self::allocate(device, &self.layout, self.stride, capacity);
        self.buffer = buffer;
        self.bind_group = bind_group;
        self.capacity = capacity;
    }
}

struct Pipeline {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    models: ModelUniforms,
    texture_layout: wgpu::BindGroupLayout,
}

struct GpuMesh {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Everything acquired at startup, in acquisition order.
struct Resources {
    pipeline: Pipeline,
    mesh: GpuMesh,
    texture: GpuTexture,
}

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
    resources: Option<Resources>,
    camera: CameraUniform,
    models: Vec<Mat4>,
}

impl GpuRenderer {
    /// Open the GPU, build the pipeline, then upload the mesh and texture.
    ///
    /// `texture` is a mip chain, base level first. `bodies` sizes the per-draw
    /// uniform buffer.
    pub async fn new(
        window: Arc<Window>,
        mesh: &VertexStream,
        texture: &[RgbaImage],
        bodies: usize,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("orrery device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth = create_depth_view(&device, &config);

        let pipeline = create_pipeline(&device, format, bodies).await?;
        let mesh = upload_mesh(&device, mesh);
        let texture = upload_texture(&device, &queue, &pipeline.texture_layout, texture)?;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            resources: Some(Resources {
                pipeline,
                mesh,
                texture,
            }),
            camera: CameraUniform::new(&Mat4::identity(), &Mat4::identity()),
            models: Vec::with_capacity(bodies),
        })
    }
}

impl Renderer for GpuRenderer {
    type Error = RenderError;

    fn resize(&mut self, width: u32, height: u32) {
        // a minimised window keeps its old swapchain
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = create_depth_view(&self.device, &self.config);
    }

    fn begin_frame(&mut self, view: &Mat4, projection: &Mat4) {
        self.camera = CameraUniform::new(view, projection);
        self.models.clear();
    }

    fn draw(&mut self, model: &Mat4) {
        self.models.push(*model);
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let Some(resources) = self.resources.as_mut() else {
            return Ok(());
        };

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let uniforms = &mut resources.pipeline.models;
        uniforms.reserve(&self.device, self.models.len());
        self.queue.write_buffer(
            &resources.pipeline.camera_buffer,
            0,
            bytemuck::bytes_of(&self.camera),
        );
        let stride = uniforms.stride as usize;
        let mut packed = vec![0u8; self.models.len() * stride];
        for (slot, model) in packed.chunks_exact_mut(stride).zip(&self.models) {
            slot[..MATRIX_SIZE as usize].copy_from_slice(bytemuck::cast_slice(model.as_slice()));
        }
        if !packed.is_empty() {
            self.queue.write_buffer(&uniforms.buffer, 0, &packed);
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&resources.pipeline.pipeline);
            pass.set_bind_group(0, &resources.pipeline.camera_bind_group, &[]);
            pass.set_bind_group(2, &resources.texture.bind_group, &[]);
            pass.set_vertex_buffer(0, resources.mesh.buffer.slice(..));
            for i in 0..self.models.len() {
                let offset = (i * stride) as wgpu::DynamicOffset;
                pass.set_bind_group(1, &resources.pipeline.models.bind_group, &[offset]);
                pass.draw(0..resources.mesh.vertex_count, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn release(&mut self) {
        let Some(Resources {
            pipeline,
            mesh,
            texture,
        }) = self.resources.take()
        else {
            return;
        };
        // reverse of acquisition
        texture.texture.destroy();
        drop(texture);
        mesh.buffer.destroy();
        drop(mesh);
        pipeline.models.buffer.destroy();
        pipeline.camera_buffer.destroy();
        drop(pipeline);
        log::info!("GPU resources released");
    }
}

/// Round `size` up to a multiple of `align`.
fn aligned_stride(size: u64, align: u64) -> u64 {
    let align = align.max(1);
    size.div_ceil(align) * align
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
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

fn uniform_layout_entry(dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: if dynamic {
                NonZeroU64::new(MATRIX_SIZE)
            } else {
                None
            },
        },
        count: None,
    }
}

/// Build the render pipeline and its uniform buffers.
///
/// Shader or pipeline validation errors are fatal: the caller never gets a
/// pipeline that would draw nothing.
async fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bodies: usize,
) -> Result<Pipeline, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::include_wgsl!("shader.wgsl"));
    let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera layout"),
        entries: &[uniform_layout_entry(false)],
    });
    let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("model layout"),
        entries: &[uniform_layout_entry(true)],
    });
    let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture layout"),
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

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("mesh pipeline layout"),
        bind_group_layouts: &[&camera_layout, &model_layout, &texture_layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mesh pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: VERTEX_STRIDE_BYTES as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
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
    });

    if let Some(error) = device.pop_error_scope().await {
        log::error!("shader pipeline rejected:\n{error}");
        return Err(RenderError::Pipeline(error.to_string()));
    }

    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera uniforms"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera bind group"),
        layout: &camera_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: camera_buffer.as_entire_binding(),
        }],
    });
    let models = ModelUniforms::new(device, model_layout, bodies);
    log::info!("shader pipeline ready");

    Ok(Pipeline {
        pipeline,
        camera_buffer,
        camera_bind_group,
        models,
        texture_layout,
    })
}

fn upload_mesh(device: &wgpu::Device, stream: &VertexStream) -> GpuMesh {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh vertices"),
        contents: bytemuck::cast_slice(stream.as_slice()),
        usage: wgpu::BufferUsages::VERTEX,
    });
    log::info!("mesh uploaded: {} vertices", stream.vertex_count());
    GpuMesh {
        buffer,
        vertex_count: stream.vertex_count() as u32,
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    levels: &[RgbaImage],
) -> Result<GpuTexture, RenderError> {
    let base = levels.first().ok_or(RenderError::MissingTexture)?;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("diffuse texture"),
        size: wgpu::Extent3d {
            width: base.width(),
            height: base.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: levels.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (level, image) in levels.iter().enumerate() {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("diffuse sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("texture bind group"),
        layout,
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

    Ok(GpuTexture {
        texture,
        bind_group,
    })
}
