//! Representation renderers: the downscaled triangle mesh and the punchcard
//! samples. Each binds its blender's output texture read-only at group 1.

use super::{frame_shader, vec2_layout, QUAD_CORNERS};
use crate::error::Result;
use crate::renderer::context::VertexStream;
use coremap::{Shape, ShapePair};
use wgpu::util::DeviceExt;

/// Column and spiral copies of one position stream.
pub struct ShapeMesh {
    streams: ShapePair<VertexStream>,
}

impl ShapeMesh {
    pub fn new(
        device: &wgpu::Device,
        labels: (&'static str, &'static str),
        positions: ShapePair<&[f32]>,
        extra_usage: wgpu::BufferUsages,
    ) -> Self {
        let stream = |label, data: &[f32]| {
            VertexStream::with_usage(
                device,
                label,
                bytemuck::cast_slice(data),
                data.len() / 2,
                2,
                extra_usage,
            )
        };
        Self {
            streams: ShapePair::new(
                stream(labels.0, positions.column),
                stream(labels.1, positions.spiral),
            ),
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, shape: Shape, data: &[f32]) -> Result<()> {
        self.streams.get(shape).write(queue, data)
    }

    pub fn stream(&self, shape: Shape) -> &VertexStream {
        self.streams.get(shape)
    }

    pub fn vertex_count(&self) -> usize {
        self.streams.column.vertex_count()
    }

    pub fn destroy(&self) {
        self.streams.column.destroy();
        self.streams.spiral.destroy();
    }
}

fn blend_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Blend Texture Layout"),
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
    })
}

fn blend_texture_bind(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    filter: wgpu::FilterMode,
) -> wgpu::BindGroup {
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Blend Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Blend Texture Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

#[allow(clippy::too_many_arguments)]
fn textured_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    frame_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
    buffers: &[wgpu::VertexBufferLayout],
    topology: wgpu::PrimitiveTopology,
    color_fmt: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[frame_layout, texture_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology,
            ..Default::default()
        },
        depth_stencil: None,
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: color_fmt,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

/// Downscaled tiles as `ROWS_PER_TILE` textured row quads each.
pub struct DownscaledRenderer {
    pipeline: wgpu::RenderPipeline,
    mesh: ShapeMesh,
    tex_coords: VertexStream,
    texture_bind: wgpu::BindGroup,
}

impl DownscaledRenderer {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        blend_view: &wgpu::TextureView,
        positions: &ShapePair<Vec<f32>>,
        tex_coords: &[f32],
    ) -> Result<Self> {
        let shader = frame_shader(
            device,
            "shaders/downscaled.wgsl",
            include_str!("../../../shaders/downscaled.wgsl"),
        )?;
        let texture_layout = blend_texture_layout(device);
        let pipeline = textured_pipeline(
            device,
            "Downscaled Pipeline",
            &shader,
            frame_layout,
            &texture_layout,
            &[
                vec2_layout(0, wgpu::VertexStepMode::Vertex),
                vec2_layout(1, wgpu::VertexStepMode::Vertex),
                vec2_layout(2, wgpu::VertexStepMode::Vertex),
            ],
            wgpu::PrimitiveTopology::TriangleList,
            color_fmt,
        );

        // Highlight and picking read these, so they are copy sources too.
        let mesh = ShapeMesh::new(
            device,
            ("Downscaled Column VB", "Downscaled Spiral VB"),
            ShapePair::new(&positions.column[..], &positions.spiral[..]),
            wgpu::BufferUsages::COPY_SRC,
        );
        let tex_coords = VertexStream::from_f32(device, "Downscaled UV VB", tex_coords, 2);
        let texture_bind = blend_texture_bind(device, &texture_layout, blend_view, wgpu::FilterMode::Linear);

        Ok(Self {
            pipeline,
            mesh,
            tex_coords,
            texture_bind,
        })
    }

    pub fn upload_positions(
        &self,
        queue: &wgpu::Queue,
        positions: &ShapePair<Vec<f32>>,
    ) -> Result<()> {
        self.mesh.write(queue, Shape::Column, &positions.column)?;
        self.mesh.write(queue, Shape::Spiral, &positions.spiral)
    }

    pub fn upload_tex_coords(&self, queue: &wgpu::Queue, tex_coords: &[f32]) -> Result<()> {
        self.tex_coords.write(queue, tex_coords)
    }

    pub fn mesh(&self) -> &ShapeMesh {
        &self.mesh
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame: &'a wgpu::BindGroup) {
        let n = self.mesh.vertex_count() as u32;
        if n == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame, &[]);
        rpass.set_bind_group(1, &self.texture_bind, &[]);
        rpass.set_vertex_buffer(0, self.mesh.stream(Shape::Column).slice());
        rpass.set_vertex_buffer(1, self.mesh.stream(Shape::Spiral).slice());
        rpass.set_vertex_buffer(2, self.tex_coords.slice());
        rpass.draw(0..n, 0..1);
    }

    pub fn destroy(&self) {
        self.mesh.destroy();
        self.tex_coords.destroy();
    }
}

/// Punchcard samples, one instanced quad each.
pub struct PunchcardRenderer {
    pipeline: wgpu::RenderPipeline,
    quad_vb: wgpu::Buffer,
    mesh: ShapeMesh,
    tex_coords: VertexStream,
    texture_bind: wgpu::BindGroup,
}

impl PunchcardRenderer {
    /// Shapes without positions yet start zeroed; `upload_positions` fills
    /// them once they are needed.
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        blend_view: &wgpu::TextureView,
        positions: &ShapePair<Option<Vec<f32>>>,
        tex_coords: &[f32],
    ) -> Result<Self> {
        let shader = frame_shader(
            device,
            "shaders/punchcard.wgsl",
            include_str!("../../../shaders/punchcard.wgsl"),
        )?;
        let texture_layout = blend_texture_layout(device);
        let pipeline = textured_pipeline(
            device,
            "Punchcard Pipeline",
            &shader,
            frame_layout,
            &texture_layout,
            &[
                vec2_layout(0, wgpu::VertexStepMode::Vertex),
                vec2_layout(1, wgpu::VertexStepMode::Instance),
                vec2_layout(2, wgpu::VertexStepMode::Instance),
                vec2_layout(3, wgpu::VertexStepMode::Instance),
            ],
            wgpu::PrimitiveTopology::TriangleList,
            color_fmt,
        );

        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Punchcard Quad VB"),
            contents: bytemuck::cast_slice(&QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let zeros = vec![0.0f32; tex_coords.len()];
        let mesh = ShapeMesh::new(
            device,
            ("Punchcard Column VB", "Punchcard Spiral VB"),
            ShapePair::new(
                positions.column.as_deref().unwrap_or(&zeros),
                positions.spiral.as_deref().unwrap_or(&zeros),
            ),
            wgpu::BufferUsages::empty(),
        );
        let tex_coords = VertexStream::from_f32(device, "Punchcard UV VB", tex_coords, 2);
        let texture_bind = blend_texture_bind(device, &texture_layout, blend_view, wgpu::FilterMode::Nearest);

        Ok(Self {
            pipeline,
            quad_vb,
            mesh,
            tex_coords,
            texture_bind,
        })
    }

    /// Writes the shapes that were generated; returns which ones.
    pub fn upload_positions(
        &self,
        queue: &wgpu::Queue,
        positions: &ShapePair<Option<Vec<f32>>>,
    ) -> Result<ShapePair<bool>> {
        let mut written = ShapePair::new(false, false);
        for shape in [Shape::Column, Shape::Spiral] {
            if let Some(data) = positions.get(shape) {
                self.mesh.write(queue, shape, data)?;
                *written.get_mut(shape) = true;
            }
        }
        Ok(written)
    }

    pub fn upload_tex_coords(&self, queue: &wgpu::Queue, tex_coords: &[f32]) -> Result<()> {
        self.tex_coords.write(queue, tex_coords)
    }

    pub fn num_samples(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame: &'a wgpu::BindGroup) {
        let n = self.mesh.vertex_count() as u32;
        if n == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame, &[]);
        rpass.set_bind_group(1, &self.texture_bind, &[]);
        rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
        rpass.set_vertex_buffer(1, self.mesh.stream(Shape::Column).slice());
        rpass.set_vertex_buffer(2, self.mesh.stream(Shape::Spiral).slice());
        rpass.set_vertex_buffer(3, self.tex_coords.slice());
        rpass.draw(0..QUAD_CORNERS.len() as u32, 0..n);
    }

    pub fn destroy(&self) {
        self.quad_vb.destroy();
        self.mesh.destroy();
        self.tex_coords.destroy();
    }
}
