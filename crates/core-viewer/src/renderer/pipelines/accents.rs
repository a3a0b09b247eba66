use super::{alpha_target, frame_shader, representation::ShapeMesh, vec2_layout};
use crate::error::Result;
use coremap::{Shape, ShapePair};

/// Tile outlines drawn over the representation as a single triangle strip.
pub struct AccentRenderer {
    pipeline: wgpu::RenderPipeline,
    mesh: ShapeMesh,
}

impl AccentRenderer {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        positions: &ShapePair<Vec<f32>>,
    ) -> Result<Self> {
        let shader = frame_shader(
            device,
            "shaders/accents.wgsl",
            include_str!("../../../shaders/accents.wgsl"),
        )?;

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Accent Pipeline Layout"),
            bind_group_layouts: &[frame_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Accent Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[
                    vec2_layout(0, wgpu::VertexStepMode::Vertex),
                    vec2_layout(1, wgpu::VertexStepMode::Vertex),
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &alpha_target(color_fmt),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let mesh = ShapeMesh::new(
            device,
            ("Accent Column VB", "Accent Spiral VB"),
            ShapePair::new(&positions.column[..], &positions.spiral[..]),
            wgpu::BufferUsages::empty(),
        );

        Ok(Self { pipeline, mesh })
    }

    pub fn upload_positions(
        &self,
        queue: &wgpu::Queue,
        positions: &ShapePair<Vec<f32>>,
    ) -> Result<()> {
        self.mesh.write(queue, Shape::Column, &positions.column)?;
        self.mesh.write(queue, Shape::Spiral, &positions.spiral)
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame: &'a wgpu::BindGroup) {
        let n = self.mesh.vertex_count() as u32;
        if n == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame, &[]);
        rpass.set_vertex_buffer(0, self.mesh.stream(Shape::Column).slice());
        rpass.set_vertex_buffer(1, self.mesh.stream(Shape::Spiral).slice());
        rpass.draw(0..n, 0..1);
    }

    pub fn destroy(&self) {
        self.mesh.destroy();
    }
}
