//! Hover highlight: the hovered tile's slice of the downscaled mesh, copied
//! into small buffers of its own and redrawn with a cursor-centred glow.

use super::{alpha_target, frame_shader, representation::ShapeMesh, vec2_layout};
use crate::error::Result;
use coremap::{layout::tile_vertex_ranges, Shape, ShapePair};
use std::ops::Range;

const BYTES_PER_VERTEX: u64 = std::mem::size_of::<[f32; 2]>() as u64;

pub struct HighlightRenderer {
    pipeline: wgpu::RenderPipeline,
    /// Vertex range of every tile in the downscaled stream.
    ranges: Vec<Range<usize>>,
    buffers: ShapePair<wgpu::Buffer>,
    hovered: Option<usize>,
}

impl HighlightRenderer {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        color_fmt: wgpu::TextureFormat,
        num_tiles: usize,
        downscaled: &ShapeMesh,
    ) -> Result<Self> {
        let shader = frame_shader(
            device,
            "shaders/highlight.wgsl",
            include_str!("../../../shaders/highlight.wgsl"),
        )?;

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Highlight Pipeline Layout"),
            bind_group_layouts: &[frame_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Highlight Pipeline"),
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
            primitive: wgpu::PrimitiveState::default(),
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

        let ranges = tile_vertex_ranges(num_tiles, downscaled.vertex_count());
        let per_tile = ranges.first().map_or(0, |r| r.len()) as u64;
        let buffer = |label: &'static str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: (per_tile * BYTES_PER_VERTEX).max(16),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        Ok(Self {
            pipeline,
            ranges,
            buffers: ShapePair::new(buffer("Highlight Column VB"), buffer("Highlight Spiral VB")),
            hovered: None,
        })
    }

    /// Switches the highlighted tile; copies its slice when it changed.
    pub fn set_hovered(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        source: &ShapeMesh,
        index: Option<usize>,
    ) {
        let index = index.filter(|&i| i < self.ranges.len());
        if index == self.hovered {
            return;
        }
        self.hovered = index;
        self.refresh(encoder, source);
    }

    /// Re-copies the current slice, e.g. after the source positions changed.
    pub fn refresh(&self, encoder: &mut wgpu::CommandEncoder, source: &ShapeMesh) {
        let Some(range) = self.hovered.and_then(|i| self.ranges.get(i)) else {
            return;
        };
        let offset = range.start as u64 * BYTES_PER_VERTEX;
        let size = range.len() as u64 * BYTES_PER_VERTEX;
        if size == 0 {
            return;
        }
        for shape in [Shape::Column, Shape::Spiral] {
            encoder.copy_buffer_to_buffer(
                source.stream(shape).buffer(),
                offset,
                self.buffers.get(shape),
                0,
                size,
            );
        }
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame: &'a wgpu::BindGroup) {
        let Some(range) = self.hovered.and_then(|i| self.ranges.get(i)) else {
            return;
        };
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame, &[]);
        rpass.set_vertex_buffer(0, self.buffers.column.slice(..));
        rpass.set_vertex_buffer(1, self.buffers.spiral.slice(..));
        rpass.draw(0..range.len() as u32, 0..1);
    }

    pub fn destroy(&self) {
        self.buffers.column.destroy();
        self.buffers.spiral.destroy();
    }
}
