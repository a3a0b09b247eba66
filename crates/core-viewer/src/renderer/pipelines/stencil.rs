//! Offscreen picking. Every tile is drawn in its own flat colour and the
//! texel under the cursor is read back and decoded to a tile index.

use super::{frame_shader, representation::ShapeMesh, vec2_layout};
use crate::error::{Result, ViewerError};
use crate::renderer::context::read_texture_rgba8;
use coremap::{
    pick::{vertex_colors, MAX_PICKABLE_TILES},
    PickTable, Shape,
};
use wgpu::util::DeviceExt;

pub const PICK_FMT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

static CODE_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Unorm8x4];

/// Decides when a pick pass is worth running.
///
/// Picking is skipped while the shape transition is in flight, and when the
/// cursor has not moved and nothing under it changed since the last pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickThrottle {
    last_cursor: Option<(u32, u32)>,
    stale: bool,
}

impl PickThrottle {
    /// Forces the next settled frame to pick, e.g. after the camera or the
    /// geometry moved under a still cursor.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn should_pick(&mut self, cursor: Option<(u32, u32)>, shape_t: f32) -> bool {
        if shape_t > 0.0 && shape_t < 1.0 {
            return false;
        }
        let Some(cursor) = cursor else {
            return false;
        };
        if self.last_cursor == Some(cursor) && !self.stale {
            return false;
        }
        self.last_cursor = Some(cursor);
        self.stale = false;
        true
    }
}

pub struct StencilRenderer {
    pipeline: wgpu::RenderPipeline,
    codes: wgpu::Buffer,
    table: PickTable,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    size: (u32, u32),
}

impl StencilRenderer {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        num_tiles: usize,
        downscaled: &ShapeMesh,
        size: (u32, u32),
    ) -> Result<Self> {
        if num_tiles > MAX_PICKABLE_TILES {
            return Err(ViewerError::TooManyTiles {
                tiles: num_tiles,
                max: MAX_PICKABLE_TILES,
            });
        }

        let shader = frame_shader(
            device,
            "shaders/pick.wgsl",
            include_str!("../../../shaders/pick.wgsl"),
        )?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pick Pipeline Layout"),
            bind_group_layouts: &[frame_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Pick Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[
                    vec2_layout(0, wgpu::VertexStepMode::Vertex),
                    vec2_layout(1, wgpu::VertexStepMode::Vertex),
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[u8; 4]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &CODE_ATTRS,
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: PICK_FMT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let per_tile = if num_tiles == 0 { 0 } else { downscaled.vertex_count() / num_tiles };
        let colors = vertex_colors(num_tiles, per_tile);
        let codes = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pick Code VB"),
            contents: if colors.is_empty() { &[0u8; 16][..] } else { bytemuck::cast_slice(&colors) },
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (target, target_view) = Self::create_target(device, size);

        Ok(Self {
            pipeline,
            codes,
            table: PickTable::new(num_tiles),
            target,
            target_view,
            size,
        })
    }

    fn create_target(
        device: &wgpu::Device,
        (width, height): (u32, u32),
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_FMT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Follows the surface size so read-back coordinates are cursor pixels.
    pub fn resize(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        if size == self.size || size.0 == 0 || size.1 == 0 {
            return;
        }
        self.target.destroy();
        let (target, target_view) = Self::create_target(device, size);
        self.target = target;
        self.target_view = target_view;
        self.size = size;
    }

    /// Renders the pick target and returns the tile under `(x, y)`, if any.
    pub fn pick(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &wgpu::BindGroup,
        downscaled: &ShapeMesh,
        (x, y): (u32, u32),
    ) -> Result<Option<usize>> {
        if x >= self.size.0 || y >= self.size.1 {
            return Ok(None);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pick Encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let n = downscaled.vertex_count() as u32;
            if n > 0 {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, frame, &[]);
                rpass.set_vertex_buffer(0, downscaled.stream(Shape::Column).slice());
                rpass.set_vertex_buffer(1, downscaled.stream(Shape::Spiral).slice());
                rpass.set_vertex_buffer(2, self.codes.slice(..));
                rpass.draw(0..n, 0..1);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));

        let texel = read_texture_rgba8(device, queue, &self.target, (x, y), (1, 1))?;
        let rgba = [texel[0], texel[1], texel[2], texel[3]];
        Ok(self.table.decode(rgba))
    }

    pub fn destroy(&self) {
        self.codes.destroy();
        self.target.destroy();
    }
}
