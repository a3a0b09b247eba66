//! Per-frame uniform shared read-only by every pipeline at group 0.

use glam::Mat4;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],  // 64 B
    pub viewport_size: [f32; 2],   // +8
    /// Eased column -> spiral blend factor.
    pub shape_t: f32,              // +4
    pub point_size_px: f32,        // +4  -> 80
    pub cursor_world: [f32; 2],    // +8
    pub glow_radius: f32,          // +4
    pub _pad0: f32,                // +4  -> 96
    pub accent_color: [f32; 4],    // +16 -> 112
}

// Compile‑time safety check: buffer size must match the WGSL struct.
const _: [(); 112] = [(); core::mem::size_of::<FrameUniform>()];

impl Default for FrameUniform {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            viewport_size: [1.0, 1.0],
            shape_t: 0.0,
            point_size_px: 2.0,
            cursor_world: [0.0, 0.0],
            glow_radius: 3.0,
            _pad0: 0.0,
            accent_color: [1.0, 1.0, 1.0, 0.35],
        }
    }
}

/// WGSL declaration matching `FrameUniform`, prepended to every shader.
pub const FRAME_WGSL: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    viewport_size: vec2<f32>,
    shape_t: f32,
    point_size_px: f32,
    cursor_world: vec2<f32>,
    glow_radius: f32,
    _pad0: f32,
    accent_color: vec4<f32>,
};
@group(0) @binding(0) var<uniform> F: Frame;

fn shape_position(column: vec2<f32>, spiral: vec2<f32>) -> vec4<f32> {
    return F.view_proj * vec4<f32>(mix(column, spiral, F.shape_t), 0.0, 1.0);
}
"#;

pub struct FrameBindings {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    buffer: wgpu::Buffer,
}

impl FrameBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label:              Some("Frame Uniform Buffer"),
            size:               std::mem::size_of::<FrameUniform>() as u64,
            usage:              wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label:   Some("Frame BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding:    0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty:                 wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size:   wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label:   Some("Frame Bind Group"),
            layout:  &layout,
            entries: &[wgpu::BindGroupEntry {
                binding:  0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self { layout, bind_group, buffer }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &FrameUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}
