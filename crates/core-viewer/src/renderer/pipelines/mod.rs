//! Render pipelines owned by the core renderer.

pub mod accents;
pub mod blender;
pub mod highlight;
pub mod representation;
pub mod stencil;

use crate::error::Result;
use crate::renderer::context::create_shader_checked;
use crate::renderer::frame::FRAME_WGSL;

/// Full-screen triangle vertices
pub(crate) const FS_TRI: [[f32; 2]; 3] = [
    [-1.0, -1.0],
    [3.0, -1.0],
    [-1.0, 3.0],
];

/// Two triangles covering `[-1, 1]²`, used as the per-instance sprite quad.
pub(crate) const QUAD_CORNERS: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, -1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
];

static VEC2_ATTRS: [[wgpu::VertexAttribute; 1]; 4] = [
    wgpu::vertex_attr_array![0 => Float32x2],
    wgpu::vertex_attr_array![1 => Float32x2],
    wgpu::vertex_attr_array![2 => Float32x2],
    wgpu::vertex_attr_array![3 => Float32x2],
];

/// Layout for a tightly packed `vec2<f32>` stream bound at `location`.
pub(crate) fn vec2_layout(
    location: usize,
    step_mode: wgpu::VertexStepMode,
) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
        step_mode,
        attributes: &VEC2_ATTRS[location],
    }
}

/// Compiles a static shader body with the shared `Frame` block prepended.
pub(crate) fn frame_shader(
    device: &wgpu::Device,
    label: &str,
    body: &str,
) -> Result<wgpu::ShaderModule> {
    create_shader_checked(device, label, &format!("{FRAME_WGSL}\n{body}"))
}

/// Alpha-blended colour target for the overlay passes.
pub(crate) fn alpha_target(format: wgpu::TextureFormat) -> [Option<wgpu::ColorTargetState>; 1] {
    [Some(wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        write_mask: wgpu::ColorWrites::ALL,
    })]
}
