//! Mineral Blender: N single-channel abundance textures composited into one
//! RGBA texture by an offscreen pass.
//!
//! The channel count is baked into the generated WGSL, one texture binding and
//! one unrolled block per channel, so a blender is built for a fixed mineral
//! set. A different set needs a new blender.

use super::FS_TRI;
use crate::data::types::MineralChannel;
use crate::error::{Result, ViewerError};
use crate::renderer::context::create_shader_checked;
use coremap::{BlendMode, BlendParams};
use wgpu::util::DeviceExt;

pub const OUTPUT_FMT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlendTail {
    saturation: f32,
    threshold: f32,
    mode: u32,
    _pad: u32,
}

/// Uniform bytes: one `vec4(rgb, magnitude)` per channel, then the globals.
pub fn blend_uniform_bytes(
    channels: &[([f32; 3], f32)],
    threshold: f32,
    saturation: f32,
    mode: BlendMode,
) -> Vec<u8> {
    let packed: Vec<[f32; 4]> = channels
        .iter()
        .map(|(c, magnitude)| [c[0], c[1], c[2], *magnitude])
        .collect();
    let tail = BlendTail {
        saturation,
        threshold,
        mode: match mode {
            BlendMode::Additive => 0,
            BlendMode::Maximum => 1,
        },
        _pad: 0,
    };

    let mut bytes = bytemuck::cast_slice::<[f32; 4], u8>(&packed).to_vec();
    bytes.extend_from_slice(bytemuck::bytes_of(&tail));
    bytes
}

/// Fragment/vertex source specialised for `n` channels.
pub fn blend_shader_source(n: usize) -> String {
    let mut s = format!(
        "struct BlendUniforms {{\n    channels: array<vec4<f32>, {n}>,\n    saturation: f32,\n    threshold: f32,\n    mode: u32,\n    _pad: u32,\n}};\n"
    );
    s.push_str("@group(0) @binding(0) var<uniform> U: BlendUniforms;\n");
    for i in 0..n {
        s.push_str(&format!(
            "@group(0) @binding({}) var abundance{i}: texture_2d<f32>;\n",
            i + 1
        ));
    }

    s.push_str(
        r#"
@vertex
fn vs_main(@location(0) pos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(pos, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let texel = vec2<i32>(floor(frag.xy));
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            "    let v{i} = U.channels[{i}].w * smoothstep(U.threshold, 1.0, textureLoad(abundance{i}, texel, 0).r);\n"
        ));
    }
    s.push_str("    var max_value = v0;\n");
    for i in 1..n {
        s.push_str(&format!("    max_value = max(max_value, v{i});\n"));
    }
    s.push_str("    var color = vec3<f32>(0.0);\n    if (U.mode == 1u) {\n");
    for i in 0..n {
        s.push_str(&format!(
            "        if (v{i} == max_value) {{ color += v{i} * U.channels[{i}].rgb; }}\n"
        ));
    }
    s.push_str("    } else {\n");
    for i in 0..n {
        s.push_str(&format!("        color += v{i} * U.channels[{i}].rgb;\n"));
    }
    s.push_str("    }\n    return vec4<f32>(color * U.saturation, 1.0);\n}\n");
    s
}

pub struct MineralBlender {
    names: Vec<String>,
    size: (u32, u32),
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    ubo: wgpu::Buffer,
    fs_vbo: wgpu::Buffer,
    sources: Vec<wgpu::Texture>,
    output: wgpu::Texture,
    output_view: wgpu::TextureView,
}

impl MineralBlender {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        channels: &[MineralChannel],
    ) -> Result<Self> {
        let first = channels.first().ok_or(ViewerError::NoChannels)?;
        let (width, height) = (first.width, first.height);
        for ch in channels {
            if (ch.width, ch.height) != (width, height) {
                return Err(ViewerError::ChannelSizeMismatch {
                    name: ch.name.clone(),
                    got: (ch.width, ch.height),
                    expected: (width, height),
                });
            }
            let expected = (width * height) as usize;
            if ch.pixels.len() != expected {
                return Err(ViewerError::ChannelDataLength {
                    name: ch.name.clone(),
                    got: ch.pixels.len(),
                    expected,
                });
            }
        }

        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(ViewerError::TextureTooLarge {
                name: format!("{label} Blend Output"),
                size: (width, height),
                max,
            });
        }

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        // Abundance sources, one luminance texture per channel.
        let sources: Vec<wgpu::Texture> = channels
            .iter()
            .map(|ch| {
                let tex = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&ch.name),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::R8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                });
                queue.write_texture(
                    wgpu::ImageCopyTexture {
                        texture: &tex,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    &ch.pixels,
                    wgpu::ImageDataLayout {
                        offset: 0,
                        bytes_per_row: Some(width),
                        rows_per_image: Some(height),
                    },
                    extent,
                );
                tex
            })
            .collect();

        let output = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} Blend Output")),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FMT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        let n = channels.len();
        let defaults = BlendParams::new(n);
        let names: Vec<String> = channels.iter().map(|c| c.name.clone()).collect();
        let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blend UBO"),
            contents: &blend_uniform_bytes(
                &defaults.channel_uniforms(&names),
                defaults.uniform_threshold(),
                defaults.saturation,
                defaults.mode,
            ),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut layout_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        layout_entries.extend((0..n).map(|i| wgpu::BindGroupLayoutEntry {
            binding: i as u32 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blend Layout"),
            entries: &layout_entries,
        });

        let views: Vec<wgpu::TextureView> = sources
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: ubo.as_entire_binding(),
        }];
        entries.extend(views.iter().enumerate().map(|(i, v)| wgpu::BindGroupEntry {
            binding: i as u32 + 1,
            resource: wgpu::BindingResource::TextureView(v),
        }));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blend Bind Group"),
            layout: &layout,
            entries: &entries,
        });

        let shader = create_shader_checked(
            device,
            &format!("{label} blend ({n} channels)"),
            &blend_shader_source(n),
        )?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blend Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blend Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[super::vec2_layout(0, wgpu::VertexStepMode::Vertex)],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FMT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let fs_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blend FS Triangle"),
            contents: bytemuck::cast_slice(&FS_TRI),
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::info!("{label} blender: {n} channels at {width}x{height}");

        Ok(Self {
            names,
            size: (width, height),
            pipeline,
            bind_group,
            ubo,
            fs_vbo,
            sources,
            output,
            output_view,
        })
    }

    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Compiles `params` into the uniform buffer. Takes effect on `update`.
    pub fn set_blending(&self, queue: &wgpu::Queue, params: &BlendParams) {
        let bytes = blend_uniform_bytes(
            &params.channel_uniforms(&self.names),
            params.uniform_threshold(),
            params.saturation,
            params.mode,
        );
        queue.write_buffer(&self.ubo, 0, &bytes);
    }

    /// Re-renders the output texture from the current uniforms.
    pub fn update(&self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Blend Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blend Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.fs_vbo.slice(..));
            pass.draw(0..3, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    pub fn apply(&self, device: &wgpu::Device, queue: &wgpu::Queue, params: &BlendParams) {
        self.set_blending(queue, params);
        self.update(device, queue);
    }

    pub fn output_view(&self) -> &wgpu::TextureView {
        &self.output_view
    }

    pub fn output_texture(&self) -> &wgpu::Texture {
        &self.output
    }

    pub fn destroy(&self) {
        for t in &self.sources {
            t.destroy();
        }
        self.output.destroy();
        self.ubo.destroy();
        self.fs_vbo.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_is_unrolled_per_channel() {
        let src = blend_shader_source(3);
        assert!(src.contains("array<vec4<f32>, 3>"));
        for i in 0..3 {
            assert!(src.contains(&format!("@binding({}) var abundance{i}", i + 1)));
            assert!(src.contains(&format!("if (v{i} == max_value)")));
        }
        assert!(!src.contains("abundance3"));
        assert_eq!(src.matches("max_value = max(").count(), 2);
    }

    #[test]
    fn uniform_bytes_match_wgsl_layout() {
        let channels = vec![([1.0, 0.5, 0.0], 0.25); 9];
        let bytes = blend_uniform_bytes(&channels, 0.1, 0.9, BlendMode::Maximum);
        assert_eq!(bytes.len(), 9 * 16 + 16);

        let word = |i: usize| u32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
        assert_eq!(f32::from_bits(word(0)), 1.0);
        assert_eq!(f32::from_bits(word(3)), 0.25);
        assert_eq!(f32::from_bits(word(36)), 0.9);
        assert_eq!(f32::from_bits(word(37)), 0.1);
        assert_eq!(word(38), 1);
    }
}
