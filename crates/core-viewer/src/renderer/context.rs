//! Thin wrappers over wgpu object lifecycles: device/surface setup, checked
//! shader creation, fixed-size vertex streams, and texel read-back.

use crate::error::{Result, ViewerError};
use std::sync::{mpsc, Arc};
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Holds all GPU resources needed for rendering.
pub struct GfxContext {
    pub surface: wgpu::Surface<'static>,
    pub device:  Arc<wgpu::Device>,
    pub queue:   Arc<wgpu::Queue>,
    pub config:  wgpu::SurfaceConfiguration,
    pub size:    winit::dpi::PhysicalSize<u32>,
}

impl GfxContext {
    /// Creates a new graphics context bound to the given window.
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        // The surface must outlive the window; `Arc` guarantees this.
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference:         wgpu::PowerPreference::HighPerformance,
                compatible_surface:       Some(&surface),
                force_fallback_adapter:   false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label:            Some("Core Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits:   adapter.limits(),
                },
                None, // no trace
            )
            .await?;

        // Prefer a non-sRGB format: blended mineral colours are already display values.
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage:                       wgpu::TextureUsages::RENDER_ATTACHMENT,
            format:                      surface_format,
            width:                       size.width.max(1),
            height:                      size.height.max(1),
            present_mode:                wgpu::PresentMode::Fifo, // V‑sync
            alpha_mode:                  caps.alpha_modes[0],
            view_formats:                vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!(
            "GPU adapter: {} ({:?}), surface format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format
        );

        Ok(Self {
            surface,
            device: Arc::new(device),
            queue: Arc::new(queue),
            config,
            size,
        })
    }

    /// Resizes the swap chain when the window size changes.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }
}

/// Device without a surface, for offscreen blending and tests.
pub async fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference:       wgpu::PowerPreference::default(),
            compatible_surface:     None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(ViewerError::NoAdapter)?;
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label:             Some("Headless Core Device"),
                required_features: wgpu::Features::empty(),
                required_limits:   adapter.limits(),
            },
            None,
        )
        .await?;
    Ok((device, queue))
}

/// Compiles WGSL inside a validation error scope so a bad shader surfaces as
/// `ViewerError::Shader` instead of the device's uncaptured-error panic.
pub fn create_shader_checked(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label:  Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(ViewerError::Shader {
            label: label.to_string(),
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

/// A vertex buffer whose vertex count is fixed at creation.
pub struct VertexStream {
    label: &'static str,
    buffer: wgpu::Buffer,
    components: usize,
    vertex_count: usize,
}

impl VertexStream {
    /// Uploads `data` as `components` f32 values per vertex.
    pub fn from_f32(
        device: &wgpu::Device,
        label: &'static str,
        data: &[f32],
        components: usize,
    ) -> Self {
        Self::with_usage(
            device,
            label,
            bytemuck::cast_slice(data),
            data.len() / components,
            components,
            wgpu::BufferUsages::empty(),
        )
    }

    pub fn with_usage(
        device: &wgpu::Device,
        label: &'static str,
        bytes: &[u8],
        vertex_count: usize,
        components: usize,
        extra_usage: wgpu::BufferUsages,
    ) -> Self {
        // Zero-sized buffers cannot be sliced; keep a stub for empty streams.
        let contents = if bytes.is_empty() { &[0u8; 16][..] } else { bytes };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label:    Some(label),
            contents,
            usage:    wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST | extra_usage,
        });
        Self {
            label,
            buffer,
            components,
            vertex_count,
        }
    }

    /// Overwrites the whole stream. A length change means the layout engine
    /// and this buffer disagree, which is a bug, so it is refused.
    pub fn write(&self, queue: &wgpu::Queue, data: &[f32]) -> Result<()> {
        let got = data.len() / self.components;
        if got != self.vertex_count || data.len() % self.components != 0 {
            return Err(ViewerError::VertexCountMismatch {
                label: self.label,
                expected: self.vertex_count,
                got,
            });
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
        Ok(())
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}

/// Copies an RGBA8 region of `texture` back to the CPU, row padding removed.
///
/// Blocks until the GPU has finished; meant for single pick texels and tests.
pub fn read_texture_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    origin: (u32, u32),
    extent: (u32, u32),
) -> Result<Vec<u8>> {
    let (width, height) = extent;
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label:              Some("Texel Readback"),
        size:               (padded * height) as u64,
        usage:              wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin:    wgpu::Origin3d { x: origin.0, y: origin.1, z: 0 },
            aspect:    wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &readback,
            layout: wgpu::ImageDataLayout {
                offset:         0,
                bytes_per_row:  Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    receiver
        .recv()
        .map_err(|_| ViewerError::Readback("map callback dropped".into()))?
        .map_err(|e| ViewerError::Readback(e.to_string()))?;

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in mapped.chunks(padded as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..unpadded as usize]);
    }
    drop(mapped);
    readback.unmap();
    readback.destroy();
    Ok(pixels)
}
