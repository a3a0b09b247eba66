use crate::{
    data::CoreAssets,
    renderer::{context::GfxContext, CoreOptions, CoreRenderer},
    ui,
};
use anyhow::Result;
use std::sync::{mpsc, Arc};
use std::time::Instant;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::Key,
    window::Window,
};

/// Notifications from the core's callback slots, drained once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    Selected(String),
    Hovered(Option<String>),
    Zoomed(f32),
    Panned(f32),
    Spacing(coremap::Spacing),
}

pub struct App {
    pub gfx: GfxContext,
    pub core: CoreRenderer,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    events: mpsc::Receiver<CoreEvent>,
    last_frame: Instant,
}

impl App {
    pub async fn new(window: Arc<Window>, assets: &CoreAssets, options: CoreOptions) -> Result<Self> {
        let gfx = GfxContext::new(window.clone()).await?;

        let mut core = CoreRenderer::new(
            gfx.device.clone(),
            gfx.queue.clone(),
            gfx.config.format,
            (gfx.size.width, gfx.size.height),
            assets,
            options,
        )?;
        let events = Self::attach_callbacks(&mut core);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            core,
            egui_ctx,
            egui_state,
            egui_renderer,
            events,
            last_frame: Instant::now(),
        })
    }

    fn attach_callbacks(core: &mut CoreRenderer) -> mpsc::Receiver<CoreEvent> {
        let (tx, rx) = mpsc::channel();
        let cbs = &mut core.callbacks;

        let sender = tx.clone();
        cbs.part_selected = Some(Box::new(move |id| {
            let _ = sender.send(CoreEvent::Selected(id.to_string()));
        }));
        let sender = tx.clone();
        cbs.hover_changed = Some(Box::new(move |id| {
            let _ = sender.send(CoreEvent::Hovered(id.map(str::to_string)));
        }));
        let sender = tx.clone();
        cbs.zoom_changed = Some(Box::new(move |t| {
            let _ = sender.send(CoreEvent::Zoomed(t));
        }));
        let sender = tx.clone();
        cbs.pan_changed = Some(Box::new(move |t| {
            let _ = sender.send(CoreEvent::Panned(t));
        }));
        cbs.spacing_changed = Some(Box::new(move |s| {
            let _ = tx.send(CoreEvent::Spacing(s));
        }));
        rx
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) -> Result<()> {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.core.resize(new_size.width, new_size.height)?;
        }
        Ok(())
    }

    /// Returns true when egui consumed the event.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> Result<bool> {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return Ok(true);
        }

        match event {
            WindowEvent::Resized(size) => self.resize(*size)?,
            WindowEvent::CursorMoved { position, .. } => {
                self.core.pointer_moved(position.x as f32, position.y as f32)?;
            }
            WindowEvent::CursorLeft { .. } => self.core.pointer_left(),
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => self.core.pointer_down(),
                ElementState::Released => self.core.pointer_up()?,
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.core.wheel(lines)?;
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Key::Character(text) = &event.logical_key {
                    for c in text.chars() {
                        self.core.key(c)?;
                    }
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn drain_events(&mut self) {
        for event in self.events.try_iter() {
            match event {
                CoreEvent::Selected(id) => log::info!("Selected section {id}"),
                other => log::trace!("{other:?}"),
            }
        }
    }

    /// Draws one frame. Surface errors are returned as `wgpu::SurfaceError`
    /// inside the `anyhow` error so the event loop can recover from them.
    pub fn render(&mut self, window: &Window) -> Result<()> {
        let frame = self.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.core.frame(&swap_view, elapsed)?;
        self.drain_events();

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);
        let panel = ui::show_control_panel(&self.egui_ctx, &self.core);
        ui::show_hud(&self.egui_ctx, self.core.hovered_id(), self.core.selected_id());
        let egui_output = self.egui_ctx.end_frame();

        panel.apply(&mut self.core)?;
        self.egui_state
            .handle_platform_output(window, egui_output.platform_output);

        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gfx.config.width, self.gfx.config.height],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.gfx.device, &self.gfx.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.gfx.device,
            &self.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
