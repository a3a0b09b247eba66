//! The core renderer. Owns every GPU resource of one loaded core and drives
//! the per-frame cycle: camera, transitions, regeneration, picking, drawing.

pub mod callbacks;
pub mod context;
pub mod frame;
pub mod pipelines;

use self::{
    callbacks::Callbacks,
    frame::{FrameBindings, FrameUniform},
    pipelines::{
        accents::AccentRenderer,
        blender::MineralBlender,
        highlight::HighlightRenderer,
        representation::{DownscaledRenderer, PunchcardRenderer},
        stencil::{PickThrottle, StencilRenderer},
    },
};
use crate::{
    camera::{Camera, CameraChange},
    data::CoreAssets,
    error::Result,
};
use coremap::{
    layout::{downscaled_tex_coords, punchcard_tex_coords},
    BlendParams, Bounds, LayoutEngine, LayoutParams, SectionIdMetadata, Shape, ShapePair, Spacing,
    TileTextureMetadata, Transition, ViewMode,
};
use glam::Vec2;
use std::sync::Arc;
use std::time::Instant;

/// Shape and calibration transitions take `1 / TRANSITION_SPEED` seconds.
pub const TRANSITION_SPEED: f32 = 1.25;
/// Pointer travel below which a press/release counts as a click.
pub const CLICK_THRESHOLD_PX: f32 = 5.0;
pub const MIN_POINT_SIZE: f32 = 1.0;
/// Vertical spacing change per `[` / `]` press.
pub const SPACING_STEP: f32 = 0.05;

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.025,
    a: 1.0,
};
const ACCENT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.35];
/// Highlight glow radius as a fraction of the visible height.
const GLOW_FRACTION: f32 = 0.08;
/// Cursor position used when the pointer is outside the window.
const NO_CURSOR: [f32; 2] = [1.0e6, 1.0e6];

/// Initial presentation state.
#[derive(Debug, Clone, Copy)]
pub struct CoreOptions {
    pub shape: Shape,
    pub view_mode: ViewMode,
    pub point_size: f32,
    pub zoom: f32,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            shape: Shape::Column,
            view_mode: ViewMode::Downscaled,
            point_size: 2.0,
            zoom: 0.5,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Pointer {
    down: bool,
    drag_px: f32,
    last: Option<Vec2>,
}

pub struct CoreRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    meta: TileTextureMetadata,
    ids: SectionIdMetadata,
    channel_names: Vec<String>,

    frame: FrameBindings,
    downscaled_blender: MineralBlender,
    punchcard_blender: MineralBlender,
    downscaled: DownscaledRenderer,
    punchcard: PunchcardRenderer,
    accents: AccentRenderer,
    stencil: StencilRenderer,
    highlight: HighlightRenderer,

    camera: Camera,
    /// Target shape; `shape_t` animates toward it.
    shape: Shape,
    shape_t: Transition,
    calibration_t: Transition,
    view_mode: ViewMode,
    spacing: Spacing,
    /// Parameters of the geometry currently in the buffers.
    params: LayoutParams,
    /// Which punchcard shape buffers hold geometry for `params`.
    punch_valid: ShapePair<bool>,
    vertex_bounds: ShapePair<Bounds>,
    blend: BlendParams,
    point_size: f32,

    viewport: (u32, u32),
    cursor: Option<Vec2>,
    pointer: Pointer,
    throttle: PickThrottle,
    hovered: Option<usize>,
    hover_from_pointer: bool,
    selected: Option<usize>,
    highlight_stale: bool,

    pub callbacks: Callbacks,
    disposed: bool,
}

impl CoreRenderer {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        color_fmt: wgpu::TextureFormat,
        viewport: (u32, u32),
        assets: &CoreAssets,
        options: CoreOptions,
    ) -> Result<Self> {
        let started = Instant::now();
        assets.tiles.validate()?;
        assets.ids.check_against(&assets.tiles)?;
        let num_tiles = assets.tiles.num_tiles();

        let viewport = (viewport.0.max(1), viewport.1.max(1));
        let camera = Camera::new(options.shape, options.zoom, viewport.0 as f32 / viewport.1 as f32);
        let shape_t = Transition::new(options.shape == Shape::Spiral, TRANSITION_SPEED);
        let calibration_t = Transition::new(false, TRANSITION_SPEED);
        let spacing = Spacing::default();

        let params = LayoutParams {
            spacing,
            viewport: camera.pagination_bounds(),
            calibration_t: calibration_t.eased(),
        };
        let needed =
            LayoutEngine::punchcard_shapes_needed(options.view_mode, options.shape, shape_t.raw());
        let verts = LayoutEngine::new(&assets.tiles).generate(&params, needed.clone());

        let downscaled_blender =
            MineralBlender::new(&device, &queue, "Downscaled", &assets.downscaled)?;
        let punchcard_blender = MineralBlender::new(&device, &queue, "Punchcard", &assets.punchcard)?;
        let channel_names = downscaled_blender.channel_names().to_vec();
        let mut blend = BlendParams::new(channel_names.len());
        blend.palette = assets.palette.clone();
        downscaled_blender.apply(&device, &queue, &blend);
        punchcard_blender.apply(&device, &queue, &blend);

        let frame = FrameBindings::new(&device);
        let downscaled = DownscaledRenderer::new(
            &device,
            &frame.layout,
            color_fmt,
            downscaled_blender.output_view(),
            &verts.downscaled,
            &downscaled_tex_coords(&assets.tiles, params.calibration_t),
        )?;
        let punchcard = PunchcardRenderer::new(
            &device,
            &frame.layout,
            color_fmt,
            punchcard_blender.output_view(),
            &verts.punchcard,
            &punchcard_tex_coords(&assets.tiles, params.calibration_t),
        )?;
        let accents = AccentRenderer::new(&device, &frame.layout, color_fmt, &verts.accents)?;
        let stencil =
            StencilRenderer::new(&device, &frame.layout, num_tiles, downscaled.mesh(), viewport)?;
        let highlight = HighlightRenderer::new(
            &device,
            &frame.layout,
            color_fmt,
            num_tiles,
            downscaled.mesh(),
        )?;

        log::info!(
            "Core renderer ready: {} tiles, {} channels, atlas {}x{}, {} punchcard samples ({:.1} ms)",
            num_tiles,
            channel_names.len(),
            assets.tiles.width,
            assets.tiles.height,
            punchcard.num_samples(),
            started.elapsed().as_secs_f64() * 1e3
        );

        let mut core = Self {
            device,
            queue,
            meta: assets.tiles.clone(),
            ids: assets.ids.clone(),
            channel_names,
            frame,
            downscaled_blender,
            punchcard_blender,
            downscaled,
            punchcard,
            accents,
            stencil,
            highlight,
            camera,
            shape: options.shape,
            shape_t,
            calibration_t,
            view_mode: options.view_mode,
            spacing,
            params,
            punch_valid: needed,
            vertex_bounds: verts.bounds,
            blend,
            point_size: options.point_size.max(MIN_POINT_SIZE),
            viewport,
            cursor: None,
            pointer: Pointer::default(),
            throttle: PickThrottle::default(),
            hovered: None,
            hover_from_pointer: false,
            selected: None,
            highlight_stale: false,
            callbacks: Callbacks::default(),
            disposed: false,
        };
        core.update_pan_range();
        Ok(core)
    }

    // ---- per frame -------------------------------------------------------

    /// Advances animations by `elapsed` seconds and draws into `target`.
    /// Does nothing once disposed.
    pub fn frame(&mut self, target: &wgpu::TextureView, elapsed: f32) -> Result<()> {
        if self.disposed {
            return Ok(());
        }

        if self.camera.update(elapsed) {
            self.throttle.invalidate();
            self.callbacks.pan_changed(self.camera.pan_t());
        }

        self.shape_t.advance(elapsed);
        let calibrating = self.calibration_t.advance(elapsed);
        if calibrating || self.punchcard_stale() {
            self.regenerate()?;
        }

        self.write_frame_uniform();
        self.update_pointer_hover()?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Core Frame Encoder"),
        });
        self.highlight.set_hovered(&mut encoder, self.downscaled.mesh(), self.hovered);
        if self.highlight_stale {
            self.highlight.refresh(&mut encoder, self.downscaled.mesh());
            self.highlight_stale = false;
        }

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Core Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let frame = &self.frame.bind_group;
            match self.view_mode {
                ViewMode::Downscaled => self.downscaled.draw(&mut rpass, frame),
                ViewMode::Punchcard => self.punchcard.draw(&mut rpass, frame),
            }
            self.highlight.draw(&mut rpass, frame);
            self.accents.draw(&mut rpass, frame);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn punchcard_stale(&self) -> bool {
        let needed =
            LayoutEngine::punchcard_shapes_needed(self.view_mode, self.shape, self.shape_t.raw());
        (needed.column && !self.punch_valid.column) || (needed.spiral && !self.punch_valid.spiral)
    }

    /// Rebuilds every position stream from the current parameters.
    fn regenerate(&mut self) -> Result<()> {
        let params = LayoutParams {
            spacing: self.spacing,
            viewport: self.camera.pagination_bounds(),
            calibration_t: self.calibration_t.eased(),
        };
        let needed =
            LayoutEngine::punchcard_shapes_needed(self.view_mode, self.shape, self.shape_t.raw());
        let verts = LayoutEngine::new(&self.meta).generate(&params, needed);

        self.downscaled.upload_positions(&self.queue, &verts.downscaled)?;
        self.punch_valid = self.punchcard.upload_positions(&self.queue, &verts.punchcard)?;
        self.accents.upload_positions(&self.queue, &verts.accents)?;

        if params.calibration_t != self.params.calibration_t {
            self.downscaled
                .upload_tex_coords(&self.queue, &downscaled_tex_coords(&self.meta, params.calibration_t))?;
            self.punchcard
                .upload_tex_coords(&self.queue, &punchcard_tex_coords(&self.meta, params.calibration_t))?;
        }

        self.vertex_bounds = verts.bounds;
        self.params = params;
        self.update_pan_range();
        self.highlight_stale = true;
        self.throttle.invalidate();
        Ok(())
    }

    /// Column focus may travel until the last column is in view.
    fn update_pan_range(&mut self) {
        let bounds = self.vertex_bounds.column;
        let half = self.params.viewport.width() * 0.5;
        let min = bounds.left + half;
        self.camera.set_pan_range(min, bounds.right - half);
    }

    fn viewport_vec(&self) -> Vec2 {
        Vec2::new(self.viewport.0 as f32, self.viewport.1 as f32)
    }

    fn write_frame_uniform(&self) {
        let cursor_world = self
            .cursor
            .map_or(NO_CURSOR, |c| self.camera.screen_to_world(c, self.viewport_vec()).into());
        let uniform = FrameUniform {
            view_proj: self.camera.view_proj().to_cols_array_2d(),
            viewport_size: self.viewport_vec().into(),
            shape_t: self.shape_t.eased(),
            point_size_px: self.point_size,
            cursor_world,
            glow_radius: self.camera.visible_extent().y * GLOW_FRACTION,
            _pad0: 0.0,
            accent_color: ACCENT_COLOR,
        };
        self.frame.write(&self.queue, &uniform);
    }

    fn cursor_px(&self) -> Option<(u32, u32)> {
        let c = self.cursor?;
        let inside = c.x >= 0.0
            && c.y >= 0.0
            && c.x < self.viewport.0 as f32
            && c.y < self.viewport.1 as f32;
        inside.then(|| (c.x as u32, c.y as u32))
    }

    fn pick_at(&self, px: (u32, u32)) -> Result<Option<usize>> {
        self.stencil
            .pick(&self.device, &self.queue, &self.frame.bind_group, self.downscaled.mesh(), px)
    }

    /// At most one hover notification per frame.
    fn update_pointer_hover(&mut self) -> Result<()> {
        if self.cursor.is_none() {
            if self.hover_from_pointer && self.hovered.is_some() {
                self.set_hover(None, true);
            }
            return Ok(());
        }
        let cursor = self.cursor_px();
        if !self.throttle.should_pick(cursor, self.shape_t.raw()) {
            return Ok(());
        }
        let Some(px) = cursor else {
            return Ok(());
        };
        let index = self.pick_at(px)?;
        self.hover_from_pointer = true;
        self.set_hover(index, true);
        Ok(())
    }

    fn set_hover(&mut self, index: Option<usize>, notify: bool) {
        if index == self.hovered {
            return;
        }
        self.hovered = index;
        let id = index.and_then(|i| self.ids.ids.get(i)).map(String::as_str);
        log::debug!("Hovered section: {:?}", id);
        if notify {
            self.callbacks.hover_changed(id);
        }
    }

    fn after_camera_change(&mut self, change: CameraChange) -> Result<()> {
        if change.panned {
            self.throttle.invalidate();
            self.callbacks.pan_changed(self.camera.pan_t());
        }
        if change.zoomed {
            // Column pagination follows the visible height.
            self.regenerate()?;
            self.callbacks.zoom_changed(self.camera.zoom_t());
        }
        Ok(())
    }

    // ---- input -----------------------------------------------------------

    /// Cursor moved to `(x, y)` physical pixels.
    pub fn pointer_moved(&mut self, x: f32, y: f32) -> Result<()> {
        let pos = Vec2::new(x, y);
        if let (true, Some(last)) = (self.pointer.down, self.pointer.last) {
            let delta = pos - last;
            self.pointer.drag_px += delta.length();
            let change = self.camera.mousedrag(delta.x, delta.y);
            self.after_camera_change(change)?;
        }
        self.pointer.last = Some(pos);
        self.cursor = Some(pos);
        Ok(())
    }

    pub fn pointer_down(&mut self) {
        self.pointer.down = true;
        self.pointer.drag_px = 0.0;
    }

    /// Ends a press. Short presses select the tile under the cursor.
    pub fn pointer_up(&mut self) -> Result<()> {
        let was_down = std::mem::replace(&mut self.pointer.down, false);
        if !was_down || self.pointer.drag_px >= CLICK_THRESHOLD_PX || self.shape_t.in_flight() {
            return Ok(());
        }
        let Some(px) = self.cursor_px() else {
            return Ok(());
        };

        self.write_frame_uniform();
        if let Some(index) = self.pick_at(px)? {
            self.selected = Some(index);
            let id = self.ids.ids[index].as_str();
            log::debug!("Selected section {id}");
            self.callbacks.part_selected(id);
        }
        Ok(())
    }

    pub fn pointer_left(&mut self) {
        self.cursor = None;
        self.pointer = Pointer::default();
    }

    /// Wheel `delta` in lines, positive when scrolling up.
    pub fn wheel(&mut self, delta: f32) -> Result<()> {
        let change = self.camera.mousewheel(delta);
        self.after_camera_change(change)
    }

    /// Keyboard shortcuts: `+`/`=` and `-` for point size, `]` and `[` for
    /// vertical spacing. Returns whether the key was used.
    pub fn key(&mut self, c: char) -> Result<bool> {
        match c {
            '+' | '=' => self.set_point_size(self.point_size + 1.0),
            '-' => self.set_point_size(self.point_size - 1.0),
            ']' | '[' => {
                let step = if c == ']' { SPACING_STEP } else { -SPACING_STEP };
                let before = self.spacing;
                let spacing = Spacing::new(self.spacing.horizontal, self.spacing.vertical + step);
                self.set_spacing(spacing)?;
                if self.spacing != before {
                    self.callbacks.spacing_changed(self.spacing);
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || (width, height) == self.viewport {
            return Ok(());
        }
        self.viewport = (width, height);
        self.camera.set_aspect(width as f32 / height as f32);
        self.stencil.resize(&self.device, self.viewport);
        self.regenerate()
    }

    // ---- mutation API ----------------------------------------------------

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Starts the animated transition to `shape`.
    pub fn set_shape(&mut self, shape: Shape) {
        if shape == self.shape {
            return;
        }
        self.shape = shape;
        self.shape_t.set_target(shape == Shape::Spiral);
        if shape == Shape::Column {
            self.camera.set_target_focus(Vec2::new(self.camera.pan_range().0, 0.0));
        }
        self.camera.set_mode(shape);
        log::debug!("Shape -> {shape:?}");
    }

    /// Eased column (0) to spiral (1) blend currently drawn.
    pub fn shape_t(&self) -> f32 {
        self.shape_t.eased()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Switches representation; missing punchcard geometry is built on the
    /// next frame.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: Spacing) -> Result<()> {
        let spacing = Spacing::new(spacing.horizontal, spacing.vertical);
        if spacing == self.spacing {
            return Ok(());
        }
        self.spacing = spacing;
        self.regenerate()
    }

    pub fn zoom(&self) -> f32 {
        self.camera.zoom_t()
    }

    pub fn set_zoom(&mut self, t: f32) -> Result<()> {
        self.camera.zoom(t);
        self.throttle.invalidate();
        self.regenerate()
    }

    pub fn pan(&self) -> f32 {
        self.camera.pan_t()
    }

    pub fn set_pan(&mut self, t: f32) {
        self.camera.set_pan_t(t);
        self.throttle.invalidate();
    }

    pub fn calibration_removed(&self) -> bool {
        self.calibration_t.target_is_one()
    }

    /// Starts the animated removal (or restoration) of calibration gaps.
    pub fn set_calibration_removed(&mut self, removed: bool) {
        self.calibration_t.set_target(removed);
    }

    pub fn blend_params(&self) -> &BlendParams {
        &self.blend
    }

    /// Recompiles both blenders' uniforms and re-renders their outputs.
    pub fn set_blending(&mut self, params: BlendParams) {
        self.downscaled_blender.apply(&self.device, &self.queue, &params);
        self.punchcard_blender.apply(&self.device, &self.queue, &params);
        self.blend = params;
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    pub fn set_point_size(&mut self, px: f32) {
        self.point_size = px.max(MIN_POINT_SIZE);
    }

    /// Highlights the section `id`, or clears the highlight. Returns whether
    /// the id was known. The hover callback is not fired.
    pub fn set_hovered(&mut self, id: Option<&str>) -> bool {
        let index = id.and_then(|id| self.ids.index_of(id));
        self.hover_from_pointer = false;
        self.set_hover(index, false);
        id.is_none() || index.is_some()
    }

    /// Which punchcard shape buffers hold current geometry.
    pub fn punchcard_shapes_ready(&self) -> ShapePair<bool> {
        self.punch_valid.clone()
    }

    pub fn hovered_id(&self) -> Option<&str> {
        self.hovered.and_then(|i| self.ids.ids.get(i)).map(String::as_str)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.and_then(|i| self.ids.ids.get(i)).map(String::as_str)
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn num_tiles(&self) -> usize {
        self.meta.num_tiles()
    }

    pub fn vertex_bounds(&self, shape: Shape) -> Bounds {
        *self.vertex_bounds.get(shape)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Releases every buffer and texture. Only `frame` stays callable, as a
    /// no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.downscaled.destroy();
        self.punchcard.destroy();
        self.accents.destroy();
        self.stencil.destroy();
        self.highlight.destroy();
        self.downscaled_blender.destroy();
        self.punchcard_blender.destroy();
        self.frame.destroy();
        self.disposed = true;
        log::info!("Core renderer disposed");
    }
}
