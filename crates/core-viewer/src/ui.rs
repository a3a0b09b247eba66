//! egui control panel and HUD. Thin glue: the panel reads the core's state,
//! the host applies whatever it reports as changed.

use crate::renderer::CoreRenderer;
use coremap::{palette::resolve_colors, BlendMode, BlendParams, Shape, Spacing, ViewMode};

/// Settings the user changed this frame.
#[derive(Debug, Clone, Default)]
pub struct PanelResponse {
    pub shape: Option<Shape>,
    pub view_mode: Option<ViewMode>,
    pub spacing: Option<Spacing>,
    pub zoom: Option<f32>,
    pub pan: Option<f32>,
    pub calibration_removed: Option<bool>,
    pub point_size: Option<f32>,
    pub blend: Option<BlendParams>,
}

impl PanelResponse {
    /// Pushes every change into the core.
    pub fn apply(self, core: &mut CoreRenderer) -> crate::error::Result<()> {
        if let Some(shape) = self.shape {
            core.set_shape(shape);
        }
        if let Some(mode) = self.view_mode {
            core.set_view_mode(mode);
        }
        if let Some(spacing) = self.spacing {
            core.set_spacing(spacing)?;
        }
        if let Some(zoom) = self.zoom {
            core.set_zoom(zoom)?;
        }
        if let Some(pan) = self.pan {
            core.set_pan(pan);
        }
        if let Some(removed) = self.calibration_removed {
            core.set_calibration_removed(removed);
        }
        if let Some(px) = self.point_size {
            core.set_point_size(px);
        }
        if let Some(blend) = self.blend {
            core.set_blending(blend);
        }
        Ok(())
    }
}

pub fn show_control_panel(ctx: &egui::Context, core: &CoreRenderer) -> PanelResponse {
    let mut response = PanelResponse::default();

    egui::SidePanel::left("core_controls")
        .default_width(240.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Layout");

            let mut shape = core.shape();
            ui.horizontal(|ui| {
                ui.radio_value(&mut shape, Shape::Column, "Column");
                ui.radio_value(&mut shape, Shape::Spiral, "Spiral");
            });
            if shape != core.shape() {
                response.shape = Some(shape);
            }

            let mut mode = core.view_mode();
            ui.horizontal(|ui| {
                ui.radio_value(&mut mode, ViewMode::Downscaled, "Downscaled");
                ui.radio_value(&mut mode, ViewMode::Punchcard, "Punchcard");
            });
            if mode != core.view_mode() {
                response.view_mode = Some(mode);
            }

            let mut spacing = core.spacing();
            let h = ui.add(egui::Slider::new(&mut spacing.horizontal, 0.0..=1.0).text("Horizontal spacing"));
            let v = ui.add(egui::Slider::new(&mut spacing.vertical, 0.0..=1.0).text("Vertical spacing ([ ])"));
            if h.changed() || v.changed() {
                response.spacing = Some(spacing);
            }

            let mut zoom = core.zoom();
            if ui.add(egui::Slider::new(&mut zoom, 0.0..=1.0).text("Zoom")).changed() {
                response.zoom = Some(zoom);
            }

            if core.shape() == Shape::Column {
                let mut pan = core.pan();
                if ui.add(egui::Slider::new(&mut pan, 0.0..=1.0).text("Pan")).changed() {
                    response.pan = Some(pan);
                }
            }

            let mut removed = core.calibration_removed();
            if ui.checkbox(&mut removed, "Remove calibration").changed() {
                response.calibration_removed = Some(removed);
            }

            if core.view_mode() == ViewMode::Punchcard {
                let mut px = core.point_size();
                if ui.add(egui::Slider::new(&mut px, 1.0..=16.0).step_by(1.0).text("Point size (+ -)")).changed() {
                    response.point_size = Some(px);
                }
            }

            ui.separator();
            ui.heading("Blending");
            if let Some(blend) = blend_controls(ui, core.channel_names(), core.blend_params()) {
                response.blend = Some(blend);
            }
        });

    response
}

fn blend_controls(ui: &mut egui::Ui, names: &[String], current: &BlendParams) -> Option<BlendParams> {
    let mut blend = current.clone();

    ui.horizontal(|ui| {
        ui.radio_value(&mut blend.mode, BlendMode::Additive, "Additive");
        ui.radio_value(&mut blend.mode, BlendMode::Maximum, "Maximum");
    });
    ui.add(egui::Slider::new(&mut blend.saturation, 0.0..=3.0).text("Saturation"));
    ui.add(egui::Slider::new(&mut blend.threshold, 0.0..=1.0).text("Threshold"));
    ui.checkbox(&mut blend.monochrome, "Monochrome when isolated");

    ui.separator();
    let colors = resolve_colors(names, &blend.visibility, &blend.palette, blend.monochrome);
    egui::Grid::new("channels").num_columns(3).striped(true).show(ui, |ui| {
        for (i, name) in names.iter().enumerate() {
            let swatch = colors
                .get(i)
                .copied()
                .flatten()
                .map_or(egui::Color32::DARK_GRAY, |c| egui::Color32::from_rgb(c[0], c[1], c[2]));
            ui.colored_label(swatch, "■");
            if let Some(visible) = blend.visibility.get_mut(i) {
                ui.checkbox(visible, name.as_str());
            }
            if let Some(magnitude) = blend.magnitudes.get_mut(i) {
                ui.add(egui::Slider::new(magnitude, 0.0..=1.0).show_value(false));
            }
            ui.end_row();
        }
    });

    (blend != *current).then_some(blend)
}

/// Hovered and selected section ids, bottom right.
pub fn show_hud(ctx: &egui::Context, hovered: Option<&str>, selected: Option<&str>) {
    egui::Area::new(egui::Id::new("core_hud"))
        .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(format!("Hovered: {}", hovered.unwrap_or("-")));
                ui.label(format!("Selected: {}", selected.unwrap_or("-")));
            });
        });
}
