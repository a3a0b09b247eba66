//! Perspective camera looking down -z at the layout plane (z = 0).
//!
//! Column mode pans horizontally only and the wheel scrolls; spiral mode pans
//! in 2-D and the wheel zooms.

use coremap::{ease, Bounds, Shape};
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

pub const FOV_Y_DEG: f32 = 45.0;
/// Eye distance at `zoom_t == 0`.
pub const MIN_ZOOM: f32 = 2.0;
/// Eye distance at `zoom_t == 1`.
pub const MAX_ZOOM: f32 = 160.0;
/// Focus retargets complete in `1 / FOCUS_SPEED` seconds.
pub const FOCUS_SPEED: f32 = 1.5;
/// World units per dragged pixel, before the zoom factor.
pub const DRAG_SPEED: f32 = 0.02;
/// World units per wheel line in column mode, before the zoom factor.
pub const WHEEL_PAN_SPEED: f32 = 2.0;
/// `zoom_t` change per wheel line in spiral mode.
pub const WHEEL_ZOOM_SPEED: f32 = 0.05;
/// Fraction of the visible rectangle trimmed on each side for pagination.
pub const PAGE_MARGIN: f32 = 0.05;

const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;

/// What an input event changed, so the owner can notify its listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraChange {
    pub panned: bool,
    pub zoomed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Retarget {
    from: Vec2,
    t: f32,
}

#[derive(Debug, Clone)]
pub struct Camera {
    zoom_t: f32,
    focus: Vec2,
    /// Focus the next `reset_focus` eases toward.
    target_focus: Vec2,
    retarget: Option<Retarget>,
    mode: Shape,
    /// Allowed focus x in column mode.
    pan_range: (f32, f32),
    aspect: f32,
    view: Mat4,
}

impl Camera {
    pub fn new(mode: Shape, zoom_t: f32, aspect: f32) -> Self {
        let mut camera = Self {
            zoom_t: zoom_t.clamp(0.0, 1.0),
            focus: Vec2::ZERO,
            target_focus: Vec2::ZERO,
            retarget: None,
            mode,
            pan_range: (0.0, 0.0),
            aspect: aspect.max(f32::EPSILON),
            view: Mat4::IDENTITY,
        };
        camera.update_view();
        camera
    }

    pub fn mode(&self) -> Shape {
        self.mode
    }

    pub fn zoom_t(&self) -> f32 {
        self.zoom_t
    }

    pub fn focus(&self) -> Vec2 {
        self.focus
    }

    pub fn zoom_distance(&self) -> f32 {
        MIN_ZOOM + self.zoom_t * (MAX_ZOOM - MIN_ZOOM)
    }

    /// Pan sensitivity; sub-linear so panning feels alike at both zoom ends.
    pub fn zoom_factor(&self) -> f32 {
        (self.zoom_t + 0.1).powf(0.7)
    }

    pub fn eye(&self) -> Vec3 {
        self.focus.extend(self.zoom_distance())
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(f32::EPSILON);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.focus += Vec2::new(dx, dy) * self.zoom_factor();
        self.clamp_focus();
        self.update_view();
    }

    pub fn zoom(&mut self, t: f32) {
        self.zoom_t = t.clamp(0.0, 1.0);
        self.update_view();
    }

    /// Wheel `delta` in lines, positive when scrolling up.
    pub fn mousewheel(&mut self, delta: f32) -> CameraChange {
        match self.mode {
            Shape::Column => {
                let before = self.focus;
                self.pan(-delta * WHEEL_PAN_SPEED, 0.0);
                CameraChange {
                    panned: self.focus != before,
                    zoomed: false,
                }
            }
            Shape::Spiral => {
                let before = self.zoom_t;
                self.zoom(self.zoom_t - delta * WHEEL_ZOOM_SPEED);
                CameraChange {
                    panned: false,
                    zoomed: self.zoom_t != before,
                }
            }
        }
    }

    /// Drag by `(dx, dy)` physical pixels; the scene follows the pointer.
    pub fn mousedrag(&mut self, dx: f32, dy: f32) -> CameraChange {
        let before = self.focus;
        let dy = match self.mode {
            Shape::Column => 0.0,
            Shape::Spiral => dy,
        };
        self.pan(-dx * DRAG_SPEED, dy * DRAG_SPEED);
        CameraChange {
            panned: self.focus != before,
            zoomed: false,
        }
    }

    pub fn set_mode(&mut self, mode: Shape) {
        self.mode = mode;
        self.reset_focus();
    }

    /// Starts easing the focus toward the pending target, which then returns
    /// to the origin.
    pub fn reset_focus(&mut self) {
        self.retarget = Some(Retarget { from: self.focus, t: 0.0 });
    }

    /// Focus the next `reset_focus` eases toward.
    pub fn set_target_focus(&mut self, target: Vec2) {
        self.target_focus = target;
    }

    /// Limits column-mode focus x to `[min, max]`.
    pub fn set_pan_range(&mut self, min: f32, max: f32) {
        self.pan_range = (min, max.max(min));
        self.clamp_focus();
        self.update_view();
    }

    pub fn pan_range(&self) -> (f32, f32) {
        self.pan_range
    }

    /// Column focus x normalised over the pan range.
    pub fn pan_t(&self) -> f32 {
        let (min, max) = self.pan_range;
        if max - min <= f32::EPSILON {
            0.0
        } else {
            ((self.focus.x - min) / (max - min)).clamp(0.0, 1.0)
        }
    }

    pub fn set_pan_t(&mut self, t: f32) {
        let (min, max) = self.pan_range;
        self.focus.x = min + t.clamp(0.0, 1.0) * (max - min);
        self.update_view();
    }

    /// Advances an in-flight focus retarget. Returns whether the focus moved.
    pub fn update(&mut self, elapsed: f32) -> bool {
        let Some(mut r) = self.retarget else {
            return false;
        };
        r.t = (r.t + elapsed * FOCUS_SPEED).min(1.0);
        self.focus = r.from.lerp(self.target_focus, ease(r.t));
        if r.t >= 1.0 {
            self.retarget = None;
            self.target_focus = Vec2::ZERO;
        } else {
            self.retarget = Some(r);
        }
        self.clamp_focus();
        self.update_view();
        true
    }

    pub fn is_retargeting(&self) -> bool {
        self.retarget.is_some()
    }

    fn clamp_focus(&mut self) {
        // A retarget is allowed to cross the range; it ends inside it.
        if self.mode == Shape::Column && self.retarget.is_none() {
            self.focus.x = self.focus.x.clamp(self.pan_range.0, self.pan_range.1);
        }
    }

    fn update_view(&mut self) {
        self.view = Mat4::look_at_rh(self.eye(), self.focus.extend(0.0), Vec3::Y);
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEG.to_radians(), self.aspect, NEAR, FAR)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view
    }

    /// Size of the visible rectangle on the layout plane.
    pub fn visible_extent(&self) -> Vec2 {
        let h = 2.0 * self.zoom_distance() * (FOV_Y_DEG.to_radians() * 0.5).tan();
        Vec2::new(h * self.aspect, h)
    }

    /// Rectangle the column layout paginates into. Centred on the origin so
    /// panning does not move the layout itself.
    pub fn pagination_bounds(&self) -> Bounds {
        let e = self.visible_extent() * (1.0 - 2.0 * PAGE_MARGIN);
        Bounds::centered(e.x, e.y)
    }

    /// Unprojects a cursor position in physical pixels onto the z = 0 plane.
    pub fn screen_to_world(&self, cursor: Vec2, viewport: Vec2) -> Vec2 {
        let ndc = Vec2::new(
            2.0 * cursor.x / viewport.x.max(1.0) - 1.0,
            1.0 - 2.0 * cursor.y / viewport.y.max(1.0),
        );
        let near = self.view_proj().inverse() * ndc.extend(0.0).extend(1.0);
        let near = near.xyz() / near.w;

        let eye = self.eye();
        let dir = near - eye;
        if dir.z.abs() <= f32::EPSILON {
            return self.focus;
        }
        (eye + dir * (-eye.z / dir.z)).truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn zoom_clamps_and_maps_to_distance() {
        let mut cam = Camera::new(Shape::Spiral, 0.5, 1.0);
        cam.zoom(-3.0);
        assert_eq!(cam.zoom_t(), 0.0);
        assert!(approx(cam.zoom_distance(), MIN_ZOOM));
        cam.zoom(7.0);
        assert!(approx(cam.zoom_distance(), MAX_ZOOM));
        assert!(approx(cam.eye().z, MAX_ZOOM));
    }

    #[test]
    fn pan_scales_with_zoom_factor() {
        let mut cam = Camera::new(Shape::Spiral, 0.9, 1.0);
        assert!(approx(cam.zoom_factor(), 1.0));
        cam.pan(2.0, -1.0);
        assert!(approx(cam.focus().x, 2.0) && approx(cam.focus().y, -1.0));

        let mut near = Camera::new(Shape::Spiral, 0.0, 1.0);
        near.pan(1.0, 0.0);
        assert!(approx(near.focus().x, 0.1f32.powf(0.7)));
    }

    #[test]
    fn wheel_pans_in_column_and_zooms_in_spiral() {
        let mut column = Camera::new(Shape::Column, 0.5, 1.0);
        column.set_pan_range(-100.0, 100.0);
        let change = column.mousewheel(-1.0);
        assert_eq!(change, CameraChange { panned: true, zoomed: false });
        assert!(column.focus().x > 0.0);
        assert_eq!(column.zoom_t(), 0.5);

        let mut spiral = Camera::new(Shape::Spiral, 0.5, 1.0);
        let change = spiral.mousewheel(1.0);
        assert_eq!(change, CameraChange { panned: false, zoomed: true });
        assert!(spiral.zoom_t() < 0.5);
        assert_eq!(spiral.focus(), Vec2::ZERO);
    }

    #[test]
    fn column_drag_ignores_vertical_motion() {
        let mut cam = Camera::new(Shape::Column, 0.9, 1.0);
        cam.set_pan_range(-100.0, 100.0);
        cam.mousedrag(-10.0, 50.0);
        assert!(cam.focus().x > 0.0);
        assert_eq!(cam.focus().y, 0.0);

        let mut spiral = Camera::new(Shape::Spiral, 0.9, 1.0);
        spiral.mousedrag(0.0, 50.0);
        assert!(spiral.focus().y > 0.0);
    }

    #[test]
    fn column_focus_stays_in_pan_range() {
        let mut cam = Camera::new(Shape::Column, 0.9, 1.0);
        cam.set_pan_range(0.0, 10.0);
        cam.pan(-50.0, 0.0);
        assert_eq!(cam.focus().x, 0.0);
        cam.pan(500.0, 0.0);
        assert_eq!(cam.focus().x, 10.0);
        assert_eq!(cam.pan_t(), 1.0);
        cam.set_pan_t(0.25);
        assert!(approx(cam.focus().x, 2.5));
    }

    #[test]
    fn mode_switch_eases_focus_back_to_origin() {
        let mut cam = Camera::new(Shape::Spiral, 0.9, 1.0);
        cam.pan(10.0, 4.0);
        let start = cam.focus();
        cam.set_mode(Shape::Column);
        assert!(cam.is_retargeting());

        let half = 0.5 / FOCUS_SPEED;
        assert!(cam.update(half));
        assert!((cam.focus().x - start.x * 0.5).abs() < 1e-3);
        assert!(cam.update(1.0));
        assert_eq!(cam.focus(), Vec2::ZERO);
        assert!(!cam.is_retargeting());
        assert!(!cam.update(0.1));
    }

    #[test]
    fn screen_centre_unprojects_to_focus() {
        let mut cam = Camera::new(Shape::Spiral, 0.3, 16.0 / 9.0);
        cam.pan(3.0, -2.0);
        let viewport = Vec2::new(1600.0, 900.0);
        let world = cam.screen_to_world(viewport * 0.5, viewport);
        assert!((world - cam.focus()).length() < 1e-3);

        // Right edge sits half the visible width from the focus.
        let edge = cam.screen_to_world(Vec2::new(1600.0, 450.0), viewport);
        assert!((edge.x - cam.focus().x - cam.visible_extent().x * 0.5).abs() < 1e-2);
    }

    #[test]
    fn pagination_bounds_are_focus_independent() {
        let mut cam = Camera::new(Shape::Column, 0.5, 2.0);
        let before = cam.pagination_bounds();
        cam.set_pan_range(-100.0, 100.0);
        cam.pan(20.0, 0.0);
        assert_eq!(cam.pagination_bounds(), before);
        assert!(approx(before.width(), 2.0 * before.height()));
    }
}
