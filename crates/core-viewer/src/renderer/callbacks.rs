//! Optional listener slots the core renderer notifies its host through.
//!
//! Slots may be set or cleared at any time; an empty slot only means nobody
//! is told, the renderer's own state is updated either way.

use coremap::Spacing;

#[derive(Default)]
pub struct Callbacks {
    pub part_selected: Option<Box<dyn FnMut(&str)>>,
    pub hover_changed: Option<Box<dyn FnMut(Option<&str>)>>,
    pub zoom_changed: Option<Box<dyn FnMut(f32)>>,
    pub pan_changed: Option<Box<dyn FnMut(f32)>>,
    pub spacing_changed: Option<Box<dyn FnMut(Spacing)>>,
}

impl Callbacks {
    pub fn part_selected(&mut self, id: &str) {
        if let Some(cb) = self.part_selected.as_mut() {
            cb(id);
        }
    }

    pub fn hover_changed(&mut self, id: Option<&str>) {
        if let Some(cb) = self.hover_changed.as_mut() {
            cb(id);
        }
    }

    pub fn zoom_changed(&mut self, zoom_t: f32) {
        if let Some(cb) = self.zoom_changed.as_mut() {
            cb(zoom_t);
        }
    }

    pub fn pan_changed(&mut self, pan_t: f32) {
        if let Some(cb) = self.pan_changed.as_mut() {
            cb(pan_t);
        }
    }

    pub fn spacing_changed(&mut self, spacing: Spacing) {
        if let Some(cb) = self.spacing_changed.as_mut() {
            cb(spacing);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("part_selected", &self.part_selected.is_some())
            .field("hover_changed", &self.hover_changed.is_some())
            .field("zoom_changed", &self.zoom_changed.is_some())
            .field("pan_changed", &self.pan_changed.is_some())
            .field("spacing_changed", &self.spacing_changed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn empty_slots_are_silent() {
        let mut cbs = Callbacks::default();
        cbs.part_selected("1_1");
        cbs.hover_changed(None);
        cbs.zoom_changed(0.5);
        cbs.pan_changed(0.5);
        cbs.spacing_changed(Spacing::default());
    }

    #[test]
    fn slots_can_be_attached_and_detached_later() {
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let mut cbs = Callbacks::default();

        cbs.hover_changed(Some("before"));
        let sink = seen.clone();
        cbs.hover_changed = Some(Box::new(move |id| {
            sink.borrow_mut().push(id.unwrap_or("-").to_string())
        }));
        cbs.hover_changed(Some("3_2"));
        cbs.hover_changed(None);
        cbs.hover_changed = None;
        cbs.hover_changed(Some("after"));

        assert_eq!(*seen.borrow(), vec!["3_2".to_string(), "-".to_string()]);
    }
}
