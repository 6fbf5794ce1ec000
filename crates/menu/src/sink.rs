//! Render-target seam between the controller and the host UI.
//!
//! The controller treats the tray as write-only: it hands over a full
//! menu tree and a title string and never reads anything back. The host
//! implements [`MenuSink`] over the real tray widget; the in-memory
//! implementation records every render so tests can assert on it.

use crate::item::MenuItem;
use std::cell::RefCell;

pub trait MenuSink {
    /// Replace the whole menu with `items`.
    fn render_menu(&self, items: &[MenuItem]);

    /// Replace the tray title.
    fn set_title(&self, title: &str);

    /// Surface a failed user action. `detail` carries the remote's
    /// response body when there is one.
    fn show_error(&self, message: &str, detail: Option<&str>);
}

/// Sink that records everything for later inspection.
#[derive(Default)]
pub struct InMemorySink {
    menus: RefCell<Vec<Vec<MenuItem>>>,
    titles: RefCell<Vec<String>>,
    errors: RefCell<Vec<(String, Option<String>)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu_count(&self) -> usize {
        self.menus.borrow().len()
    }

    pub fn last_menu(&self) -> Option<Vec<MenuItem>> {
        self.menus.borrow().last().cloned()
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.borrow().clone()
    }

    pub fn last_title(&self) -> Option<String> {
        self.titles.borrow().last().cloned()
    }

    pub fn errors(&self) -> Vec<(String, Option<String>)> {
        self.errors.borrow().clone()
    }

    pub fn clear(&self) {
        self.menus.borrow_mut().clear();
        self.titles.borrow_mut().clear();
        self.errors.borrow_mut().clear();
    }
}

impl MenuSink for InMemorySink {
    fn render_menu(&self, items: &[MenuItem]) {
        self.menus.borrow_mut().push(items.to_vec());
    }

    fn set_title(&self, title: &str) {
        self.titles.borrow_mut().push(title.to_string());
    }

    fn show_error(&self, message: &str, detail: Option<&str>) {
        self.errors
            .borrow_mut()
            .push((message.to_string(), detail.map(str::to_string)));
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl MenuSink for NullSink {
    fn render_menu(&self, _items: &[MenuItem]) {}

    fn set_title(&self, _title: &str) {}

    fn show_error(&self, _message: &str, _detail: Option<&str>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_sink_records() {
        let sink = InMemorySink::new();
        sink.render_menu(&[MenuItem::Separator]);
        sink.set_title(" 0:01:00 - ACME");
        sink.show_error("Error stopping the timer.", Some("{\"code\":500}"));

        assert_eq!(sink.menu_count(), 1);
        assert_eq!(sink.last_title().as_deref(), Some(" 0:01:00 - ACME"));
        assert_eq!(sink.errors().len(), 1);

        sink.clear();
        assert_eq!(sink.menu_count(), 0);
        assert!(sink.titles().is_empty());
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        sink.render_menu(&[MenuItem::Separator]);
        sink.set_title("");
        sink.show_error("nope", None);
    }
}
