use std::collections::HashMap;

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

/// Remote cursor widgets, one floating label per peer. Created lazily on
/// the first `cursor` message from a peer, removed on `user_disconnected`.
pub struct CursorLayer {
    container: HtmlElement,
    widgets: HashMap<String, HtmlElement>,
}

impl CursorLayer {
    pub fn new(container: HtmlElement) -> Self {
        Self {
            container,
            widgets: HashMap::new(),
        }
    }

    pub fn update(&mut self, document: &Document, id: &str, x: f32, y: f32, color: &str, name: &str) {
        if !self.widgets.contains_key(id) {
            let Some(widget) = make_widget(document, color, name) else {
                return;
            };
            let _ = self.container.append_child(&widget);
            self.widgets.insert(id.to_string(), widget);
        }
        if let Some(widget) = self.widgets.get(id) {
            let style = widget.style();
            let _ = style.set_property("left", &format!("{x}px"));
            let _ = style.set_property("top", &format!("{y}px"));
        }
    }

    pub fn remove(&mut self, id: &str) {
        if let Some(widget) = self.widgets.remove(id) {
            widget.remove();
        }
    }
}

fn make_widget(document: &Document, color: &str, name: &str) -> Option<HtmlElement> {
    let widget = document
        .create_element("div")
        .ok()?
        .dyn_into::<HtmlElement>()
        .ok()?;
    widget.set_class_name("cursor");
    let _ = widget.style().set_property("background-color", color);
    if let Ok(label) = document.create_element("span") {
        label.set_class_name("cursor-label");
        label.set_text_content(Some(name));
        let _ = widget.append_child(&label);
    }
    Some(widget)
}
