use crate::app::AppContext;
use crate::input::Event;
use crate::time::Timestep;

/// Identifier of a layer within a [LayerStack].
pub type LayerId = u64;

/// # Layer
///
/// Unit of per-frame work composed into a [LayerStack]. Every hook has an empty default.
pub trait Layer {
    /// Returns the layer name, used in logs.
    fn name(&self) -> &str {
        "Layer"
    }

    /// Called when the layer is pushed onto a stack.
    fn on_attach(&mut self) {}

    /// Called when the layer is popped from a stack or the stack is dropped.
    fn on_detach(&mut self) {}

    /// Called once per frame, bottom to top.
    fn on_update(&mut self, _ctx: &mut AppContext, _timestep: Timestep) {}

    /// Called once per frame inside the UI frame, bottom to top.
    fn on_ui_render(&mut self, _ctx: &mut AppContext) {}

    /// Called for each event, top to bottom, until a layer sets [Event::handled].
    fn on_event(&mut self, _ctx: &mut AppContext, _event: &mut Event) {}
}

/// # Layer Stack
///
/// Ordered layers followed by overlays. Overlays always stay above regular layers.
///
/// The stack owns its layers. A layer is attached when it is pushed and detached exactly once,
/// either when it is popped or when the stack is cleared or dropped.
pub struct LayerStack {
    layers: Vec<(LayerId, Box<dyn Layer>)>,
    layer_insert_index: usize,
    next_id: LayerId,
}

impl LayerStack {
    /// Returns an empty stack.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            layer_insert_index: 0,
            next_id: 0,
        }
    }

    /// Inserts the layer above the other regular layers and below every overlay, then attaches it.
    pub fn push_layer(&mut self, layer: Box<dyn Layer>) -> LayerId {
        let id = self.allocate_id();
        self.layers.insert(self.layer_insert_index, (id, layer));
        self.layer_insert_index += 1;
        self.layers[self.layer_insert_index - 1].1.on_attach();
        id
    }

    /// Inserts the overlay at the top of the stack, then attaches it.
    pub fn push_overlay(&mut self, overlay: Box<dyn Layer>) -> LayerId {
        let id = self.allocate_id();
        self.layers.push((id, overlay));
        if let Some((_, overlay)) = self.layers.last_mut() {
            overlay.on_attach();
        }
        id
    }

    /// Detaches and returns the regular layer with the given id.
    pub fn pop_layer(&mut self, id: LayerId) -> Option<Box<dyn Layer>> {
        let index = self.layers[..self.layer_insert_index]
            .iter()
            .position(|(layer_id, _)| *layer_id == id)?;
        let (_, mut layer) = self.layers.remove(index);
        self.layer_insert_index -= 1;
        layer.on_detach();
        Some(layer)
    }

    /// Detaches and returns the overlay with the given id.
    pub fn pop_overlay(&mut self, id: LayerId) -> Option<Box<dyn Layer>> {
        let index = self.layers[self.layer_insert_index..]
            .iter()
            .position(|(layer_id, _)| *layer_id == id)?
            + self.layer_insert_index;
        let (_, mut overlay) = self.layers.remove(index);
        overlay.on_detach();
        Some(overlay)
    }

    /// Returns the number of layers and overlays.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the stack holds nothing.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the layer names from bottom to top.
    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|(_, layer)| layer.name()).collect()
    }

    /// Updates every layer from bottom to top.
    pub fn update(&mut self, ctx: &mut AppContext, timestep: Timestep) {
        for (_, layer) in &mut self.layers {
            layer.on_update(ctx, timestep);
        }
    }

    /// Calls every layer's UI hook from bottom to top.
    pub fn ui_render(&mut self, ctx: &mut AppContext) {
        for (_, layer) in &mut self.layers {
            layer.on_ui_render(ctx);
        }
    }

    /// Dispatches the event from top to bottom, stopping at the first layer that handles it.
    pub fn dispatch_event(&mut self, ctx: &mut AppContext, event: &mut Event) {
        for (_, layer) in self.layers.iter_mut().rev() {
            if event.handled {
                break;
            }
            layer.on_event(ctx, event);
        }
    }

    /// Detaches and drops every layer from top to bottom.
    pub fn clear(&mut self) {
        while let Some((_, mut layer)) = self.layers.pop() {
            log::debug!("Detaching layer {}", layer.name());
            layer.on_detach();
        }
        self.layer_insert_index = 0;
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LayerStack {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::input::EventKind;

    type Log = Rc<RefCell<Vec<String>>>;

    struct RecordingLayer {
        name: &'static str,
        log: Log,
        handles: bool,
    }

    impl RecordingLayer {
        fn boxed(name: &'static str, log: &Log, handles: bool) -> Box<dyn Layer> {
            Box::new(Self {
                name,
                log: log.clone(),
                handles,
            })
        }

        fn record(&self, hook: &str) {
            self.log.borrow_mut().push(format!("{}:{hook}", self.name));
        }
    }

    impl Layer for RecordingLayer {
        fn name(&self) -> &str {
            self.name
        }

        fn on_attach(&mut self) {
            self.record("attach");
        }

        fn on_detach(&mut self) {
            self.record("detach");
        }

        fn on_update(&mut self, _ctx: &mut AppContext, _timestep: Timestep) {
            self.record("update");
        }

        fn on_ui_render(&mut self, _ctx: &mut AppContext) {
            self.record("ui");
        }

        fn on_event(&mut self, _ctx: &mut AppContext, event: &mut Event) {
            self.record("event");
            event.handled = self.handles;
        }
    }

    fn entries(log: &Log, hook: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|entry| entry.ends_with(hook))
            .cloned()
            .collect()
    }

    fn build(log: &Log, b_handles: bool) -> LayerStack {
        let mut stack = LayerStack::new();
        stack.push_layer(RecordingLayer::boxed("A", log, false));
        stack.push_overlay(RecordingLayer::boxed("C", log, false));
        stack.push_layer(RecordingLayer::boxed("B", log, b_handles));
        stack
    }

    #[test]
    fn push_overlay_stays_above_layers_pushed_later() {
        let log = Log::default();

        let stack = build(&log, false);

        assert_eq!(stack.names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn push_layer_attaches_immediately() {
        let log = Log::default();

        let _stack = build(&log, false);

        assert_eq!(entries(&log, "attach"), vec!["A:attach", "C:attach", "B:attach"]);
    }

    #[test]
    fn dispatch_event_visits_top_to_bottom() {
        let log = Log::default();
        let mut stack = build(&log, false);
        let mut ctx = AppContext::headless();
        let mut event = Event::new(EventKind::WindowFocus(true));

        stack.dispatch_event(&mut ctx, &mut event);

        assert_eq!(
            entries(&log, "event"),
            vec!["C:event", "B:event", "A:event"]
        );
        assert!(!event.handled);
    }

    #[test]
    fn dispatch_event_stops_at_handling_layer() {
        let log = Log::default();
        let mut stack = build(&log, true);
        let mut ctx = AppContext::headless();
        let mut event = Event::new(EventKind::WindowFocus(true));

        stack.dispatch_event(&mut ctx, &mut event);

        assert_eq!(entries(&log, "event"), vec!["C:event", "B:event"]);
        assert!(event.handled);
    }

    #[test]
    fn update_visits_bottom_to_top() {
        let log = Log::default();
        let mut stack = build(&log, false);
        let mut ctx = AppContext::headless();

        stack.update(&mut ctx, Timestep::from_seconds(0.016));
        stack.ui_render(&mut ctx);

        assert_eq!(
            entries(&log, "update"),
            vec!["A:update", "B:update", "C:update"]
        );
        assert_eq!(entries(&log, "ui"), vec!["A:ui", "B:ui", "C:ui"]);
    }

    #[test]
    fn pop_layer_detaches_and_returns_layer() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        let id = stack.push_layer(RecordingLayer::boxed("A", &log, false));
        stack.push_overlay(RecordingLayer::boxed("C", &log, false));

        let layer = stack.pop_layer(id);

        assert_eq!(layer.map(|layer| layer.name().to_string()), Some("A".to_string()));
        assert_eq!(entries(&log, "detach"), vec!["A:detach"]);
        assert_eq!(stack.names(), vec!["C"]);
    }

    #[test]
    fn pop_layer_with_overlay_id_returns_none() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        stack.push_layer(RecordingLayer::boxed("A", &log, false));
        let overlay = stack.push_overlay(RecordingLayer::boxed("C", &log, false));

        assert!(stack.pop_layer(overlay).is_none());
        assert!(stack.pop_overlay(overlay).is_some());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn push_layer_after_pop_overlay_keeps_order() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        let a = stack.push_layer(RecordingLayer::boxed("A", &log, false));
        stack.push_overlay(RecordingLayer::boxed("C", &log, false));
        stack.pop_layer(a);

        stack.push_layer(RecordingLayer::boxed("B", &log, false));

        assert_eq!(stack.names(), vec!["B", "C"]);
    }

    #[test]
    fn drop_detaches_top_to_bottom_once() {
        let log = Log::default();
        let stack = build(&log, false);

        drop(stack);

        assert_eq!(
            entries(&log, "detach"),
            vec!["C:detach", "B:detach", "A:detach"]
        );
    }
}
