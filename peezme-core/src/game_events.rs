use std::sync::Arc;

use peezme_types::PeezMeEvent;
use tracing::trace;

/// Receives every published event. Handlers are shared across tasks, so
/// any state they keep needs interior mutability.
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: &PeezMeEvent);
}

/// Fan-out of ticket and game deltas to the registered handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&self, event: PeezMeEvent) {
        trace!(event = event.type_name(), "Publishing event");
        for handler in &self.handlers {
            handler.handle_event(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
