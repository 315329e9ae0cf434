use crate::application::ports::EntityHandler;
use crate::domain::value_objects::EntityKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Remote handlers keyed by the entity kind they serve.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EntityKind, Arc<dyn EntityHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any handler previously registered for the same kind.
    pub fn register(&mut self, handler: Arc<dyn EntityHandler>) -> &mut Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    pub fn with(mut self, handler: Arc<dyn EntityHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, kind: &EntityKind) -> Option<Arc<dyn EntityHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = self.handlers.keys().cloned().collect();
        kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
