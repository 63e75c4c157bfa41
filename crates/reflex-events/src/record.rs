use reflex_binding::ObjectRef;

use crate::identity::EventId;

/// A single posted event, created fresh for every post
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    event: EventId,
    related: Option<ObjectRef>,
}

impl EventRecord {
    pub fn new(event: EventId) -> Self {
        Self {
            event,
            related: None,
        }
    }

    pub fn with_related(mut self, object: ObjectRef) -> Self {
        self.related = Some(object);
        self
    }

    /// Identity that triggered the dispatch
    pub fn event(&self) -> &EventId {
        &self.event
    }

    /// Object the poster associated with this event, if any
    pub fn related(&self) -> Option<ObjectRef> {
        self.related
    }
}
