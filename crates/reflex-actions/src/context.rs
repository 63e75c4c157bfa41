use reflex_binding::{ObjectModel, ObjectRef};
use reflex_events::{EventManager, EventRecord};

/// Everything an action or condition may reach while it runs.
///
/// Built by the owning handler for each lifecycle call; replaces a stored
/// back-reference to the handler.
#[derive(Clone, Copy)]
pub struct ActionContext<'a> {
    pub model: &'a dyn ObjectModel,
    pub events: &'a EventManager,
    /// Object the owning handler is attached to
    pub owner: Option<ObjectRef>,
    /// Event that triggered the current run, if any
    pub event: Option<&'a EventRecord>,
}

impl<'a> ActionContext<'a> {
    pub fn new(model: &'a dyn ObjectModel, events: &'a EventManager) -> Self {
        Self {
            model,
            events,
            owner: None,
            event: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<ObjectRef>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_event(mut self, event: Option<&'a EventRecord>) -> Self {
        self.event = event;
        self
    }
}
