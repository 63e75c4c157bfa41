use reflex_events::EventId;
use tracing::debug;

use crate::action::{Action, ActionCore, ActionExt};
use crate::context::ActionContext;
use crate::error::ActionError;

/// Posts an event when triggered, then ends.
///
/// The handler's owner travels with the record as its related object.
#[derive(Default)]
pub struct PostEventAction {
    core: ActionCore,
    event: EventId,
}

impl PostEventAction {
    pub fn new(event: EventId) -> Self {
        Self {
            core: ActionCore::new(),
            event,
        }
    }

    pub fn event(&self) -> &EventId {
        &self.event
    }
}

impl Action for PostEventAction {
    fn kind(&self) -> &'static str {
        "post_event"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, ctx: &ActionContext<'_>) {
        let delivered = ctx.events.post_with(&self.event, ctx.owner);
        debug!(target: "actions", "Posted {} to {} listener(s)", self.event, delivered);
        self.end(ctx);
    }

    fn validate(&self) -> Result<(), ActionError> {
        if !self.event.is_valid() {
            return Err(ActionError::InvalidPostEvent {
                label: self.label().to_string(),
                event: self.event.clone(),
            });
        }
        Ok(())
    }

    fn detail(&self) -> Option<String> {
        Some(self.event.to_string())
    }
}
