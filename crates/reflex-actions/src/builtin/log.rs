use tracing::info;

use crate::action::{Action, ActionCore, ActionExt};
use crate::context::ActionContext;

/// Emits one log line when triggered, then ends
#[derive(Default)]
pub struct LogAction {
    core: ActionCore,
    message: String,
}

impl LogAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            core: ActionCore::new(),
            message: message.into(),
        }
    }
}

impl Action for LogAction {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, ctx: &ActionContext<'_>) {
        match ctx.event {
            Some(record) => info!(target: "actions", event = %record.event(), "{}", self.message),
            None => info!(target: "actions", "{}", self.message),
        }
        self.end(ctx);
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{:?}", self.message))
    }
}
