use tracing::debug;

use crate::action::{Action, ActionCore, ActionExt};
use crate::condition::Condition;
use crate::context::ActionContext;

/// Runs its child only when the condition holds at trigger time.
///
/// Ends at once when the condition is false or either part is missing; otherwise
/// ends on the update after the child has ended.
#[derive(Default)]
pub struct ConditionalAction {
    core: ActionCore,
    condition: Option<Box<dyn Condition>>,
    action: Option<Box<dyn Action>>,
}

impl ConditionalAction {
    pub fn new(condition: Box<dyn Condition>, action: Box<dyn Action>) -> Self {
        Self {
            core: ActionCore::new(),
            condition: Some(condition),
            action: Some(action),
        }
    }
}

impl Action for ConditionalAction {
    fn kind(&self) -> &'static str {
        "conditional"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, ctx: &ActionContext<'_>) {
        let passed = self
            .condition
            .as_ref()
            .map_or(false, |condition| condition.evaluate(ctx));

        if passed {
            if let Some(action) = self.action.as_mut() {
                action.stop(ctx);
                action.trigger(ctx);
                return;
            }
        }

        debug!(target: "actions", "{} skipped, condition not met", self.label());
        self.end(ctx);
    }

    fn on_update(&mut self, ctx: &ActionContext<'_>) {
        let child_done = self.action.as_ref().map_or(true, |a| a.has_ended());
        if child_done {
            self.end(ctx);
        } else if let Some(action) = self.action.as_mut() {
            action.update(ctx);
        }
    }

    fn on_interrupt(&mut self, ctx: &ActionContext<'_>) {
        if let Some(action) = self.action.as_mut() {
            action.stop(ctx);
        }
    }

    fn children(&self) -> &[Box<dyn Action>] {
        self.action.as_slice()
    }

    fn children_mut(&mut self) -> &mut [Box<dyn Action>] {
        self.action.as_mut_slice()
    }

    fn detail(&self) -> Option<String> {
        Some(match &self.condition {
            Some(condition) => format!("if {}", condition.describe()),
            None => "if <missing>".to_string(),
        })
    }
}
