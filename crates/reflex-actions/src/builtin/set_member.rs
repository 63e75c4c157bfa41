use reflex_binding::{ComponentMemberPath, Value};
use tracing::warn;

use crate::action::{Action, ActionCore, ActionExt};
use crate::context::ActionContext;

/// Writes a value through a member binding when triggered, then ends.
/// A failed write is logged and the action still ends.
pub struct SetMemberAction {
    core: ActionCore,
    target: ComponentMemberPath,
    value: Value,
}

impl SetMemberAction {
    pub fn new(target: ComponentMemberPath, value: Value) -> Self {
        Self {
            core: ActionCore::new(),
            target,
            value,
        }
    }

    pub fn target(&self) -> &ComponentMemberPath {
        &self.target
    }
}

impl Default for SetMemberAction {
    fn default() -> Self {
        Self::new(ComponentMemberPath::default(), Value::Bool(false))
    }
}

impl Action for SetMemberAction {
    fn kind(&self) -> &'static str {
        "set_member"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, ctx: &ActionContext<'_>) {
        if let Err(e) = self.target.set_value(self.value.clone()) {
            warn!(target: "actions", "{} could not write {}: {}", self.label(), self.target, e);
        }
        self.end(ctx);
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{} = {}", self.target, self.value))
    }
}
