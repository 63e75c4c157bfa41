use tracing::{error, trace};

use crate::action::{Action, ActionCore, ActionExt, ActionState};
use crate::compound::CompoundAction;
use crate::context::ActionContext;
use crate::error::ActionError;

/// Runs its children one at a time, in order.
///
/// The sequence ends on the update after its last child has ended, so a sequence
/// of N children never finishes in the same step as its final child.
#[derive(Default)]
pub struct SequenceAction {
    core: ActionCore,
    group: CompoundAction,
    cursor: usize,
}

impl SequenceAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(actions: Vec<Box<dyn Action>>) -> Self {
        Self {
            core: ActionCore::new(),
            group: CompoundAction::with_actions(actions),
            cursor: 0,
        }
    }

    pub fn push(&mut self, action: Box<dyn Action>) {
        self.group.push(action);
    }

    pub fn len(&self) -> usize {
        self.group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// Index of the child currently scheduled
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn child(&self, index: usize) -> &dyn Action {
        self.group.child(index)
    }
}

impl Action for SequenceAction {
    fn kind(&self) -> &'static str {
        "sequence"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn on_trigger(&mut self, ctx: &ActionContext<'_>) {
        if let Some(current) = self.group.children_mut().get_mut(self.cursor) {
            current.stop(ctx);
        }
        self.cursor = 0;

        match self.group.children_mut().first_mut() {
            Some(first) => first.trigger(ctx),
            None => {
                error!(target: "actions", "Sequence {} triggered with no children", self.label());
                self.end(ctx);
            }
        }
    }

    fn on_update(&mut self, ctx: &ActionContext<'_>) {
        if self.has_ended() || self.cursor >= self.group.len() {
            return;
        }

        let current = &mut self.group.children_mut()[self.cursor];
        if !current.has_ended() {
            current.update(ctx);
            return;
        }

        self.cursor += 1;
        match self.group.children_mut().get_mut(self.cursor) {
            Some(next) => {
                trace!(target: "actions", "Sequence {} advancing to child {}", self.core.label().unwrap_or("sequence"), self.cursor);
                next.trigger(ctx);
            }
            None => self.end(ctx),
        }
    }

    fn on_interrupt(&mut self, ctx: &ActionContext<'_>) {
        if let Some(current) = self.group.children_mut().get_mut(self.cursor) {
            if current.is_running() {
                current.stop(ctx);
            }
        }
    }

    fn children(&self) -> &[Box<dyn Action>] {
        self.group.children()
    }

    fn children_mut(&mut self) -> &mut [Box<dyn Action>] {
        self.group.children_mut()
    }

    fn push_child(&mut self, child: Box<dyn Action>) -> Result<(), ActionError> {
        self.group.push_child(child)
    }

    fn validate(&self) -> Result<(), ActionError> {
        if self.group.is_empty() {
            return Err(ActionError::EmptySequence {
                label: self.label().to_string(),
            });
        }
        self.group.validate()
    }

    fn progress(&self) -> u32 {
        self.cursor as u32
    }

    fn set_progress(&mut self, progress: u32) {
        self.cursor = progress as usize;
    }

    /// A running sequence must point at a child; an ended one may sit one past the last
    fn validate_progress(&self, state: ActionState, progress: u32) -> Result<(), ActionError> {
        let len = self.group.len();
        let valid = match state {
            ActionState::Running => (progress as usize) < len,
            ActionState::Idle | ActionState::Terminated => progress as usize <= len,
        };
        if valid {
            Ok(())
        } else {
            Err(ActionError::SnapshotMismatch {
                expected: format!("{} cursor within {len} children in state {state}", self.kind()),
                found: format!("cursor {progress}"),
            })
        }
    }

    fn detail(&self) -> Option<String> {
        Some(format!("step {}/{}", self.cursor + 1, self.group.len()))
    }
}
