use reflex_binding::ObjectRef;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::trace;

use crate::context::ActionContext;
use crate::error::ActionError;
use crate::snapshot::ActionSnapshot;

/// Lifecycle state of an action instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum ActionState {
    #[default]
    Idle,
    Running,
    Terminated,
}

/// State shared by every action: lifecycle, owning object and an authoring label
#[derive(Debug, Clone, Default)]
pub struct ActionCore {
    state: ActionState,
    owner: Option<ObjectRef>,
    label: Option<String>,
}

impl ActionCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn owner(&self) -> Option<ObjectRef> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<ObjectRef>) {
        self.owner = owner;
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub(crate) fn set_state(&mut self, state: ActionState) {
        self.state = state;
    }
}

/// A resumable unit of triggered behavior.
///
/// Implementors provide the `on_*` hooks; the lifecycle itself (`trigger`,
/// `update`, `stop`, `end`) lives in [`ActionExt`] and can not be overridden.
/// Composite actions expose their children through `children`/`children_mut`,
/// which is enough for owner propagation, validation, snapshots and `describe`
/// to reach the whole tree.
pub trait Action {
    /// Stable kind id, as used by the action registry
    fn kind(&self) -> &'static str;

    fn core(&self) -> &ActionCore;

    fn core_mut(&mut self) -> &mut ActionCore;

    fn on_trigger(&mut self, _ctx: &ActionContext<'_>) {}

    fn on_update(&mut self, _ctx: &ActionContext<'_>) {}

    /// Interruption is advisory: the action decides whether and when to end
    fn on_interrupt(&mut self, _ctx: &ActionContext<'_>) {}

    fn on_terminate(&mut self, _ctx: &ActionContext<'_>) {}

    fn children(&self) -> &[Box<dyn Action>] {
        &[]
    }

    fn children_mut(&mut self) -> &mut [Box<dyn Action>] {
        &mut []
    }

    /// Append a child to a composite. Leaf kinds refuse.
    fn push_child(&mut self, _child: Box<dyn Action>) -> Result<(), ActionError> {
        Err(ActionError::NotComposite {
            kind: self.kind().to_string(),
        })
    }

    fn set_owner(&mut self, owner: Option<ObjectRef>) {
        self.core_mut().set_owner(owner);
        for child in self.children_mut() {
            child.set_owner(owner);
        }
    }

    /// Authoring-time checks, run before a handler registers
    fn validate(&self) -> Result<(), ActionError> {
        self.children().iter().try_for_each(|child| child.validate())
    }

    /// Kind-specific counter persisted in snapshots (cursor, elapsed steps, ...)
    fn progress(&self) -> u32 {
        0
    }

    fn set_progress(&mut self, _progress: u32) {}

    /// Reject a persisted counter this action could not resume from
    fn validate_progress(&self, _state: ActionState, _progress: u32) -> Result<(), ActionError> {
        Ok(())
    }

    /// One-line description of the configuration, shown by `describe`
    fn detail(&self) -> Option<String> {
        None
    }

    /// Render this action and its children, one line each, indented by depth
    fn describe(&self, depth: usize, out: &mut Vec<String>) {
        let mut line = format!(
            "{:indent$}{} [{}]",
            "",
            self.core().label().unwrap_or(self.kind()),
            self.core().state(),
            indent = depth * 2
        );
        if let Some(detail) = self.detail() {
            line.push_str(": ");
            line.push_str(&detail);
        }
        out.push(line);

        for child in self.children() {
            child.describe(depth + 1, out);
        }
    }
}

/// Lifecycle operations available on every [`Action`]
pub trait ActionExt: Action {
    fn state(&self) -> ActionState {
        self.core().state()
    }

    fn is_running(&self) -> bool {
        self.state() == ActionState::Running
    }

    fn has_ended(&self) -> bool {
        self.state() == ActionState::Terminated
    }

    fn has_started(&self) -> bool {
        self.state() != ActionState::Idle
    }

    fn label(&self) -> &str {
        self.core().label().unwrap_or(self.kind())
    }

    /// Enter `Running` (from any state) and run the trigger hook
    fn trigger(&mut self, ctx: &ActionContext<'_>) {
        trace!(target: "actions", "Trigger {}", self.label());
        self.core_mut().set_state(ActionState::Running);
        self.on_trigger(ctx);
    }

    /// Advance one step. No-op once terminated.
    ///
    /// # Panics
    ///
    /// Panics if the action was never triggered.
    fn update(&mut self, ctx: &ActionContext<'_>) {
        assert!(
            self.has_started(),
            "update called on action {} before it was triggered",
            self.label()
        );
        if self.has_ended() {
            return;
        }
        self.on_update(ctx);
    }

    /// Ask a running action to stop. Does not end it.
    fn stop(&mut self, ctx: &ActionContext<'_>) {
        if self.is_running() {
            trace!(target: "actions", "Interrupt {}", self.label());
            self.on_interrupt(ctx);
        }
    }

    /// Move a running action to `Terminated` and run the terminate hook.
    /// Called by the action's own logic.
    fn end(&mut self, ctx: &ActionContext<'_>) {
        if !self.is_running() {
            trace!(target: "actions", "Ignoring end of {} in state {}", self.label(), self.state());
            return;
        }
        trace!(target: "actions", "End {}", self.label());
        self.core_mut().set_state(ActionState::Terminated);
        self.on_terminate(ctx);
    }

    fn snapshot(&self) -> ActionSnapshot {
        ActionSnapshot {
            kind: self.kind().to_string(),
            label: self.core().label().map(str::to_string),
            state: self.state(),
            progress: self.progress(),
            children: self.children().iter().map(|c| c.snapshot()).collect(),
        }
    }

    /// Restore lifecycle state onto an already-built tree of the same shape.
    /// Nothing is changed when the shapes differ.
    fn restore(&mut self, snapshot: &ActionSnapshot) -> Result<(), ActionError> {
        check_shape(self.as_dyn(), snapshot)?;
        apply_snapshot(self.as_dyn_mut(), snapshot);
        Ok(())
    }

    #[doc(hidden)]
    fn as_dyn(&self) -> &dyn Action;

    #[doc(hidden)]
    fn as_dyn_mut(&mut self) -> &mut dyn Action;
}

impl<T: Action> ActionExt for T {
    fn as_dyn(&self) -> &dyn Action {
        self
    }

    fn as_dyn_mut(&mut self) -> &mut dyn Action {
        self
    }
}

impl<'a> ActionExt for dyn Action + 'a {
    fn as_dyn(&self) -> &dyn Action {
        self
    }

    fn as_dyn_mut(&mut self) -> &mut dyn Action {
        self
    }
}

fn check_shape(action: &dyn Action, snapshot: &ActionSnapshot) -> Result<(), ActionError> {
    if action.kind() != snapshot.kind {
        return Err(ActionError::SnapshotMismatch {
            expected: action.kind().to_string(),
            found: snapshot.kind.clone(),
        });
    }
    if action.children().len() != snapshot.children.len() {
        return Err(ActionError::SnapshotMismatch {
            expected: format!("{} with {} children", action.kind(), action.children().len()),
            found: format!("{} with {} children", snapshot.kind, snapshot.children.len()),
        });
    }
    action.validate_progress(snapshot.state, snapshot.progress)?;
    action
        .children()
        .iter()
        .zip(&snapshot.children)
        .try_for_each(|(child, snap)| check_shape(&**child, snap))
}

fn apply_snapshot(action: &mut dyn Action, snapshot: &ActionSnapshot) {
    action.core_mut().set_state(snapshot.state);
    action.core_mut().set_label(snapshot.label.clone());
    action.set_progress(snapshot.progress);
    for (child, snap) in action.children_mut().iter_mut().zip(&snapshot.children) {
        apply_snapshot(&mut **child, snap);
    }
}
