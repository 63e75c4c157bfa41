use crate::action::{Action, ActionCore};
use crate::error::ActionError;

/// Ordered group of child actions with no execution semantics of its own.
///
/// Owner propagation, validation, snapshots and `describe` reach the children
/// through [`Action::children`]; specialised composites such as
/// [`SequenceAction`](crate::sequence::SequenceAction) add the scheduling.
#[derive(Default)]
pub struct CompoundAction {
    core: ActionCore,
    actions: Vec<Box<dyn Action>>,
}

impl CompoundAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(actions: Vec<Box<dyn Action>>) -> Self {
        Self {
            core: ActionCore::new(),
            actions,
        }
    }

    pub fn push(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn child(&self, index: usize) -> &dyn Action {
        assert!(
            index < self.actions.len(),
            "child index {index} out of range for compound with {} children",
            self.actions.len()
        );
        &*self.actions[index]
    }
}

impl Action for CompoundAction {
    fn kind(&self) -> &'static str {
        "compound"
    }

    fn core(&self) -> &ActionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ActionCore {
        &mut self.core
    }

    fn children(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    fn children_mut(&mut self) -> &mut [Box<dyn Action>] {
        &mut self.actions
    }

    fn push_child(&mut self, child: Box<dyn Action>) -> Result<(), ActionError> {
        self.actions.push(child);
        Ok(())
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{} children", self.actions.len()))
    }
}

#[cfg(test)]
mod tests {
    use reflex_binding::ObjectRef;

    use super::*;
    use crate::action::testing::{journal, Scripted};
    use crate::action::ActionExt;

    #[test]
    fn test_owner_propagates_to_children() {
        let log = journal();
        let mut inner = CompoundAction::new();
        inner.push(Scripted::boxed("b", 1, &log));
        let mut outer = CompoundAction::with_actions(vec![Scripted::boxed("a", 1, &log)]);
        outer.push(Box::new(inner));

        outer.set_owner(Some(ObjectRef::new(4)));

        let snapshot = outer.snapshot();
        assert_eq!(snapshot.children.len(), 2);
        assert_eq!(outer.child(0).core().owner(), Some(ObjectRef::new(4)));
        assert_eq!(outer.child(1).children()[0].core().owner(), Some(ObjectRef::new(4)));
    }

    #[test]
    fn test_describe_walks_children() {
        let log = journal();
        let outer = CompoundAction::with_actions(vec![
            Scripted::boxed("first", 1, &log),
            Scripted::boxed("second", 1, &log),
        ]);

        let mut lines = Vec::new();
        outer.describe(0, &mut lines);
        assert_eq!(
            lines,
            vec![
                "compound [Idle]: 2 children",
                "  first [Idle]",
                "  second [Idle]",
            ]
        );
    }

    #[test]
    fn test_push_child_only_on_composites() {
        let log = journal();
        let mut group: Box<dyn Action> = Box::new(CompoundAction::new());
        group.push_child(Scripted::boxed("a", 1, &log)).unwrap();
        assert_eq!(group.children().len(), 1);

        let mut leaf = Scripted::boxed("b", 1, &log);
        assert_eq!(
            leaf.push_child(Scripted::boxed("c", 1, &log)),
            Err(ActionError::NotComposite {
                kind: "scripted".to_string()
            })
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_child_out_of_range_panics() {
        CompoundAction::new().child(0);
    }
}
