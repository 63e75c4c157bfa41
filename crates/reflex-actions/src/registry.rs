use std::collections::HashMap;

use tracing::{debug, warn};

use crate::action::Action;
use crate::builtin::{
    AnimateFloatAction, ConditionalAction, LogAction, PostEventAction, SetMemberAction, WaitAction,
};
use crate::compound::CompoundAction;
use crate::sequence::SequenceAction;

/// Factory function type for creating action instances
pub type ActionFactory = fn() -> Box<dyn Action>;

struct Entry {
    factory: ActionFactory,
    hidden: bool,
}

/// Macro to register multiple action kinds at once, keyed by their `kind()`
///
/// # Example
/// ```ignore
/// let mut registry = ActionRegistry::new();
/// register_actions!(registry, WaitAction, LogAction);
/// ```
#[macro_export]
macro_rules! register_actions {
    ($registry:expr, $($action:ty),+ $(,)?) => {
        $(
            $registry.register(
                <$action as $crate::action::Action>::kind(&<$action>::default()),
                || Box::new(<$action>::default()),
            );
        )+
    };
}

/// Registry of available action kinds
pub struct ActionRegistry {
    factories: HashMap<String, Entry>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in kind
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_actions!(
            registry,
            SequenceAction,
            WaitAction,
            SetMemberAction,
            AnimateFloatAction,
            LogAction,
            PostEventAction,
            ConditionalAction,
        );
        // compounds have no behavior of their own, so they are not offered directly
        registry.register_hidden("compound", || Box::new(CompoundAction::new()));
        registry
    }

    /// Register a kind that shows up in listings
    pub fn register(&mut self, id: impl Into<String>, factory: ActionFactory) {
        self.insert(id.into(), factory, false);
    }

    /// Register a kind that can be created by id but is left out of listings
    pub fn register_hidden(&mut self, id: impl Into<String>, factory: ActionFactory) {
        self.insert(id.into(), factory, true);
    }

    fn insert(&mut self, id: String, factory: ActionFactory, hidden: bool) {
        debug!(target: "actions", "Registering action factory: {}", id);
        if self.factories.insert(id.clone(), Entry { factory, hidden }).is_some() {
            warn!(target: "actions", "Replaced existing action factory: {}", id);
        }
    }

    /// Create a fresh, idle instance of a kind
    pub fn create(&self, kind: &str) -> Option<Box<dyn Action>> {
        match self.factories.get(kind) {
            Some(entry) => Some((entry.factory)()),
            None => {
                warn!(target: "actions", "Unknown action kind: {}", kind);
                None
            }
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Visible kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .factories
            .iter()
            .filter(|(_, entry)| !entry.hidden)
            .map(|(id, _)| id.clone())
            .collect();
        kinds.sort();
        kinds
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionExt, ActionState};

    #[test]
    fn test_builtin_kinds() {
        let registry = ActionRegistry::with_builtin();
        assert_eq!(
            registry.kinds(),
            vec![
                "animate_float",
                "conditional",
                "log",
                "post_event",
                "sequence",
                "set_member",
                "wait",
            ]
        );
        assert!(registry.contains("compound"));
    }

    #[test]
    fn test_create_returns_idle_instance_of_kind() {
        let registry = ActionRegistry::with_builtin();
        let action = registry.create("wait").unwrap();
        assert_eq!(action.kind(), "wait");
        assert_eq!(action.state(), ActionState::Idle);

        assert_eq!(registry.create("compound").unwrap().kind(), "compound");
        assert!(registry.create("teleport").is_none());
    }
}
