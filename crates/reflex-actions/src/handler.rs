use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use reflex_binding::{ObjectModel, ObjectRef};
use reflex_events::{EventId, EventManager, EventRecord, ListenerId};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, error, info, trace, warn};

use crate::action::{Action, ActionExt};
use crate::context::ActionContext;
use crate::error::ActionError;
use crate::snapshot::HandlerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerPolicy(u8);

bitflags! {
    impl TriggerPolicy: u8 {
        /// Stop accepting triggers once `max_trigger_count` is reached
        const FIXED_COUNT = 0x01;
        /// Refuse triggers while the root action is running
        const LOCK_UNTIL_COMPLETION = 0x02;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum HandlerState {
    #[default]
    None,
    Running,
    Sleeping,
    Terminated,
}

pub type SharedHandler = Rc<RefCell<EventHandler>>;

/// Binds one event identity to one root action.
///
/// The handler owns its trigger counter and state; both only change from its own
/// dispatch path (`on_event`) and its per-step `tick`.
pub struct EventHandler {
    name: String,
    event: EventId,
    action: Option<Box<dyn Action>>,
    policy: TriggerPolicy,
    max_trigger_count: u32,
    trigger_count: u32,
    state: HandlerState,
    current_event: Option<EventRecord>,
    owner: Option<ObjectRef>,
    listener: Option<ListenerId>,
    model: Rc<dyn ObjectModel>,
}

impl EventHandler {
    pub fn new(name: impl Into<String>, event: EventId, model: Rc<dyn ObjectModel>) -> Self {
        Self {
            name: name.into(),
            event,
            action: None,
            policy: TriggerPolicy::empty(),
            max_trigger_count: 1,
            trigger_count: 0,
            state: HandlerState::None,
            current_event: None,
            owner: None,
            listener: None,
            model,
        }
    }

    pub fn with_action(mut self, action: Box<dyn Action>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_trigger_count(mut self, max: u32) -> Self {
        self.max_trigger_count = max;
        self
    }

    pub fn with_owner(mut self, owner: ObjectRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn into_shared(self) -> SharedHandler {
        Rc::new(RefCell::new(self))
    }

    // ===== Accessors =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event(&self) -> &EventId {
        &self.event
    }

    pub fn action(&self) -> Option<&dyn Action> {
        self.action.as_deref()
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn max_trigger_count(&self) -> u32 {
        self.max_trigger_count
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn owner(&self) -> Option<ObjectRef> {
        self.owner
    }

    /// Record of the event behind the current run; cleared when the run completes
    pub fn current_event(&self) -> Option<&EventRecord> {
        self.current_event.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.listener.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.state == HandlerState::Running
    }

    // ===== Registration =====

    /// Validate the handler and register it on the bus.
    ///
    /// The bus only holds a weak reference, so dropping the last
    /// [`SharedHandler`] silently disables the callback.
    pub fn init(handler: &SharedHandler, events: &EventManager) -> Result<(), ActionError> {
        let mut this = handler.borrow_mut();
        if this.listener.is_some() {
            return Err(ActionError::AlreadyRegistered {
                handler: this.name.clone(),
            });
        }

        if !this.event.is_valid() {
            error!(target: "handler", "Handler {} is bound to invalid event {}", this.name, this.event);
            return Err(ActionError::InvalidEvent {
                handler: this.name.clone(),
                event: this.event.clone(),
            });
        }

        let owner = this.owner;
        let name = this.name.clone();
        let Some(action) = this.action.as_mut() else {
            error!(target: "handler", "Handler {} has no action", name);
            return Err(ActionError::MissingAction { handler: name });
        };
        action.validate().inspect_err(|e| {
            error!(target: "handler", "Handler {} failed validation: {}", name, e);
        })?;
        action.set_owner(owner);

        let weak: Weak<RefCell<EventHandler>> = Rc::downgrade(handler);
        let listener = events.register(this.event.id(), move |events, record| {
            let Some(handler) = weak.upgrade() else {
                return;
            };
            let borrowed = handler.try_borrow_mut();
            match borrowed {
                Ok(mut handler) => {
                    handler.on_event(events, record);
                }
                Err(_) => {
                    warn!(target: "handler", "Refusing re-entrant {} on a handler that is already busy", record.event());
                }
            }
        })?;

        this.listener = Some(listener);
        debug!(target: "handler", "Handler {} listening for {}", this.name, this.event);
        Ok(())
    }

    /// Unregister from the bus. The action is left as it is.
    pub fn teardown(&mut self, events: &EventManager) {
        if let Some(listener) = self.listener.take() {
            if let Err(e) = events.unregister(self.event.id(), listener) {
                warn!(target: "handler", "Handler {} failed to unregister: {}", self.name, e);
            }
        }
    }

    // ===== Dispatch =====

    pub fn has_reached_max_trigger_count(&self) -> bool {
        self.policy.contains(TriggerPolicy::FIXED_COUNT)
            && self.trigger_count >= self.max_trigger_count
    }

    /// Why a trigger would be refused right now, if it would be.
    /// The count limit is checked before the lock.
    fn refusal(&self) -> Option<&'static str> {
        let Some(action) = self.action.as_ref() else {
            return Some("it has no action");
        };
        if self.has_reached_max_trigger_count() {
            return Some("it reached its trigger limit");
        }
        if self.policy.contains(TriggerPolicy::LOCK_UNTIL_COMPLETION) && action.is_running() {
            return Some("its action is still running");
        }
        None
    }

    pub fn can_trigger(&self) -> bool {
        self.refusal().is_none()
    }

    /// React to a posted record. Returns whether the root action was triggered.
    pub fn on_event(&mut self, events: &EventManager, record: &EventRecord) -> bool {
        if record.event().id() != self.event.id() {
            trace!(target: "handler", "Handler {} ignoring {}", self.name, record.event());
            return false;
        }

        if let Some(reason) = self.refusal() {
            debug!(target: "handler", "Handler {} refused {}: {}", self.name, record.event(), reason);
            if self.has_reached_max_trigger_count() && self.state != HandlerState::Running {
                self.state = HandlerState::Terminated;
            }
            return false;
        }

        self.trigger_count += 1;
        self.state = HandlerState::Running;
        self.current_event = Some(record.clone());
        info!(
            target: "handler",
            "Handler {} triggered by {} ({} so far)",
            self.name,
            record.event(),
            self.trigger_count
        );

        let ctx = ActionContext::new(self.model.as_ref(), events)
            .with_owner(self.owner)
            .with_event(Some(record));
        if let Some(action) = self.action.as_mut() {
            action.trigger(&ctx);
        }
        true
    }

    /// Advance the root action by one step while the handler is running
    pub fn tick(&mut self, events: &EventManager) {
        if self.state != HandlerState::Running {
            return;
        }
        let Some(action) = self.action.as_mut() else {
            return;
        };

        if !action.has_ended() {
            let ctx = ActionContext::new(self.model.as_ref(), events)
                .with_owner(self.owner)
                .with_event(self.current_event.as_ref());
            action.update(&ctx);
        }

        if action.has_ended() {
            self.finish();
        }
    }

    /// Ask the root action to stop
    pub fn interrupt(&mut self, events: &EventManager) {
        if let Some(action) = self.action.as_mut() {
            let ctx = ActionContext::new(self.model.as_ref(), events)
                .with_owner(self.owner)
                .with_event(self.current_event.as_ref());
            action.stop(&ctx);
        }
    }

    fn finish(&mut self) {
        self.current_event = None;
        self.state = if self.has_reached_max_trigger_count() {
            HandlerState::Terminated
        } else {
            HandlerState::Sleeping
        };
        debug!(target: "handler", "Handler {} finished its run, now {}", self.name, self.state);
    }

    // ===== Snapshots =====

    pub fn snapshot(&self) -> HandlerSnapshot {
        HandlerSnapshot {
            name: self.name.clone(),
            policy: self.policy,
            max_trigger_count: self.max_trigger_count,
            trigger_count: self.trigger_count,
            state: self.state,
            event: self.event.clone(),
            action: self.action.as_ref().map(|a| a.snapshot()),
        }
    }

    /// Restore counters and action state onto a handler built from the same definition
    pub fn restore(&mut self, snapshot: &HandlerSnapshot) -> Result<(), ActionError> {
        if snapshot.event.id() != self.event.id() {
            return Err(ActionError::SnapshotMismatch {
                expected: self.event.to_string(),
                found: snapshot.event.to_string(),
            });
        }

        match (self.action.as_mut(), &snapshot.action) {
            (Some(action), Some(stored)) => action.restore(stored)?,
            (None, None) => {}
            (Some(action), None) => {
                return Err(ActionError::SnapshotMismatch {
                    expected: action.kind().to_string(),
                    found: "no action".to_string(),
                })
            }
            (None, Some(stored)) => {
                return Err(ActionError::SnapshotMismatch {
                    expected: "no action".to_string(),
                    found: stored.kind.clone(),
                })
            }
        }

        self.policy = snapshot.policy;
        self.max_trigger_count = snapshot.max_trigger_count;
        self.trigger_count = snapshot.trigger_count;
        self.state = snapshot.state;
        self.current_event = None;
        Ok(())
    }

    /// Summary line followed by the action tree
    pub fn describe(&self, out: &mut Vec<String>) {
        out.push(self.to_string());
        if let Some(action) = self.action.as_ref() {
            action.describe(1, out);
        }
    }
}

impl fmt::Display for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} [{}] triggered {}", self.name, self.event, self.state, self.trigger_count)?;
        if self.policy.contains(TriggerPolicy::FIXED_COUNT) {
            write!(f, "/{}", self.max_trigger_count)?;
        }
        if self.policy.contains(TriggerPolicy::LOCK_UNTIL_COMPLETION) {
            write!(f, " locked")?;
        }
        Ok(())
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("name", &self.name)
            .field("event", &self.event)
            .field("policy", &self.policy)
            .field("trigger_count", &self.trigger_count)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use reflex_binding::DynamicModel;

    use super::*;
    use crate::action::testing::{journal, Scripted};
    use crate::action::ActionState;
    use crate::sequence::SequenceAction;

    fn events() -> EventManager {
        let events = EventManager::new();
        events.registry_mut().insert(EventId::new(7, "Damage")).unwrap();
        events
    }

    fn damage() -> EventId {
        EventId::new(7, "Damage")
    }

    fn model() -> Rc<dyn ObjectModel> {
        Rc::new(DynamicModel::new())
    }

    #[test]
    fn test_init_rejects_invalid_event_and_missing_action() {
        let events = events();
        let log = journal();

        let invalid = EventHandler::new("h", EventId::invalid(), model())
            .with_action(Scripted::boxed("a", 1, &log))
            .into_shared();
        assert!(matches!(
            EventHandler::init(&invalid, &events),
            Err(ActionError::InvalidEvent { .. })
        ));
        assert!(!invalid.borrow().is_registered());

        let empty = EventHandler::new("h", damage(), model()).into_shared();
        assert!(matches!(
            EventHandler::init(&empty, &events),
            Err(ActionError::MissingAction { .. })
        ));

        let bad_sequence = EventHandler::new("h", damage(), model())
            .with_action(Box::new(SequenceAction::new()))
            .into_shared();
        assert!(matches!(
            EventHandler::init(&bad_sequence, &events),
            Err(ActionError::EmptySequence { .. })
        ));
        assert_eq!(events.listener_count(7), 0);
    }

    #[test]
    fn test_trigger_and_tick_until_sleeping() {
        let events = events();
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 2, &log))
            .into_shared();
        EventHandler::init(&handler, &events).unwrap();

        events.post(&damage());
        assert_eq!(handler.borrow().state(), HandlerState::Running);
        assert_eq!(handler.borrow().trigger_count(), 1);
        assert!(handler.borrow().current_event().is_some());

        handler.borrow_mut().tick(&events);
        assert_eq!(handler.borrow().state(), HandlerState::Running);
        handler.borrow_mut().tick(&events);
        assert_eq!(handler.borrow().state(), HandlerState::Sleeping);
        assert!(handler.borrow().current_event().is_none());

        // sleeping handlers wake up again
        events.post(&damage());
        assert_eq!(handler.borrow().state(), HandlerState::Running);
        assert_eq!(handler.borrow().trigger_count(), 2);
    }

    #[test]
    fn test_ignores_other_events() {
        let events = events();
        let log = journal();
        let mut handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 1, &log));

        let other = EventRecord::new(EventId::new(8, "Heal"));
        assert!(!handler.on_event(&events, &other));
        assert_eq!(handler.state(), HandlerState::None);
    }

    #[test]
    fn test_fixed_count_stops_at_limit() {
        let events = events();
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 1, &log))
            .with_policy(TriggerPolicy::FIXED_COUNT)
            .with_max_trigger_count(2)
            .into_shared();
        EventHandler::init(&handler, &events).unwrap();

        for _ in 0..2 {
            events.post(&damage());
            handler.borrow_mut().tick(&events);
        }
        assert_eq!(handler.borrow().state(), HandlerState::Terminated);

        events.post(&damage());
        assert_eq!(handler.borrow().trigger_count(), 2);
        assert_eq!(handler.borrow().state(), HandlerState::Terminated);
        assert_eq!(
            log.borrow().iter().filter(|e| e.ends_with(":trigger")).count(),
            2
        );
    }

    #[test]
    fn test_lock_refuses_while_running() {
        let events = events();
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 3, &log))
            .with_policy(TriggerPolicy::LOCK_UNTIL_COMPLETION)
            .into_shared();
        EventHandler::init(&handler, &events).unwrap();

        events.post(&damage());
        events.post(&damage());
        assert_eq!(handler.borrow().trigger_count(), 1);

        for _ in 0..3 {
            handler.borrow_mut().tick(&events);
        }
        assert_eq!(handler.borrow().state(), HandlerState::Sleeping);

        events.post(&damage());
        assert_eq!(handler.borrow().trigger_count(), 2);
    }

    #[test]
    fn test_without_lock_retrigger_restarts_action() {
        let events = events();
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 3, &log))
            .into_shared();
        EventHandler::init(&handler, &events).unwrap();

        events.post(&damage());
        handler.borrow_mut().tick(&events);
        events.post(&damage());

        let handler = handler.borrow();
        assert_eq!(handler.trigger_count(), 2);
        assert_eq!(handler.action().map(|a| a.progress()), Some(0));
    }

    #[test]
    fn test_count_check_wins_over_lock() {
        let events = events();
        let log = journal();
        let mut handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 5, &log))
            .with_policy(TriggerPolicy::FIXED_COUNT | TriggerPolicy::LOCK_UNTIL_COMPLETION)
            .with_max_trigger_count(1);
        let record = EventRecord::new(damage());

        assert!(handler.on_event(&events, &record));
        assert!(!handler.on_event(&events, &record));
        assert_eq!(handler.refusal(), Some("it reached its trigger limit"));
        // the running action keeps the handler alive until it completes
        assert_eq!(handler.state(), HandlerState::Running);
    }

    #[test]
    fn test_teardown_unregisters() {
        let events = events();
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 1, &log))
            .into_shared();
        EventHandler::init(&handler, &events).unwrap();
        assert!(matches!(
            EventHandler::init(&handler, &events),
            Err(ActionError::AlreadyRegistered { .. })
        ));

        handler.borrow_mut().teardown(&events);
        assert_eq!(events.listener_count(7), 0);
        assert_eq!(events.post(&damage()), 0);
        assert_eq!(handler.borrow().trigger_count(), 0);
    }

    #[test]
    fn test_dropped_handler_is_not_called() {
        let events = events();
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 1, &log))
            .into_shared();
        EventHandler::init(&handler, &events).unwrap();
        drop(handler);

        assert_eq!(events.post(&damage()), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let events = events();
        let log = journal();
        let build = || {
            EventHandler::new("h", damage(), model())
                .with_action(Scripted::boxed("a", 3, &log))
                .with_policy(TriggerPolicy::FIXED_COUNT)
                .with_max_trigger_count(4)
        };

        let mut original = build();
        original.on_event(&events, &EventRecord::new(damage()));
        original.tick(&events);
        let snapshot = original.snapshot();

        let mut restored = build();
        restored.restore(&snapshot).unwrap();
        assert_eq!(restored.trigger_count(), 1);
        assert_eq!(restored.state(), HandlerState::Running);
        assert_eq!(
            restored.action().map(|a| a.state()),
            Some(ActionState::Running)
        );
        assert_eq!(restored.snapshot(), snapshot);

        let mut other = EventHandler::new("h", EventId::new(8, "Heal"), model());
        assert!(other.restore(&snapshot).is_err());
    }

    #[test]
    fn test_describe() {
        let log = journal();
        let handler = EventHandler::new("h", damage(), model())
            .with_action(Scripted::boxed("a", 3, &log))
            .with_policy(TriggerPolicy::FIXED_COUNT)
            .with_max_trigger_count(4);

        let mut lines = Vec::new();
        handler.describe(&mut lines);
        assert_eq!(lines, vec!["h on Damage (7) [None] triggered 0/4", "  a [Idle]"]);
    }
}
