// Synchronous event bus
// Posting runs every listener to completion on the calling thread before returning.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use reflex_binding::ObjectRef;
use tracing::{debug, error, trace, warn};

use crate::error::EventError;
use crate::identity::{EventId, EventIdRegistry};
use crate::record::EventRecord;

/// Listener callback. Receives the bus so it can post or (un)register during dispatch.
pub type EventCallback = Rc<dyn Fn(&EventManager, &EventRecord)>;

/// Token returned by registration, used to unregister the same callback later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

struct Listener {
    id: ListenerId,
    callback: EventCallback,
}

/// Maps event ids to ordered multicast listener lists.
///
/// Single-threaded by construction: all state sits behind `RefCell`/`Cell` so that
/// callbacks may re-enter the bus. Borrows are never held across a callback.
pub struct EventManager {
    registry: RefCell<EventIdRegistry>,
    listeners: RefCell<HashMap<i32, Vec<Listener>>>,
    next_listener: Cell<u64>,
    depth: Cell<usize>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::with_registry(EventIdRegistry::new())
    }

    pub fn with_registry(registry: EventIdRegistry) -> Self {
        Self {
            registry: RefCell::new(registry),
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(0),
            depth: Cell::new(0),
        }
    }

    // ===== Name surface =====

    pub fn registry(&self) -> Ref<'_, EventIdRegistry> {
        self.registry.borrow()
    }

    pub fn registry_mut(&self) -> RefMut<'_, EventIdRegistry> {
        self.registry.borrow_mut()
    }

    /// Resolve a name, yielding [`EventId::invalid`] when unknown
    pub fn name_to_id(&self, name: &str) -> EventId {
        self.registry.borrow().name_to_id(name)
    }

    // ===== Registration =====

    /// Append a callback to the listener list of `event`
    pub fn register<F>(&self, event: i32, callback: F) -> Result<ListenerId, EventError>
    where
        F: Fn(&EventManager, &EventRecord) + 'static,
    {
        self.register_callback(event, Rc::new(callback))
    }

    pub fn register_callback(
        &self,
        event: i32,
        callback: EventCallback,
    ) -> Result<ListenerId, EventError> {
        if event < 0 {
            error!(target: "events", "Can not register for event {}", event);
            return Err(EventError::InvalidId(event));
        }

        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);

        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Listener { id, callback });

        trace!(target: "events", "Registered listener {} for event {}", id.0, event);
        Ok(id)
    }

    /// Register by event name; unknown names are logged and rejected
    pub fn register_by_name<F>(&self, name: &str, callback: F) -> Result<ListenerId, EventError>
    where
        F: Fn(&EventManager, &EventRecord) + 'static,
    {
        let event = self.name_to_id(name);
        if !event.is_valid() {
            error!(target: "events", "Can not register for event {}", name);
            return Err(EventError::UnknownName(name.to_string()));
        }
        self.register(event.id(), callback)
    }

    /// Remove a previously registered callback
    pub fn unregister(&self, event: i32, listener: ListenerId) -> Result<(), EventError> {
        let mut listeners = self.listeners.borrow_mut();
        let removed = listeners.get_mut(&event).and_then(|list| {
            let index = list.iter().position(|l| l.id == listener)?;
            Some(list.remove(index))
        });

        match removed {
            Some(_) => {
                if listeners.get(&event).is_some_and(|list| list.is_empty()) {
                    listeners.remove(&event);
                }
                trace!(target: "events", "Unregistered listener {} from event {}", listener.0, event);
                Ok(())
            }
            None => {
                warn!(target: "events", "Can not unregister for event {}", event);
                Err(EventError::UnknownListener {
                    event,
                    listener: listener.0,
                })
            }
        }
    }

    pub fn unregister_by_name(&self, name: &str, listener: ListenerId) -> Result<(), EventError> {
        let event = self.name_to_id(name);
        if !event.is_valid() {
            warn!(target: "events", "Can not unregister for event {}", name);
            return Err(EventError::UnknownName(name.to_string()));
        }
        self.unregister(event.id(), listener)
    }

    pub fn listener_count(&self, event: i32) -> usize {
        self.listeners
            .borrow()
            .get(&event)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    // ===== Posting =====

    /// Post an event with no related object. Returns the number of callbacks invoked.
    pub fn post(&self, event: &EventId) -> usize {
        self.dispatch(&EventRecord::new(event.clone()))
    }

    /// Post an event carrying a related object
    pub fn post_with(&self, event: &EventId, related: Option<ObjectRef>) -> usize {
        let mut record = EventRecord::new(event.clone());
        if let Some(object) = related {
            record = record.with_related(object);
        }
        self.dispatch(&record)
    }

    /// Resolve a name and post it. Unknown names are logged, never raised.
    pub fn post_by_name(&self, name: &str, related: Option<ObjectRef>) -> usize {
        let event = self.name_to_id(name);
        if !event.is_valid() {
            error!(target: "events", "Event manager does not contain the event name: {}", name);
            return 0;
        }
        self.post_with(&event, related)
    }

    /// Deliver a record to every listener of its identity, in registration order.
    ///
    /// Listeners registered or removed by a callback take effect from the next
    /// dispatch; the list is captured before the first callback runs. Nested posts
    /// complete before this call returns.
    pub fn dispatch(&self, record: &EventRecord) -> usize {
        let event = record.event();
        if !event.is_valid() {
            error!(target: "events", "Refusing to dispatch invalid event {}", event);
            return 0;
        }

        let callbacks: Vec<EventCallback> = match self.listeners.borrow().get(&event.id()) {
            Some(list) => list.iter().map(|l| Rc::clone(&l.callback)).collect(),
            None => Vec::new(),
        };

        if callbacks.is_empty() {
            if self.registry.borrow().contains(event.id()) {
                debug!(target: "events", "No listeners for event {}", event);
            } else {
                error!(target: "events", "Event manager does not contain the event: {}", event);
            }
            return 0;
        }

        let depth = self.depth.get();
        self.depth.set(depth + 1);
        trace!(target: "events", depth, "Dispatching {} to {} listener(s)", event, callbacks.len());

        for callback in &callbacks {
            callback(self, record);
        }

        self.depth.set(depth);
        callbacks.len()
    }

    /// Current nesting level of dispatch (0 when idle)
    pub fn dispatch_depth(&self) -> usize {
        self.depth.get()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners: HashMap<i32, usize> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, list)| (*id, list.len()))
            .collect();
        f.debug_struct("EventManager")
            .field("registry", &self.registry.borrow())
            .field("listeners", &listeners)
            .finish()
    }
}
