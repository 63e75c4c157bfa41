use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EventError;

/// Stable (id, name) key addressing a post/subscribe pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    id: i32,
    name: String,
}

impl EventId {
    /// Id reserved for the invalid sentinel
    pub const INVALID_ID: i32 = -1;

    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Sentinel returned by name lookups that fail. Never dispatched.
    pub fn invalid() -> Self {
        Self::new(Self::INVALID_ID, "Invalid")
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_valid(&self) -> bool {
        self.id >= 0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Ordered list of known event identities with a name index.
///
/// Populated by the authoring/configuration step; the bus only consults it to turn
/// names into identities.
#[derive(Debug, Clone, Default)]
pub struct EventIdRegistry {
    ids: Vec<EventId>,
    by_name: HashMap<String, usize>,
}

impl EventIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from stored identities, rejecting duplicates
    pub fn from_ids(ids: impl IntoIterator<Item = EventId>) -> Result<Self, EventError> {
        let mut registry = Self::new();
        for id in ids {
            registry.insert(id)?;
        }
        Ok(registry)
    }

    /// Insert an identity as-is
    pub fn insert(&mut self, event: EventId) -> Result<(), EventError> {
        if !event.is_valid() {
            return Err(EventError::InvalidId(event.id));
        }
        if self.contains(event.id) {
            return Err(EventError::DuplicateId(event.id));
        }
        if self.by_name.contains_key(&event.name) {
            return Err(EventError::DuplicateName(event.name));
        }

        debug!(target: "events", "Registering event identity {}", event);
        self.by_name.insert(event.name.clone(), self.ids.len());
        self.ids.push(event);
        Ok(())
    }

    /// Add a named event, assigning the next free id (one past the current maximum)
    pub fn add(&mut self, name: impl Into<String>) -> Result<EventId, EventError> {
        let event = EventId::new(self.next_id()?, name);
        self.insert(event.clone())?;
        Ok(event)
    }

    /// Add a placeholder event named after its id
    pub fn add_unnamed(&mut self) -> Result<EventId, EventError> {
        let id = self.next_id()?;
        let mut name = format!("Unnamed {}", id);
        let mut suffix = 1;
        while self.by_name.contains_key(&name) {
            suffix += 1;
            name = format!("Unnamed {} ({})", id, suffix);
        }

        let event = EventId::new(id, name);
        self.by_name.insert(event.name.clone(), self.ids.len());
        self.ids.push(event.clone());
        Ok(event)
    }

    /// Remove an identity by id
    pub fn remove(&mut self, id: i32) -> Option<EventId> {
        let index = self.index_of(id)?;
        let removed = self.ids.remove(index);
        self.rebuild_index();
        Some(removed)
    }

    /// Resolve a name, yielding [`EventId::invalid`] when unknown
    pub fn name_to_id(&self, name: &str) -> EventId {
        self.by_name
            .get(name)
            .map(|&index| self.ids[index].clone())
            .unwrap_or_else(EventId::invalid)
    }

    pub fn get(&self, id: i32) -> Option<&EventId> {
        self.ids.iter().find(|event| event.id == id)
    }

    pub fn index_of(&self, id: i32) -> Option<usize> {
        self.ids.iter().position(|event| event.id == id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.index_of(id).is_some()
    }

    pub fn ids(&self) -> &[EventId] {
        &self.ids
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|event| event.name())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn next_id(&self) -> Result<i32, EventError> {
        let max = self.ids.iter().map(|event| event.id).max().unwrap_or(0);
        max.checked_add(1).ok_or_else(|| {
            warn!(target: "events", "Event ids are exhausted after {}", max);
            EventError::IdsExhausted(max)
        })
    }

    fn rebuild_index(&mut self) {
        self.by_name = self
            .ids
            .iter()
            .enumerate()
            .map(|(index, event)| (event.name.clone(), index))
            .collect();
    }
}
