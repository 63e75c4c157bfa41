use reflex_binding::BindingError;
use reflex_events::{EventError, EventId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("sequence {label} has no children")]
    EmptySequence { label: String },

    #[error("handler {handler} has no action")]
    MissingAction { handler: String },

    #[error("handler {handler} is bound to invalid event {event}")]
    InvalidEvent { handler: String, event: EventId },

    #[error("action {label} posts invalid event {event}")]
    InvalidPostEvent { label: String, event: EventId },

    #[error("handler {handler} is already registered")]
    AlreadyRegistered { handler: String },

    #[error("action kind {kind} does not take children")]
    NotComposite { kind: String },

    #[error("snapshot is for {found}, expected {expected}")]
    SnapshotMismatch { expected: String, found: String },

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}
