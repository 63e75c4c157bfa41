#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event id {0} is invalid (ids below zero are reserved)")]
    InvalidId(i32),

    #[error("no event named \"{0}\"")]
    UnknownName(String),

    #[error("event id {0} is already registered")]
    DuplicateId(i32),

    #[error("event name \"{0}\" is already registered")]
    DuplicateName(String),

    #[error("no event id left after {0}")]
    IdsExhausted(i32),

    #[error("listener {listener} is not registered for event {event}")]
    UnknownListener { event: i32, listener: u64 },
}
