/// Action engine for reflex
///
/// Actions are small resumable state machines triggered by event handlers and
/// advanced once per simulation step. Conditions are pure boolean trees that gate
/// them. Everything here runs on the single thread that drives the bus.
pub mod action;
pub mod builtin;
pub mod comparer;
pub mod compound;
pub mod condition;
pub mod context;
pub mod error;
pub mod handler;
pub mod registry;
pub mod sequence;
pub mod snapshot;

pub use action::{Action, ActionCore, ActionExt, ActionState};
pub use comparer::Comparer;
pub use compound::CompoundAction;
pub use condition::{
    AndCondition, CompareCondition, Condition, ConstantCondition, NotCondition, Operand,
    OrCondition,
};
pub use context::ActionContext;
pub use error::ActionError;
pub use handler::{EventHandler, HandlerState, SharedHandler, TriggerPolicy};
pub use registry::{ActionFactory, ActionRegistry};
pub use sequence::SequenceAction;
pub use snapshot::{ActionSnapshot, HandlerSnapshot};
