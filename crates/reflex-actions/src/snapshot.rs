// Persisted forms of actions and handlers
// Snapshots only carry state; the tree they are restored onto is rebuilt from its
// authored definition first.

use reflex_events::EventId;
use serde::{Deserialize, Serialize};

use crate::action::ActionState;
use crate::handler::{HandlerState, TriggerPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub state: ActionState,
    #[serde(default)]
    pub progress: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSnapshot {
    pub name: String,
    pub policy: TriggerPolicy,
    pub max_trigger_count: u32,
    pub trigger_count: u32,
    pub state: HandlerState,
    pub event: EventId,
    pub action: Option<ActionSnapshot>,
}
