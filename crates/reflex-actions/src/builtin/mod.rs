/// Built-in leaf and gating actions
pub mod animate;
pub mod conditional;
pub mod log;
pub mod post_event;
pub mod set_member;
pub mod wait;

pub use animate::AnimateFloatAction;
pub use conditional::ConditionalAction;
pub use log::LogAction;
pub use post_event::PostEventAction;
pub use set_member::SetMemberAction;
pub use wait::WaitAction;
