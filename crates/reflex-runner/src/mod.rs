mod config;
mod console;
mod logging;
mod runtime;
mod scene;

pub use config::{ConfigLoadError, LoggingConfig, ReflexConfig, RuntimeConfig};
pub use console::{CommandFn, Console};
pub use logging::init_logging;
pub use runtime::Runtime;
pub use scene::{
    ActionDef, BindingDef, ConditionDef, EventDefinition, HandlerDefinition, MemberDefinition,
    ObjectDefinition, OperandDef, Scene, SceneError, TimelineEntry, TypeDefinition,
};
