/// Member-path binding layer for reflex
///
/// Bindings name a chain of field/property accesses, validated when each step is
/// appended and re-resolved against a live object model after loading. The host
/// object model is reached only through the [`ObjectModel`] capability trait;
/// [`DynamicModel`] is an in-memory implementation used by the runner and tests.
pub mod candidates;
pub mod dynamic;
pub mod error;
pub mod member;
pub mod model;
pub mod path;

pub use candidates::enumerate_candidates;
pub use dynamic::{DynamicModel, MemberDef, TypeDef};
pub use error::BindingError;
pub use member::{MemberStep, StepSnapshot};
pub use model::{Accessor, MemberAccessor, MemberInfo, MemberKind, ObjectModel, ObjectRef, TypeName, Value};
pub use path::{ComponentMemberPath, ComponentPathSnapshot, MemberPath, PathSnapshot};
