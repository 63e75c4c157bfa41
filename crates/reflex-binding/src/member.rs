use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::BindingError;
use crate::model::{Accessor, MemberInfo, MemberKind, ObjectModel, TypeName, Value};

/// One member access in a binding: the member's metadata plus its cached accessor.
///
/// Equality and hashing only look at the declaring type and member name, so a step
/// re-resolved after a reload compares equal to the one that was stored.
#[derive(Clone)]
pub struct MemberStep {
    info: MemberInfo,
    accessor: Option<Accessor>,
}

/// Persisted form of a [`MemberStep`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub declaring_type: TypeName,
    pub name: String,
    pub kind: MemberKind,
    pub value_type: TypeName,
}

impl MemberStep {
    /// Wrap a member returned by the model, attaching its accessor
    pub fn from_info(model: &dyn ObjectModel, info: MemberInfo) -> Self {
        let accessor = model.accessor(&info);
        Self { info, accessor }
    }

    /// Look up a member by name on `ty`
    pub fn resolve(
        model: &dyn ObjectModel,
        ty: &TypeName,
        name: &str,
    ) -> Result<Self, BindingError> {
        let info = model
            .find_member(ty, name)
            .ok_or_else(|| BindingError::MemberNotFound {
                ty: ty.clone(),
                member: name.to_string(),
            })?;
        Ok(Self::from_info(model, info))
    }

    /// Rebuild a step from its snapshot. A missing member yields an unresolved step
    /// and the error describing why.
    pub fn from_snapshot(
        model: &dyn ObjectModel,
        snapshot: &StepSnapshot,
    ) -> (Self, Option<BindingError>) {
        let mut step = Self {
            info: MemberInfo {
                declaring_type: snapshot.declaring_type.clone(),
                name: snapshot.name.clone(),
                value_type: snapshot.value_type.clone(),
                kind: snapshot.kind,
                writable: false,
            },
            accessor: None,
        };
        let error = step.resolve_with(model).err();
        (step, error)
    }

    /// Re-attach the accessor from the stored declaring type and name.
    /// Resolving an already-resolved step refreshes it.
    pub fn resolve_with(&mut self, model: &dyn ObjectModel) -> Result<(), BindingError> {
        let found = model
            .members(&self.info.declaring_type)
            .into_iter()
            .find(|m| m.name == self.info.name && m.declaring_type == self.info.declaring_type);

        match found {
            Some(info) => {
                self.accessor = model.accessor(&info);
                self.info = info;
                if self.accessor.is_none() {
                    return Err(self.unresolved());
                }
                Ok(())
            }
            None => {
                self.accessor = None;
                warn!(target: "binding", "Member {}.{} not found while resolving", self.info.declaring_type, self.info.name);
                Err(BindingError::MemberNotFound {
                    ty: self.info.declaring_type.clone(),
                    member: self.info.name.clone(),
                })
            }
        }
    }

    pub fn to_snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            declaring_type: self.info.declaring_type.clone(),
            name: self.info.name.clone(),
            kind: self.info.kind,
            value_type: self.info.value_type.clone(),
        }
    }

    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub fn declaring_type(&self) -> &TypeName {
        &self.info.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn value_type(&self) -> &TypeName {
        &self.info.value_type
    }

    pub fn is_property(&self) -> bool {
        self.info.kind.is_property()
    }

    pub fn is_resolved(&self) -> bool {
        self.accessor.is_some()
    }

    /// Drop the cached accessor, leaving the step unresolved
    pub(crate) fn detach(&mut self) {
        self.accessor = None;
    }

    /// Whether two steps share the same cached accessor instance
    pub fn same_accessor(&self, other: &MemberStep) -> bool {
        match (&self.accessor, &other.accessor) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn get(&self, target: &Value) -> Result<Option<Value>, BindingError> {
        self.accessor
            .as_ref()
            .ok_or_else(|| self.unresolved())?
            .get(target)
    }

    pub fn set(&self, target: &Value, value: Value) -> Result<(), BindingError> {
        if !self.info.writable {
            return Err(BindingError::ReadOnly {
                member: self.info.name.clone(),
            });
        }
        self.accessor
            .as_ref()
            .ok_or_else(|| self.unresolved())?
            .set(target, value)
    }

    fn unresolved(&self) -> BindingError {
        BindingError::Unresolved {
            declaring: self.info.declaring_type.clone(),
            member: self.info.name.clone(),
        }
    }
}

impl PartialEq for MemberStep {
    fn eq(&self, other: &Self) -> bool {
        self.info.declaring_type == other.info.declaring_type && self.info.name == other.info.name
    }
}

impl Eq for MemberStep {}

impl Hash for MemberStep {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.info.declaring_type.hash(state);
        self.info.name.hash(state);
    }
}

impl fmt::Debug for MemberStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberStep")
            .field("declaring_type", &self.info.declaring_type)
            .field("name", &self.info.name)
            .field("kind", &self.info.kind)
            .field("value_type", &self.info.value_type)
            .field("resolved", &self.accessor.is_some())
            .finish()
    }
}
