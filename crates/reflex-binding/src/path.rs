use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::BindingError;
use crate::member::{MemberStep, StepSnapshot};
use crate::model::{ObjectModel, ObjectRef, TypeName, Value};

/// An ordered chain of member accesses, walked left to right from a root value.
///
/// Paths are persistent values: [`MemberPath::append`] returns a new path and
/// leaves the receiver untouched.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct MemberPath {
    steps: Vec<MemberStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSnapshot {
    pub steps: Vec<StepSnapshot>,
}

impl MemberPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a dotted member chain (`"health.current"`) starting from `root_type`
    pub fn parse(
        model: &dyn ObjectModel,
        root_type: &TypeName,
        dotted: &str,
    ) -> Result<Self, BindingError> {
        let mut path = Self::new();
        let mut ty = root_type.clone();
        for name in dotted.split('.').filter(|s| !s.is_empty()) {
            let step = MemberStep::resolve(model, &ty, name)?;
            ty = step.value_type().clone();
            path = path.append(step, model)?;
        }
        if path.is_empty() {
            return Err(BindingError::EmptyPath);
        }
        Ok(path)
    }

    /// Return a new path with `step` appended.
    ///
    /// The step's declaring type must accept the previous step's value type; any
    /// first step is accepted.
    pub fn append(&self, step: MemberStep, model: &dyn ObjectModel) -> Result<Self, BindingError> {
        if let Some(last) = self.steps.last() {
            if !model.is_assignable(step.declaring_type(), last.value_type()) {
                warn!(
                    target: "binding",
                    "Can not append {}.{} after {} (value type {})",
                    step.declaring_type(),
                    step.name(),
                    self,
                    last.value_type()
                );
                return Err(BindingError::ChainTypeMismatch {
                    declaring: step.declaring_type().clone(),
                    member: step.name().to_string(),
                    found: last.value_type().clone(),
                });
            }
        }

        let mut steps = self.steps.clone();
        steps.push(step);
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[MemberStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Type produced by the last step
    pub fn value_type(&self) -> Option<&TypeName> {
        self.steps.last().map(|s| s.value_type())
    }

    /// Type the first step expects as its input
    pub fn root_type(&self) -> Option<&TypeName> {
        self.steps.first().map(|s| s.declaring_type())
    }

    pub fn is_resolved(&self) -> bool {
        self.steps.iter().all(|s| s.is_resolved())
    }

    /// Walk the chain from `root`. A null link or a failing step yields `None`.
    pub fn get_value(&self, root: &Value) -> Option<Value> {
        let mut current = root.clone();
        for (index, step) in self.steps.iter().enumerate() {
            match step.get(&current) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    trace!(target: "binding", "{} is null at step {}", self, index);
                    return None;
                }
                Err(e) => {
                    warn!(target: "binding", "Failed to read {}: {}", self, e);
                    return None;
                }
            }
        }
        Some(current)
    }

    /// Walk all but the last step, then write through the last one
    pub fn set_value(&self, root: &Value, value: Value) -> Result<(), BindingError> {
        let Some((last, init)) = self.steps.split_last() else {
            warn!(target: "binding", "Can not write through an empty binding");
            return Err(BindingError::EmptyPath);
        };

        let mut target = root.clone();
        for (index, step) in init.iter().enumerate() {
            target = match step.get(&target) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    warn!(target: "binding", "Can not write {}: step {} is null", self, index);
                    return Err(BindingError::NullIntermediate {
                        path: self.to_string(),
                        index,
                    });
                }
                Err(e) => {
                    warn!(target: "binding", "Can not write {}: {}", self, e);
                    return Err(e);
                }
            };
        }

        last.set(&target, value).inspect_err(|e| {
            warn!(target: "binding", "Can not write {}: {}", self, e);
        })
    }

    /// Re-attach every step's accessor. Every step is attempted; the first failure
    /// is returned after all have been tried.
    pub fn resolve(&mut self, model: &dyn ObjectModel) -> Result<(), BindingError> {
        let mut first_error = None;
        for step in &mut self.steps {
            if let Err(e) = step.resolve_with(model) {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = self.check_chain(model) {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn to_snapshot(&self) -> PathSnapshot {
        PathSnapshot {
            steps: self.steps.iter().map(|s| s.to_snapshot()).collect(),
        }
    }

    /// Rebuild a path from stored steps, resolving each against `model`.
    ///
    /// Missing members are logged and left unresolved; reading such a path yields
    /// `None` until a later [`MemberPath::resolve`] succeeds.
    pub fn from_snapshot(model: &dyn ObjectModel, snapshot: &PathSnapshot) -> Self {
        let steps = snapshot
            .steps
            .iter()
            .map(|s| {
                let (step, error) = MemberStep::from_snapshot(model, s);
                if let Some(e) = error {
                    warn!(target: "binding", "Restored binding step is unresolved: {}", e);
                }
                step
            })
            .collect();
        let mut path = Self { steps };
        if let Some(e) = path.check_chain(model) {
            warn!(target: "binding", "Restored binding {} no longer chains: {}", path, e);
        }
        path
    }

    /// Re-check that each step accepts the value type of the one before it, as
    /// [`MemberPath::append`] does. Steps that no longer fit are detached and the
    /// first mismatch is returned.
    fn check_chain(&mut self, model: &dyn ObjectModel) -> Option<BindingError> {
        let mut first_error = None;
        for index in 1..self.steps.len() {
            let found = self.steps[index - 1].value_type().clone();
            let step = &mut self.steps[index];
            if model.is_assignable(step.declaring_type(), &found) {
                continue;
            }
            warn!(
                target: "binding",
                "Step {}.{} can not follow a value of type {}",
                step.declaring_type(),
                step.name(),
                found
            );
            step.detach();
            first_error.get_or_insert(BindingError::ChainTypeMismatch {
                declaring: step.declaring_type().clone(),
                member: step.name().to_string(),
                found,
            });
        }
        first_error
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.steps.first() {
            Some(first) => write!(f, "{}", first.declaring_type())?,
            None => return f.write_str("<empty>"),
        }
        for step in &self.steps {
            write!(f, ".{}", step.name())?;
        }
        Ok(())
    }
}

impl fmt::Debug for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberPath({})", self)
    }
}

/// A member path rooted at a specific behavior instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentMemberPath {
    component: Option<ObjectRef>,
    path: MemberPath,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPathSnapshot {
    pub component: Option<ObjectRef>,
    pub path: PathSnapshot,
}

impl ComponentMemberPath {
    pub fn new(component: ObjectRef, path: MemberPath) -> Self {
        Self {
            component: Some(component),
            path,
        }
    }

    /// Bind a dotted member chain on `component`, using its runtime type as the root
    pub fn parse(
        model: &dyn ObjectModel,
        component: ObjectRef,
        dotted: &str,
    ) -> Result<Self, BindingError> {
        let ty = model
            .object_type(component)
            .ok_or(BindingError::UnknownObject(component))?;
        let path = MemberPath::parse(model, &ty, dotted)?;
        Ok(Self::new(component, path))
    }

    pub fn component(&self) -> Option<ObjectRef> {
        self.component
    }

    pub fn set_component(&mut self, component: Option<ObjectRef>) {
        self.component = component;
    }

    pub fn path(&self) -> &MemberPath {
        &self.path
    }

    pub fn set_path(&mut self, path: MemberPath) {
        self.path = path;
    }

    pub fn value_type(&self) -> Option<&TypeName> {
        self.path.value_type()
    }

    pub fn is_bound(&self) -> bool {
        self.component.is_some() && !self.path.is_empty()
    }

    pub fn get_value(&self) -> Option<Value> {
        let component = self.component?;
        self.path.get_value(&Value::Object(component))
    }

    pub fn set_value(&self, value: Value) -> Result<(), BindingError> {
        let Some(component) = self.component else {
            warn!(target: "binding", "Can not write {}: no root component", self.path);
            return Err(BindingError::NoComponent);
        };
        self.path.set_value(&Value::Object(component), value)
    }

    pub fn resolve(&mut self, model: &dyn ObjectModel) -> Result<(), BindingError> {
        self.path.resolve(model)
    }

    pub fn to_snapshot(&self) -> ComponentPathSnapshot {
        ComponentPathSnapshot {
            component: self.component,
            path: self.path.to_snapshot(),
        }
    }

    pub fn from_snapshot(model: &dyn ObjectModel, snapshot: &ComponentPathSnapshot) -> Self {
        Self {
            component: snapshot.component,
            path: MemberPath::from_snapshot(model, &snapshot.path),
        }
    }
}

impl fmt::Display for ComponentMemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component {
            Some(component) => write!(f, "{}:{}", component, self.path),
            None => write!(f, "<none>:{}", self.path),
        }
    }
}
