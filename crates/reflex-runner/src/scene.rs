// Scene files
// A scene declares a host object model, events, handlers and a timeline of console
// commands. Definitions here are plain serde data; `Runtime::from_scene` turns them
// into live objects.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use reflex_actions::builtin::{
    AnimateFloatAction, ConditionalAction, LogAction, PostEventAction, SetMemberAction, WaitAction,
};
use reflex_actions::{
    Action, ActionError, ActionRegistry, AndCondition, CompareCondition, Comparer, Condition,
    ConstantCondition, NotCondition, Operand, OrCondition,
};
use reflex_binding::{BindingError, ComponentMemberPath, DynamicModel, ObjectRef, TypeDef, Value};
use reflex_events::{EventError, EventId, EventManager};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error reading scene: {0}")]
    Io(String),

    #[error("Failed to parse scene: {0}")]
    Parse(String),

    #[error("Unknown object {0}")]
    UnknownObject(String),

    #[error("Unknown event {0}")]
    UnknownEvent(String),

    #[error("Unknown action kind {0}")]
    UnknownAction(String),

    #[error("Unsupported value {value} for {context}")]
    BadValue { context: String, value: String },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    #[serde(default)]
    pub objects: Vec<ObjectDefinition>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub handlers: Vec<HandlerDefinition>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub watch: Vec<BindingDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub fields: Vec<MemberDefinition>,
    #[serde(default)]
    pub properties: Vec<MemberDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    /// Only meaningful for properties; fields are always writable
    #[serde(default = "default_writable")]
    pub writable: bool,
}

fn default_writable() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Names of other scene objects attached to this one as behaviors
    #[serde(default)]
    pub behaviors: Vec<String>,
    /// Initial member values. Strings starting with `@` name another object.
    #[serde(default)]
    pub values: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDefinition {
    pub name: String,
    /// Explicit id; the next free id is used when absent
    #[serde(default)]
    pub id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerDefinition {
    pub name: String,
    pub event: String,
    #[serde(default)]
    pub owner: Option<String>,
    /// Enables the fixed-count policy with this limit
    #[serde(default)]
    pub max_trigger_count: Option<u32>,
    /// Refuse triggers while the action is still running
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub action: Option<ActionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub step: u32,
    pub command: String,
}

/// A member path on a named scene object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingDef {
    pub object: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionDef {
    Sequence {
        #[serde(default)]
        label: Option<String>,
        actions: Vec<ActionDef>,
    },
    Compound {
        #[serde(default)]
        label: Option<String>,
        actions: Vec<ActionDef>,
    },
    Wait {
        steps: u32,
    },
    SetMember {
        target: BindingDef,
        value: toml::Value,
    },
    AnimateFloat {
        target: BindingDef,
        from: f64,
        to: f64,
        steps: u32,
    },
    Log {
        message: String,
    },
    PostEvent {
        event: String,
    },
    Conditional {
        condition: ConditionDef,
        action: Box<ActionDef>,
    },
}

impl ActionDef {
    /// Registry kind id this definition builds
    pub fn kind(&self) -> &'static str {
        match self {
            ActionDef::Sequence { .. } => "sequence",
            ActionDef::Compound { .. } => "compound",
            ActionDef::Wait { .. } => "wait",
            ActionDef::SetMember { .. } => "set_member",
            ActionDef::AnimateFloat { .. } => "animate_float",
            ActionDef::Log { .. } => "log",
            ActionDef::PostEvent { .. } => "post_event",
            ActionDef::Conditional { .. } => "conditional",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionDef {
    Constant {
        value: bool,
    },
    Compare {
        left: OperandDef,
        comparer: Comparer,
        right: OperandDef,
    },
    And {
        #[serde(default)]
        left: Option<Box<ConditionDef>>,
        #[serde(default)]
        right: Option<Box<ConditionDef>>,
    },
    Or {
        #[serde(default)]
        left: Option<Box<ConditionDef>>,
        #[serde(default)]
        right: Option<Box<ConditionDef>>,
    },
    Not {
        #[serde(default)]
        condition: Option<Box<ConditionDef>>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandDef {
    Member(BindingDef),
    Constant(toml::Value),
}

impl FromStr for Scene {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| SceneError::Parse(e.to_string()))
    }
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SceneError::Io(format!("{}: {}", path.display(), e)))?;
        content.parse()
    }

    /// Declare types, spawn objects, attach behaviors and apply initial values
    pub(crate) fn populate_model(&self, model: &DynamicModel) -> Result<(), SceneError> {
        for ty in &self.types {
            let mut def = TypeDef::new(ty.name.as_str());
            if let Some(base) = &ty.base {
                def = def.base(base.as_str());
            }
            for field in &ty.fields {
                def = def.field(field.name.as_str(), field.value_type.as_str());
            }
            for property in &ty.properties {
                def = if property.writable {
                    def.property(property.name.as_str(), property.value_type.as_str())
                } else {
                    def.read_only_property(property.name.as_str(), property.value_type.as_str())
                };
            }
            model.define_type(def);
        }

        // values and behaviors may refer to objects declared later in the file
        for object in &self.objects {
            model.spawn(object.ty.as_str(), Some(object.name.as_str()))?;
        }
        for object in &self.objects {
            let target = find_object(model, &object.name)?;
            for behavior in &object.behaviors {
                model.attach(target, find_object(model, behavior)?)?;
            }
            for (member, raw) in &object.values {
                let value = to_value(model, raw, &format!("{}.{}", object.name, member))?;
                model.set_field(target, member, value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn register_events(&self, events: &EventManager) -> Result<(), SceneError> {
        let mut registry = events.registry_mut();
        for event in &self.events {
            match event.id {
                Some(id) => registry.insert(EventId::new(id, event.name.as_str()))?,
                None => {
                    registry.add(event.name.as_str())?;
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn find_object(
    model: &DynamicModel,
    name: &str,
) -> Result<ObjectRef, SceneError> {
    model
        .find(name)
        .ok_or_else(|| SceneError::UnknownObject(name.to_string()))
}

pub(crate) fn bind(model: &DynamicModel, def: &BindingDef) -> Result<ComponentMemberPath, SceneError> {
    let component = find_object(model, &def.object)?;
    Ok(ComponentMemberPath::parse(model, component, &def.path)?)
}

fn to_value(model: &DynamicModel, raw: &toml::Value, context: &str) -> Result<Value, SceneError> {
    match raw {
        toml::Value::Boolean(v) => Ok(Value::Bool(*v)),
        toml::Value::Integer(v) => Ok(Value::Int(*v)),
        toml::Value::Float(v) => Ok(Value::Float(*v)),
        toml::Value::String(s) => match s.strip_prefix('@') {
            Some(name) => Ok(Value::Object(find_object(model, name)?)),
            None => Ok(Value::Str(s.clone())),
        },
        other => Err(SceneError::BadValue {
            context: context.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Build a live action tree.
///
/// Only kinds offered by `registry` may appear. Composites are created through
/// the registry's factories and filled with their children.
pub(crate) fn build_action(
    def: &ActionDef,
    model: &DynamicModel,
    events: &EventManager,
    registry: &ActionRegistry,
) -> Result<Box<dyn Action>, SceneError> {
    let kind = def.kind();
    if !registry.contains(kind) {
        return Err(SceneError::UnknownAction(kind.to_string()));
    }

    let action: Box<dyn Action> = match def {
        ActionDef::Sequence { label, actions } | ActionDef::Compound { label, actions } => {
            let mut composite = registry
                .create(kind)
                .ok_or_else(|| SceneError::UnknownAction(kind.to_string()))?;
            for child in actions {
                composite.push_child(build_action(child, model, events, registry)?)?;
            }
            composite.core_mut().set_label(label.clone());
            composite
        }
        ActionDef::Wait { steps } => Box::new(WaitAction::new(*steps)),
        ActionDef::SetMember { target, value } => {
            let value = to_value(model, value, &target.path)?;
            Box::new(SetMemberAction::new(bind(model, target)?, value))
        }
        ActionDef::AnimateFloat {
            target,
            from,
            to,
            steps,
        } => Box::new(AnimateFloatAction::new(bind(model, target)?, *from, *to, *steps)),
        ActionDef::Log { message } => Box::new(LogAction::new(message.as_str())),
        ActionDef::PostEvent { event } => {
            let id = events.name_to_id(event);
            if !id.is_valid() {
                return Err(SceneError::UnknownEvent(event.clone()));
            }
            Box::new(PostEventAction::new(id))
        }
        ActionDef::Conditional { condition, action } => Box::new(ConditionalAction::new(
            build_condition(condition, model)?,
            build_action(action, model, events, registry)?,
        )),
    };
    Ok(action)
}

fn build_optional(
    def: &Option<Box<ConditionDef>>,
    model: &DynamicModel,
) -> Result<Option<Box<dyn Condition>>, SceneError> {
    def.as_deref()
        .map(|def| build_condition(def, model))
        .transpose()
}

fn build_operand(def: &OperandDef, model: &DynamicModel) -> Result<Operand, SceneError> {
    Ok(match def {
        OperandDef::Member(binding) => Operand::Member(bind(model, binding)?),
        OperandDef::Constant(raw) => Operand::Constant(to_value(model, raw, "operand")?),
    })
}

pub(crate) fn build_condition(
    def: &ConditionDef,
    model: &DynamicModel,
) -> Result<Box<dyn Condition>, SceneError> {
    let condition: Box<dyn Condition> = match def {
        ConditionDef::Constant { value } => Box::new(ConstantCondition(*value)),
        ConditionDef::Compare {
            left,
            comparer,
            right,
        } => Box::new(CompareCondition::new(
            build_operand(left, model)?,
            *comparer,
            build_operand(right, model)?,
        )),
        ConditionDef::And { left, right } => Box::new(AndCondition {
            left: build_optional(left, model)?,
            right: build_optional(right, model)?,
        }),
        ConditionDef::Or { left, right } => Box::new(OrCondition {
            left: build_optional(left, model)?,
            right: build_optional(right, model)?,
        }),
        ConditionDef::Not { condition } => Box::new(NotCondition {
            inner: build_optional(condition, model)?,
        }),
    };
    Ok(condition)
}
