use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::BindingError;

/// Name of a host type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub const BOOL: &'static str = "bool";
    pub const INT: &'static str = "int";
    pub const FLOAT: &'static str = "float";
    pub const STRING: &'static str = "string";
    /// Root of every object type
    pub const OBJECT: &'static str = "object";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the built-in value types, which expose no members
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::BOOL | Self::INT | Self::FLOAT | Self::STRING
        )
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to an object owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef(u64);

impl ObjectRef {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value read from or written to a member. Null is represented by absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(ObjectRef),
}

impl Value {
    /// Type of a primitive value; objects need the model to answer
    pub fn primitive_type(&self) -> Option<TypeName> {
        let name = match self {
            Value::Bool(_) => TypeName::BOOL,
            Value::Int(_) => TypeName::INT,
            Value::Float(_) => TypeName::FLOAT,
            Value::Str(_) => TypeName::STRING,
            Value::Object(_) => return None,
        };
        Some(TypeName::new(name))
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(object) => Some(*object),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Object(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    Property,
}

impl MemberKind {
    pub fn is_property(&self) -> bool {
        matches!(self, MemberKind::Property)
    }
}

/// Metadata describing one field or property of a host type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberInfo {
    pub declaring_type: TypeName,
    pub name: String,
    pub value_type: TypeName,
    pub kind: MemberKind,
    pub writable: bool,
}

/// Resolved getter/setter for one member, cached on a binding step
pub trait MemberAccessor {
    /// Read the member from `target`; `None` means null
    fn get(&self, target: &Value) -> Result<Option<Value>, BindingError>;

    fn set(&self, target: &Value, value: Value) -> Result<(), BindingError>;
}

pub type Accessor = Rc<dyn MemberAccessor>;

/// Capability interface through which bindings see the host object model
pub trait ObjectModel {
    /// Behaviors attached to an addressable object, in attachment order
    fn attached_behaviors(&self, object: ObjectRef) -> Vec<ObjectRef>;

    fn object_type(&self, object: ObjectRef) -> Option<TypeName>;

    /// Fields of `ty`, including inherited ones with their declaring type
    fn fields(&self, ty: &TypeName) -> Vec<MemberInfo>;

    /// Properties of `ty`, including inherited ones with their declaring type
    fn properties(&self, ty: &TypeName) -> Vec<MemberInfo>;

    /// Whether a value of type `source` may be used where `target` is expected
    fn is_assignable(&self, target: &TypeName, source: &TypeName) -> bool;

    /// Build an accessor for a member previously returned by this model
    fn accessor(&self, member: &MemberInfo) -> Option<Accessor>;

    fn object_name(&self, _object: ObjectRef) -> Option<String> {
        None
    }

    fn find_object(&self, _name: &str) -> Option<ObjectRef> {
        None
    }

    fn members(&self, ty: &TypeName) -> Vec<MemberInfo> {
        let mut members = self.fields(ty);
        members.extend(self.properties(ty));
        members
    }

    fn find_member(&self, ty: &TypeName, name: &str) -> Option<MemberInfo> {
        self.members(ty).into_iter().find(|m| m.name == name)
    }

    fn value_type(&self, value: &Value) -> Option<TypeName> {
        match value {
            Value::Object(object) => self.object_type(*object),
            other => other.primitive_type(),
        }
    }
}
