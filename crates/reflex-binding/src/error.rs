use crate::model::{ObjectRef, TypeName};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("member {declaring}.{member} can not follow a step of type {found}")]
    ChainTypeMismatch {
        declaring: TypeName,
        member: String,
        found: TypeName,
    },

    #[error("step {index} of {path} is null")]
    NullIntermediate { path: String, index: usize },

    #[error("type {ty} has no member named {member}")]
    MemberNotFound { ty: TypeName, member: String },

    #[error("member {declaring}.{member} has no resolved accessor")]
    Unresolved { declaring: TypeName, member: String },

    #[error("binding has no steps")]
    EmptyPath,

    #[error("binding has no root component")]
    NoComponent,

    #[error("member {member} is read-only")]
    ReadOnly { member: String },

    #[error("member {member} expects {expected}, got {found}")]
    TypeMismatch {
        member: String,
        expected: TypeName,
        found: TypeName,
    },

    #[error("member {member} was accessed on a non-object value")]
    NotAnObject { member: String },

    #[error("unknown type {0}")]
    UnknownType(TypeName),

    #[error("unknown object {0}")]
    UnknownObject(ObjectRef),

    #[error("object name {0} is already taken")]
    DuplicateObject(String),
}
