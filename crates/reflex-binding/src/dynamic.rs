// In-memory object model
// Types are declared at runtime; objects are bags of member values addressed by handle.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::BindingError;
use crate::model::{
    Accessor, MemberAccessor, MemberInfo, MemberKind, ObjectModel, ObjectRef, TypeName, Value,
};

/// Declaration of one member of a [`TypeDef`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDef {
    pub name: String,
    pub value_type: TypeName,
    pub kind: MemberKind,
    pub writable: bool,
}

/// Declaration of a host type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: TypeName,
    pub base: Option<TypeName>,
    pub members: Vec<MemberDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            base: None,
            members: Vec::new(),
        }
    }

    pub fn base(mut self, base: impl Into<TypeName>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn field(self, name: impl Into<String>, value_type: impl Into<TypeName>) -> Self {
        self.member(MemberDef {
            name: name.into(),
            value_type: value_type.into(),
            kind: MemberKind::Field,
            writable: true,
        })
    }

    pub fn property(self, name: impl Into<String>, value_type: impl Into<TypeName>) -> Self {
        self.member(MemberDef {
            name: name.into(),
            value_type: value_type.into(),
            kind: MemberKind::Property,
            writable: true,
        })
    }

    pub fn read_only_property(
        self,
        name: impl Into<String>,
        value_type: impl Into<TypeName>,
    ) -> Self {
        self.member(MemberDef {
            name: name.into(),
            value_type: value_type.into(),
            kind: MemberKind::Property,
            writable: false,
        })
    }

    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }
}

#[derive(Debug)]
struct ObjectData {
    ty: TypeName,
    name: Option<String>,
    values: HashMap<String, Value>,
    behaviors: Vec<ObjectRef>,
}

#[derive(Debug, Default)]
struct Store {
    types: BTreeMap<TypeName, TypeDef>,
    objects: BTreeMap<ObjectRef, ObjectData>,
    names: HashMap<String, ObjectRef>,
    next_id: u64,
}

impl Store {
    /// Members of `ty` and its bases, most derived first
    fn members(&self, ty: &TypeName) -> Vec<MemberInfo> {
        let mut members = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.types.get(ty);

        while let Some(def) = current {
            if !visited.insert(def.name.clone()) {
                break;
            }
            members.extend(def.members.iter().map(|m| MemberInfo {
                declaring_type: def.name.clone(),
                name: m.name.clone(),
                value_type: m.value_type.clone(),
                kind: m.kind,
                writable: m.writable,
            }));
            current = def.base.as_ref().and_then(|base| self.types.get(base));
        }
        members
    }

    fn is_assignable(&self, target: &TypeName, source: &TypeName) -> bool {
        if target == source {
            return true;
        }
        if target.as_str() == TypeName::OBJECT {
            return self.types.contains_key(source);
        }

        let mut visited = HashSet::new();
        let mut current = self.types.get(source);
        while let Some(def) = current {
            if !visited.insert(def.name.clone()) {
                break;
            }
            if &def.name == target {
                return true;
            }
            current = def.base.as_ref().and_then(|base| self.types.get(base));
        }
        false
    }

    fn value_type(&self, value: &Value) -> Option<TypeName> {
        match value {
            Value::Object(object) => self.objects.get(object).map(|o| o.ty.clone()),
            other => other.primitive_type(),
        }
    }

    /// Check `value` against a member's declared type, widening ints to floats
    fn coerce(&self, member: &MemberInfo, value: Value) -> Result<Value, BindingError> {
        if member.value_type.as_str() == TypeName::FLOAT {
            if let Value::Int(v) = value {
                return Ok(Value::Float(v as f64));
            }
        }

        let found = self
            .value_type(&value)
            .ok_or_else(|| match &value {
                Value::Object(object) => BindingError::UnknownObject(*object),
                _ => BindingError::UnknownType(member.value_type.clone()),
            })?;
        if !self.is_assignable(&member.value_type, &found) {
            return Err(BindingError::TypeMismatch {
                member: member.name.clone(),
                expected: member.value_type.clone(),
                found,
            });
        }
        Ok(value)
    }

    fn object_for(&self, target: &Value, member: &MemberInfo) -> Result<ObjectRef, BindingError> {
        let object = target.as_object().ok_or_else(|| BindingError::NotAnObject {
            member: member.name.clone(),
        })?;
        let data = self
            .objects
            .get(&object)
            .ok_or(BindingError::UnknownObject(object))?;
        if !self.is_assignable(&member.declaring_type, &data.ty) {
            return Err(BindingError::TypeMismatch {
                member: member.name.clone(),
                expected: member.declaring_type.clone(),
                found: data.ty.clone(),
            });
        }
        Ok(object)
    }
}

fn default_value(ty: &TypeName) -> Option<Value> {
    match ty.as_str() {
        TypeName::BOOL => Some(Value::Bool(false)),
        TypeName::INT => Some(Value::Int(0)),
        TypeName::FLOAT => Some(Value::Float(0.0)),
        TypeName::STRING => Some(Value::Str(String::new())),
        _ => None,
    }
}

struct DynamicAccessor {
    store: Weak<RefCell<Store>>,
    member: MemberInfo,
}

impl DynamicAccessor {
    fn store(&self, target: &Value) -> Result<Rc<RefCell<Store>>, BindingError> {
        self.store.upgrade().ok_or_else(|| match target.as_object() {
            Some(object) => BindingError::UnknownObject(object),
            None => BindingError::NotAnObject {
                member: self.member.name.clone(),
            },
        })
    }
}

impl MemberAccessor for DynamicAccessor {
    fn get(&self, target: &Value) -> Result<Option<Value>, BindingError> {
        let store = self.store(target)?;
        let store = store.borrow();
        let object = store.object_for(target, &self.member)?;
        Ok(store
            .objects
            .get(&object)
            .and_then(|data| data.values.get(&self.member.name))
            .cloned())
    }

    fn set(&self, target: &Value, value: Value) -> Result<(), BindingError> {
        let store = self.store(target)?;
        let mut store = store.borrow_mut();
        let object = store.object_for(target, &self.member)?;
        let value = store.coerce(&self.member, value)?;
        if let Some(data) = store.objects.get_mut(&object) {
            data.values.insert(self.member.name.clone(), value);
        }
        Ok(())
    }
}

/// Shared handle to an in-memory object model. Clones see the same objects.
#[derive(Debug, Clone, Default)]
pub struct DynamicModel {
    store: Rc<RefCell<Store>>,
}

impl DynamicModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a type
    pub fn define_type(&self, def: TypeDef) {
        let mut store = self.store.borrow_mut();
        if store.types.contains_key(&def.name) {
            debug!(target: "binding", "Redefining type {}", def.name);
        }
        store.types.insert(def.name.clone(), def);
    }

    pub fn has_type(&self, ty: &TypeName) -> bool {
        self.store.borrow().types.contains_key(ty)
    }

    pub fn type_names(&self) -> Vec<TypeName> {
        self.store.borrow().types.keys().cloned().collect()
    }

    /// Create an object of `ty` with primitive members set to their defaults
    pub fn spawn(
        &self,
        ty: impl Into<TypeName>,
        name: Option<&str>,
    ) -> Result<ObjectRef, BindingError> {
        let ty = ty.into();
        let mut store = self.store.borrow_mut();
        if !store.types.contains_key(&ty) {
            return Err(BindingError::UnknownType(ty));
        }
        if let Some(name) = name {
            if store.names.contains_key(name) {
                return Err(BindingError::DuplicateObject(name.to_string()));
            }
        }

        let values = store
            .members(&ty)
            .into_iter()
            .filter_map(|m| default_value(&m.value_type).map(|v| (m.name, v)))
            .collect();

        let object = ObjectRef::new(store.next_id);
        store.next_id += 1;
        store.objects.insert(
            object,
            ObjectData {
                ty: ty.clone(),
                name: name.map(str::to_string),
                values,
                behaviors: Vec::new(),
            },
        );
        if let Some(name) = name {
            store.names.insert(name.to_string(), object);
        }

        debug!(target: "binding", "Spawned {} {} ({:?})", ty, object, name);
        Ok(object)
    }

    /// Attach `behavior` to `object`
    pub fn attach(&self, object: ObjectRef, behavior: ObjectRef) -> Result<(), BindingError> {
        let mut store = self.store.borrow_mut();
        if !store.objects.contains_key(&behavior) {
            return Err(BindingError::UnknownObject(behavior));
        }
        let data = store
            .objects
            .get_mut(&object)
            .ok_or(BindingError::UnknownObject(object))?;
        data.behaviors.push(behavior);
        Ok(())
    }

    /// Host-side write; bypasses the writable flag but still type-checks
    pub fn set_field(
        &self,
        object: ObjectRef,
        name: &str,
        value: Value,
    ) -> Result<(), BindingError> {
        let mut store = self.store.borrow_mut();
        let ty = store
            .objects
            .get(&object)
            .map(|o| o.ty.clone())
            .ok_or(BindingError::UnknownObject(object))?;
        let member = store
            .members(&ty)
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| BindingError::MemberNotFound {
                ty,
                member: name.to_string(),
            })?;
        let value = store.coerce(&member, value)?;
        if let Some(data) = store.objects.get_mut(&object) {
            data.values.insert(member.name, value);
        }
        Ok(())
    }

    pub fn field(&self, object: ObjectRef, name: &str) -> Option<Value> {
        self.store
            .borrow()
            .objects
            .get(&object)
            .and_then(|o| o.values.get(name))
            .cloned()
    }

    pub fn find(&self, name: &str) -> Option<ObjectRef> {
        self.store.borrow().names.get(name).copied()
    }

    pub fn objects(&self) -> Vec<ObjectRef> {
        self.store.borrow().objects.keys().copied().collect()
    }
}

impl ObjectModel for DynamicModel {
    fn attached_behaviors(&self, object: ObjectRef) -> Vec<ObjectRef> {
        self.store
            .borrow()
            .objects
            .get(&object)
            .map(|o| o.behaviors.clone())
            .unwrap_or_default()
    }

    fn object_type(&self, object: ObjectRef) -> Option<TypeName> {
        self.store.borrow().objects.get(&object).map(|o| o.ty.clone())
    }

    fn fields(&self, ty: &TypeName) -> Vec<MemberInfo> {
        self.store
            .borrow()
            .members(ty)
            .into_iter()
            .filter(|m| m.kind == MemberKind::Field)
            .collect()
    }

    fn properties(&self, ty: &TypeName) -> Vec<MemberInfo> {
        self.store
            .borrow()
            .members(ty)
            .into_iter()
            .filter(|m| m.kind == MemberKind::Property)
            .collect()
    }

    fn is_assignable(&self, target: &TypeName, source: &TypeName) -> bool {
        self.store.borrow().is_assignable(target, source)
    }

    fn accessor(&self, member: &MemberInfo) -> Option<Accessor> {
        Some(Rc::new(DynamicAccessor {
            store: Rc::downgrade(&self.store),
            member: member.clone(),
        }))
    }

    fn object_name(&self, object: ObjectRef) -> Option<String> {
        self.store
            .borrow()
            .objects
            .get(&object)
            .and_then(|o| o.name.clone())
    }

    fn find_object(&self, name: &str) -> Option<ObjectRef> {
        self.find(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DynamicModel {
        let model = DynamicModel::new();
        model.define_type(TypeDef::new("Behavior").field("enabled", TypeName::BOOL));
        model.define_type(
            TypeDef::new("Mover")
                .base("Behavior")
                .field("speed", TypeName::FLOAT),
        );
        model
    }

    #[test]
    fn test_inherited_members_keep_declaring_type() {
        let model = model();
        let fields = model.fields(&"Mover".into());
        let names: Vec<_> = fields
            .iter()
            .map(|m| (m.declaring_type.as_str(), m.name.as_str()))
            .collect();
        assert_eq!(names, vec![("Mover", "speed"), ("Behavior", "enabled")]);
    }

    #[test]
    fn test_assignability_follows_base_chain() {
        let model = model();
        assert!(model.is_assignable(&"Behavior".into(), &"Mover".into()));
        assert!(!model.is_assignable(&"Mover".into(), &"Behavior".into()));
        assert!(model.is_assignable(&TypeName::new(TypeName::OBJECT), &"Mover".into()));
        assert!(!model.is_assignable(&TypeName::new(TypeName::OBJECT), &TypeName::new(TypeName::INT)));
    }

    #[test]
    fn test_spawn_sets_defaults_and_rejects_duplicates() {
        let model = model();
        let mover = model.spawn("Mover", Some("mover")).unwrap();

        assert_eq!(model.field(mover, "speed"), Some(Value::Float(0.0)));
        assert_eq!(model.field(mover, "enabled"), Some(Value::Bool(false)));
        assert_eq!(model.find("mover"), Some(mover));
        assert_eq!(
            model.spawn("Mover", Some("mover")),
            Err(BindingError::DuplicateObject("mover".into()))
        );
        assert!(matches!(
            model.spawn("Ghost", None),
            Err(BindingError::UnknownType(_))
        ));
    }

    #[test]
    fn test_set_field_type_checks_and_widens_ints() {
        let model = model();
        let mover = model.spawn("Mover", None).unwrap();

        model.set_field(mover, "speed", Value::Int(3)).unwrap();
        assert_eq!(model.field(mover, "speed"), Some(Value::Float(3.0)));
        assert!(matches!(
            model.set_field(mover, "enabled", Value::Int(1)),
            Err(BindingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_attached_behaviors_in_order() {
        let model = model();
        let owner = model.spawn("Behavior", None).unwrap();
        let a = model.spawn("Mover", None).unwrap();
        let b = model.spawn("Mover", None).unwrap();
        model.attach(owner, a).unwrap();
        model.attach(owner, b).unwrap();

        assert_eq!(model.attached_behaviors(owner), vec![a, b]);
        assert!(model.attach(owner, ObjectRef::new(99)).is_err());
    }
}
