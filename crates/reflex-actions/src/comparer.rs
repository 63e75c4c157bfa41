use std::cmp::Ordering;

use reflex_binding::Value;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Relation applied by a compare condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Comparer {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
}

impl Comparer {
    /// Compare two values. `None` when the operands can not be related this way.
    ///
    /// Ints and floats compare numerically with each other, strings lexically.
    /// Booleans and object references only support (in)equality.
    pub fn compare(&self, left: &Value, right: &Value) -> Option<bool> {
        let ordering = match (left, right) {
            (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
            (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
            (l, r) => match (l.as_f64(), r.as_f64()) {
                (Some(l), Some(r)) => l.partial_cmp(&r),
                _ => None,
            },
        };

        match ordering {
            Some(ordering) => Some(self.accepts(ordering)),
            None => self.compare_equality(left, right),
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Comparer::Equal => ordering == Ordering::Equal,
            Comparer::NotEqual => ordering != Ordering::Equal,
            Comparer::Less => ordering == Ordering::Less,
            Comparer::LessOrEqual => ordering != Ordering::Greater,
            Comparer::Greater => ordering == Ordering::Greater,
            Comparer::GreaterOrEqual => ordering != Ordering::Less,
        }
    }

    fn compare_equality(&self, left: &Value, right: &Value) -> Option<bool> {
        let comparable = matches!(
            (left, right),
            (Value::Bool(_), Value::Bool(_)) | (Value::Object(_), Value::Object(_))
        );
        if !comparable {
            return None;
        }
        match self {
            Comparer::Equal => Some(left == right),
            Comparer::NotEqual => Some(left != right),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use reflex_binding::ObjectRef;

    use super::*;

    #[test]
    fn test_numeric_across_int_and_float() {
        assert_eq!(Comparer::Less.compare(&Value::Int(2), &Value::Float(2.5)), Some(true));
        assert_eq!(Comparer::Equal.compare(&Value::Float(3.0), &Value::Int(3)), Some(true));
        assert_eq!(Comparer::GreaterOrEqual.compare(&Value::Int(3), &Value::Int(4)), Some(false));
        assert_eq!(Comparer::LessOrEqual.compare(&Value::Int(4), &Value::Int(4)), Some(true));
    }

    #[test]
    fn test_strings_compare_lexically() {
        assert_eq!(
            Comparer::Greater.compare(&Value::from("beta"), &Value::from("alpha")),
            Some(true)
        );
        assert_eq!(
            Comparer::NotEqual.compare(&Value::from("a"), &Value::from("a")),
            Some(false)
        );
    }

    #[test]
    fn test_bools_and_objects_only_support_equality() {
        assert_eq!(Comparer::Equal.compare(&Value::Bool(true), &Value::Bool(true)), Some(true));
        assert_eq!(Comparer::Less.compare(&Value::Bool(false), &Value::Bool(true)), None);

        let a = Value::Object(ObjectRef::new(1));
        let b = Value::Object(ObjectRef::new(2));
        assert_eq!(Comparer::NotEqual.compare(&a, &b), Some(true));
        assert_eq!(Comparer::Greater.compare(&a, &b), None);
    }

    #[test]
    fn test_incompatible_operands() {
        assert_eq!(Comparer::Equal.compare(&Value::Int(1), &Value::from("1")), None);
        assert_eq!(Comparer::Equal.compare(&Value::Bool(true), &Value::Int(1)), None);
        assert_eq!(Comparer::Less.compare(&Value::Float(f64::NAN), &Value::Int(1)), None);
    }

    #[test]
    fn test_display_symbols() {
        assert_eq!(Comparer::LessOrEqual.to_string(), "<=");
        assert_eq!(Comparer::NotEqual.to_string(), "!=");
    }
}
