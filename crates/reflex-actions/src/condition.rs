// Condition trees
// Evaluation is pure and never fails: missing children and unreadable bindings count
// as false so a half-authored tree fails safe.

use std::fmt;

use reflex_binding::{ComponentMemberPath, Value};
use tracing::debug;

use crate::comparer::Comparer;
use crate::context::ActionContext;

pub trait Condition {
    fn kind(&self) -> &'static str;

    fn evaluate(&self, ctx: &ActionContext<'_>) -> bool;

    /// Infix rendering of the tree, for logs and the console
    fn describe(&self) -> String;
}

fn evaluate_child(child: &Option<Box<dyn Condition>>, parent: &str, ctx: &ActionContext<'_>) -> bool {
    match child {
        Some(child) => child.evaluate(ctx),
        None => {
            debug!(target: "actions", "{} condition is missing a child, treating it as false", parent);
            false
        }
    }
}

fn describe_child(child: &Option<Box<dyn Condition>>) -> String {
    child
        .as_ref()
        .map_or_else(|| "<missing>".to_string(), |c| c.describe())
}

// ===== Leaves =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantCondition(pub bool);

impl Condition for ConstantCondition {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn evaluate(&self, _ctx: &ActionContext<'_>) -> bool {
        self.0
    }

    fn describe(&self) -> String {
        self.0.to_string()
    }
}

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Member(ComponentMemberPath),
    Constant(Value),
}

impl Operand {
    pub fn read(&self) -> Option<Value> {
        match self {
            Operand::Member(path) => path.get_value(),
            Operand::Constant(value) => Some(value.clone()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Member(path) => write!(f, "{}", path),
            Operand::Constant(value) => write!(f, "{}", value),
        }
    }
}

/// Reads two operands and relates them with a [`Comparer`]
#[derive(Debug, Clone)]
pub struct CompareCondition {
    pub left: Operand,
    pub comparer: Comparer,
    pub right: Operand,
}

impl CompareCondition {
    pub fn new(left: Operand, comparer: Comparer, right: Operand) -> Self {
        Self {
            left,
            comparer,
            right,
        }
    }
}

impl Condition for CompareCondition {
    fn kind(&self) -> &'static str {
        "compare"
    }

    fn evaluate(&self, _ctx: &ActionContext<'_>) -> bool {
        let (Some(left), Some(right)) = (self.left.read(), self.right.read()) else {
            debug!(target: "actions", "Comparison {} has a null operand", self.describe());
            return false;
        };

        self.comparer.compare(&left, &right).unwrap_or_else(|| {
            debug!(
                target: "actions",
                "Can not compare {} {} {}",
                left,
                self.comparer,
                right
            );
            false
        })
    }

    fn describe(&self) -> String {
        format!("{} {} {}", self.left, self.comparer, self.right)
    }
}

// ===== Combinators =====

#[derive(Default)]
pub struct AndCondition {
    pub left: Option<Box<dyn Condition>>,
    pub right: Option<Box<dyn Condition>>,
}

impl AndCondition {
    pub fn new(left: Box<dyn Condition>, right: Box<dyn Condition>) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }
}

impl Condition for AndCondition {
    fn kind(&self) -> &'static str {
        "and"
    }

    fn evaluate(&self, ctx: &ActionContext<'_>) -> bool {
        evaluate_child(&self.left, "AND", ctx) && evaluate_child(&self.right, "AND", ctx)
    }

    fn describe(&self) -> String {
        format!("({} AND {})", describe_child(&self.left), describe_child(&self.right))
    }
}

#[derive(Default)]
pub struct OrCondition {
    pub left: Option<Box<dyn Condition>>,
    pub right: Option<Box<dyn Condition>>,
}

impl OrCondition {
    pub fn new(left: Box<dyn Condition>, right: Box<dyn Condition>) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }
}

impl Condition for OrCondition {
    fn kind(&self) -> &'static str {
        "or"
    }

    fn evaluate(&self, ctx: &ActionContext<'_>) -> bool {
        evaluate_child(&self.left, "OR", ctx) || evaluate_child(&self.right, "OR", ctx)
    }

    fn describe(&self) -> String {
        format!("({} OR {})", describe_child(&self.left), describe_child(&self.right))
    }
}

/// Negation. A missing child makes the whole node false rather than true.
#[derive(Default)]
pub struct NotCondition {
    pub inner: Option<Box<dyn Condition>>,
}

impl NotCondition {
    pub fn new(inner: Box<dyn Condition>) -> Self {
        Self { inner: Some(inner) }
    }
}

impl Condition for NotCondition {
    fn kind(&self) -> &'static str {
        "not"
    }

    fn evaluate(&self, ctx: &ActionContext<'_>) -> bool {
        match &self.inner {
            Some(inner) => !inner.evaluate(ctx),
            None => {
                debug!(target: "actions", "NOT condition is missing its child, treating it as false");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("NOT {}", describe_child(&self.inner))
    }
}
