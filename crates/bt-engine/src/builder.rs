//! Builder utilities for ergonomic behavior tree construction.
//!
//! Trees are described as nested [`Blueprint`]s and flattened into an arena
//! by [`crate::Tree::build`]. The helper functions keep the nesting readable:
//!
//! ```rust
//! use bt_engine::builder::{compare, leaf, repeat, selector, sequence};
//! use bt_engine::{AlwaysFailure, AlwaysSuccess, CompareOp, Tree};
//!
//! let template: Tree<()> = Tree::build(Some(repeat(selector(vec![
//!     compare("armies", CompareOp::Greater, 3, leaf(AlwaysSuccess)),
//!     sequence(vec![leaf(AlwaysFailure), leaf(AlwaysSuccess)]).cascade(false),
//! ]))))
//! .unwrap();
//! assert_eq!(template.len(), 8);
//! ```

use crate::{Behavior, CompareOp, CompositeKind, DecoratorRule, NodeId};

/// Authoring description of a node and everything below it.
pub struct Blueprint<C> {
    pub(crate) id: Option<NodeId>,
    pub(crate) shape: Shape<C>,
}

pub(crate) enum Shape<C> {
    Composite {
        kind: CompositeKind,
        cascade: Option<bool>,
        children: Vec<Blueprint<C>>,
    },
    Decorator {
        rule: DecoratorRule,
        child: Option<Box<Blueprint<C>>>,
    },
    Leaf(Box<dyn Behavior<C>>),
}

impl<C> Blueprint<C> {
    /// Creates a composite over `children`, in evaluation order.
    pub fn composite(kind: CompositeKind, children: Vec<Blueprint<C>>) -> Self {
        Self {
            id: None,
            shape: Shape::Composite {
                kind,
                cascade: None,
                children,
            },
        }
    }

    /// Creates a decorator with at most one child.
    pub fn decorator(rule: DecoratorRule, child: Option<Blueprint<C>>) -> Self {
        Self {
            id: None,
            shape: Shape::Decorator {
                rule,
                child: child.map(Box::new),
            },
        }
    }

    /// Wraps an already boxed leaf behavior.
    pub fn leaf(behavior: Box<dyn Behavior<C>>) -> Self {
        Self {
            id: None,
            shape: Shape::Leaf(behavior),
        }
    }

    /// Pins the node's identity instead of letting the builder assign one.
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets whether a composite may advance through several children in a
    /// single update. Ignored for other shapes.
    pub fn cascade(mut self, enabled: bool) -> Self {
        if let Shape::Composite { cascade, .. } = &mut self.shape {
            *cascade = Some(enabled);
        }
        self
    }

    /// Makes a `Compare`/`HasValue` gate evaluate once per activation
    /// instead of on every update. Ignored for other shapes.
    pub fn evaluate_once(mut self) -> Self {
        if let Shape::Decorator {
            rule:
                DecoratorRule::Compare { evaluate_once, .. }
                | DecoratorRule::HasValue { evaluate_once, .. },
            ..
        } = &mut self.shape
        {
            *evaluate_once = true;
        }
        self
    }

    pub(crate) fn collect_ids(&self, out: &mut Vec<NodeId>) {
        out.extend(self.id);
        match &self.shape {
            Shape::Composite { children, .. } => {
                for child in children {
                    child.collect_ids(out);
                }
            }
            Shape::Decorator {
                child: Some(child), ..
            } => child.collect_ids(out),
            Shape::Decorator { child: None, .. } | Shape::Leaf(_) => {}
        }
    }
}

/// Creates a sequence node.
#[inline]
pub fn sequence<C>(children: Vec<Blueprint<C>>) -> Blueprint<C> {
    Blueprint::composite(CompositeKind::Sequence, children)
}

/// Creates a selector node.
#[inline]
pub fn selector<C>(children: Vec<Blueprint<C>>) -> Blueprint<C> {
    Blueprint::composite(CompositeKind::Selector, children)
}

/// Creates an invert node.
#[inline]
pub fn invert<C>(child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(DecoratorRule::Invert, Some(child))
}

/// Creates a repeat node.
#[inline]
pub fn repeat<C>(child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(DecoratorRule::Repeat, Some(child))
}

/// Creates a reset node.
#[inline]
pub fn reset<C>(child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(DecoratorRule::Reset, Some(child))
}

/// Creates an always-succeed node.
#[inline]
pub fn always_succeed<C>(child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(DecoratorRule::AlwaysSucceed, Some(child))
}

/// Creates a compare gate: `blackboard[key] <op> threshold`.
#[inline]
pub fn compare<C>(
    key: impl Into<String>,
    op: CompareOp,
    threshold: i64,
    child: Blueprint<C>,
) -> Blueprint<C> {
    Blueprint::decorator(
        DecoratorRule::Compare {
            key: key.into(),
            op,
            threshold,
            evaluate_once: false,
        },
        Some(child),
    )
}

/// Creates a gate that passes while `key` is on the blackboard.
#[inline]
pub fn has_value<C>(key: impl Into<String>, child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(
        DecoratorRule::HasValue {
            key: key.into(),
            invert: false,
            evaluate_once: false,
        },
        Some(child),
    )
}

/// Creates a gate that passes while `key` is absent from the blackboard.
#[inline]
pub fn lacks_value<C>(key: impl Into<String>, child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(
        DecoratorRule::HasValue {
            key: key.into(),
            invert: true,
            evaluate_once: false,
        },
        Some(child),
    )
}

/// Creates an increment node.
#[inline]
pub fn increment<C>(key: impl Into<String>, child: Blueprint<C>) -> Blueprint<C> {
    Blueprint::decorator(DecoratorRule::Increment { key: key.into() }, Some(child))
}

/// Wraps a leaf behavior.
#[inline]
pub fn leaf<C>(behavior: impl Behavior<C> + 'static) -> Blueprint<C> {
    Blueprint::leaf(Box::new(behavior))
}
