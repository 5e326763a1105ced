//! Decorator behavior nodes.
//!
//! Decorators wrap at most one child and filter, transform or augment its
//! result. The plain decorator is a transparent pass-through; every
//! [`DecoratorRule`] refines that in one of three places:
//!
//! - on activation (`Increment`, and the `evaluate_once` gates)
//! - before polling the child (`Compare` and `HasValue` gates)
//! - when mapping the child's status (`Invert`, `Repeat`, `AlwaysSucceed`)
//!
//! `Reset` additionally acts on stop; the tree handles that part because it
//! needs to walk the decorator's subtree.

use serde::{Deserialize, Serialize};

use crate::tree::NodeIndex;
use crate::{Blackboard, NodeKindTag, Status};

/// Comparison used by [`DecoratorRule::Compare`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
pub enum CompareOp {
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "<")]
    Less,
}

impl CompareOp {
    /// Evaluates `lhs <op> rhs`.
    #[inline]
    pub fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CompareOp::Equal => lhs == rhs,
            CompareOp::NotEqual => lhs != rhs,
            CompareOp::Greater => lhs > rhs,
            CompareOp::Less => lhs < rhs,
        }
    }
}

/// Static configuration of a decorator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecoratorRule {
    /// Swaps `Success` and `Failure`; `Running` passes through.
    Invert,

    /// Ticks the child, ignores its result and always reports `Running`.
    ///
    /// A repeat never finishes on its own. It ends when its instance is
    /// discarded or halted.
    Repeat,

    /// Mirrors its child. When it stops with `Failure`, every node below it
    /// is forced back to idle so the next activation starts clean.
    Reset,

    /// Maps `Failure` to `Success`; `Running` passes through.
    AlwaysSucceed,

    /// Gates the child on `blackboard[key] <op> threshold`.
    ///
    /// The value is coerced with [`crate::Value::coerce_int`]; a missing key
    /// reads as `0`. A false gate reports `Failure` without polling the
    /// child.
    Compare {
        key: String,
        op: CompareOp,
        threshold: i64,
        /// Evaluate once on activation instead of on every update.
        #[serde(default)]
        evaluate_once: bool,
    },

    /// Gates the child on the presence of `key` (absence when `invert`).
    HasValue {
        key: String,
        #[serde(default)]
        invert: bool,
        /// Evaluate once on activation instead of on every update.
        #[serde(default)]
        evaluate_once: bool,
    },

    /// Increments the integer under `key` (missing reads as `0`) on every
    /// activation, then passes its child through.
    Increment { key: String },
}

impl DecoratorRule {
    /// Kind tag reported by traversal.
    pub fn tag(&self) -> NodeKindTag {
        match self {
            DecoratorRule::Invert => NodeKindTag::Invert,
            DecoratorRule::Repeat => NodeKindTag::Repeat,
            DecoratorRule::Reset => NodeKindTag::Reset,
            DecoratorRule::AlwaysSucceed => NodeKindTag::AlwaysSucceed,
            DecoratorRule::Compare { .. } => NodeKindTag::Compare,
            DecoratorRule::HasValue { .. } => NodeKindTag::HasValue,
            DecoratorRule::Increment { .. } => NodeKindTag::Increment,
        }
    }

    fn gate(&self, bb: &Blackboard) -> bool {
        match self {
            DecoratorRule::Compare {
                key, op, threshold, ..
            } => op.apply(bb.int_or(key, 0), *threshold),
            DecoratorRule::HasValue { key, invert, .. } => bb.contains(key) != *invert,
            _ => true,
        }
    }

    fn evaluates_once(&self) -> bool {
        match self {
            DecoratorRule::Compare { evaluate_once, .. }
            | DecoratorRule::HasValue { evaluate_once, .. } => *evaluate_once,
            _ => false,
        }
    }
}

/// Runtime data of a decorator node inside a tree arena.
#[derive(Debug, Clone)]
pub(crate) struct Decorator {
    pub(crate) rule: DecoratorRule,
    pub(crate) child: Option<NodeIndex>,
    /// Gate computed on activation for `evaluate_once` gates.
    pub(crate) cached_gate: bool,
}

impl Decorator {
    pub(crate) fn new(rule: DecoratorRule) -> Self {
        Self {
            rule,
            child: None,
            cached_gate: false,
        }
    }

    pub(crate) fn on_start(&mut self, bb: &mut Blackboard) {
        if let DecoratorRule::Increment { key } = &self.rule {
            let next = bb.int_or(key, 0).saturating_add(1);
            bb.set(key.clone(), next);
        }
        if self.rule.evaluates_once() {
            self.cached_gate = self.rule.gate(bb);
        }
    }

    /// Whether the child may be polled during this update.
    pub(crate) fn admits(&self, bb: &Blackboard) -> bool {
        if self.rule.evaluates_once() {
            self.cached_gate
        } else {
            self.rule.gate(bb)
        }
    }

    /// Maps the child's status (`None` when there is no child) to the
    /// decorator's own result.
    pub(crate) fn map(&self, child: Option<Status>) -> Status {
        let status = child.unwrap_or(Status::Success);
        match self.rule {
            DecoratorRule::Invert => status.invert(),
            DecoratorRule::Repeat => Status::Running,
            DecoratorRule::AlwaysSucceed if status.is_failure() => Status::Success,
            _ => status,
        }
    }

    pub(crate) fn resets_subtree_on(&self, status: Status) -> bool {
        matches!(self.rule, DecoratorRule::Reset) && status.is_failure()
    }

    pub(crate) fn duplicate(&self) -> Self {
        Self::new(self.rule.clone())
    }
}
