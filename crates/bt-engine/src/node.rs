//! Node identity, runtime state and the leaf contract.
//!
//! The engine owns the update algorithm for every node kind. Game code
//! plugs in leaves by implementing [`Behavior`], which only exposes the
//! three lifecycle hooks the engine calls from its single entry point.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Blackboard, Status};

/// Stable identity of a node.
///
/// Assigned once when a graph is authored or built, preserved by
/// [`crate::Tree::instantiate`], and unique within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        NodeId(value)
    }
}

/// Engine-owned execution state of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeState {
    /// Result of the most recent `on_update`.
    pub current: Status,
    /// Set between `on_start` and `on_stop`.
    pub started: bool,
    /// Number of times `on_start` has run on this instance.
    pub activations: u32,
}

impl NodeState {
    /// Forces the node back to idle so its next update starts a fresh activation.
    pub(crate) fn clear(&mut self) {
        self.started = false;
        self.current = Status::Running;
    }
}

/// Kind of a node, as seen by traversal and tooling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NodeKindTag {
    Root,
    Sequence,
    Selector,
    Invert,
    Repeat,
    Reset,
    AlwaysSucceed,
    Compare,
    HasValue,
    Increment,
    Leaf,
}

/// What a leaf sees while one of its hooks runs.
///
/// The blackboard belongs to the tree instance the leaf is bound to; the
/// driver context is whatever the owner passed to [`crate::Tree::update`].
/// Both borrows last for a single hook call.
pub struct TickContext<'a, C> {
    id: NodeId,
    blackboard: &'a mut Blackboard,
    driver: &'a mut C,
}

impl<'a, C> TickContext<'a, C> {
    pub(crate) fn new(id: NodeId, blackboard: &'a mut Blackboard, driver: &'a mut C) -> Self {
        Self {
            id,
            blackboard,
            driver,
        }
    }

    /// Identity of the node being updated.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The bound tree's blackboard.
    pub fn blackboard(&self) -> &Blackboard {
        self.blackboard
    }

    /// Mutable access to the bound tree's blackboard.
    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        self.blackboard
    }

    /// The driver context passed to [`crate::Tree::update`].
    pub fn driver(&self) -> &C {
        self.driver
    }

    /// Mutable access to the driver context.
    pub fn driver_mut(&mut self) -> &mut C {
        self.driver
    }
}

/// A leaf node that can be updated against a driver context `C`.
///
/// Leaves must keep cross-update state only in their own fields, and must
/// not assume `on_start` runs more than once per activation.
pub trait Behavior<C>: BehaviorClone<C> + Send + Sync {
    /// Called once when the leaf is activated, before the first `on_update`.
    ///
    /// `first_activation` is `true` only the first time this instance of the
    /// leaf is ever activated.
    fn on_start(&mut self, _ctx: &mut TickContext<'_, C>, _first_activation: bool) {}

    /// Does one step of work.
    ///
    /// Returning `Running` asks to be polled again on a later update.
    fn on_update(&mut self, ctx: &mut TickContext<'_, C>) -> Status;

    /// Called right after `on_update` returned `Success` or `Failure`.
    fn on_stop(&mut self, _ctx: &mut TickContext<'_, C>) {}

    /// Name used in traces and by the graph leaf registry.
    fn name(&self) -> &str {
        "leaf"
    }
}

/// Object-safe cloning for boxed leaves.
///
/// Implemented automatically for every `Behavior` that is also `Clone`.
pub trait BehaviorClone<C> {
    fn clone_box(&self) -> Box<dyn Behavior<C>>;
}

impl<C, T> BehaviorClone<C> for T
where
    T: Behavior<C> + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Behavior<C>> {
        Box::new(self.clone())
    }
}

impl<C> Clone for Box<dyn Behavior<C>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
