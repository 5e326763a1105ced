//! Tree: the node arena, its blackboard and the update interpreter.
//!
//! # Templates and instances
//!
//! A tree built from a [`Blueprint`] or loaded from a graph asset is a
//! **template**. Templates are never started and never ticked; drivers call
//! [`Tree::instantiate`] to get a private instance, [`Tree::start`] it once,
//! then [`Tree::update`] it on their own schedule. Instantiation deep-copies
//! the arena into fresh storage, so an instance shares no mutable state with
//! its template or with sibling instances.
//!
//! # Arena layout
//!
//! Nodes live in a `Vec` in pre-order; the root is always at index 0 and
//! children refer to each other by [`NodeIndex`]. The id registry maps each
//! stable [`NodeId`] to its index for tooling lookups.

use std::collections::BTreeMap;
use std::fmt;

use crate::builder::{Blueprint, Shape};
use crate::composite::Composite;
use crate::config::EngineConfig;
use crate::decorator::Decorator;
use crate::error::GraphError;
use crate::{Behavior, Blackboard, NodeId, NodeKindTag, NodeState, Status, TickContext};

/// Position of a node inside its tree's arena.
///
/// Indices are only meaningful for the tree that produced them; an
/// instance re-resolves every index when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Raw arena position.
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

pub(crate) enum NodeKind<C> {
    Root { child: Option<NodeIndex> },
    Composite(Composite),
    Decorator(Decorator),
    Leaf(Box<dyn Behavior<C>>),
}

impl<C> NodeKind<C> {
    pub(crate) fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Root { .. } => NodeKindTag::Root,
            NodeKind::Composite(c) => match c.kind {
                crate::CompositeKind::Sequence => NodeKindTag::Sequence,
                crate::CompositeKind::Selector => NodeKindTag::Selector,
            },
            NodeKind::Decorator(d) => d.rule.tag(),
            NodeKind::Leaf(_) => NodeKindTag::Leaf,
        }
    }

    pub(crate) fn children(&self) -> &[NodeIndex] {
        match self {
            NodeKind::Root { child } => child.as_slice(),
            NodeKind::Composite(c) => &c.children,
            NodeKind::Decorator(d) => d.child.as_slice(),
            NodeKind::Leaf(_) => &[],
        }
    }

    /// Attaches children in order. Root and decorators keep the first one.
    pub(crate) fn set_children(&mut self, children: Vec<NodeIndex>) {
        match self {
            NodeKind::Root { child } => *child = children.first().copied(),
            NodeKind::Composite(c) => c.children = children,
            NodeKind::Decorator(d) => d.child = children.first().copied(),
            NodeKind::Leaf(_) => debug_assert!(children.is_empty(), "leaves have no children"),
        }
    }

    /// Static configuration with rewound runtime fields and no children.
    fn duplicate(&self) -> Self {
        match self {
            NodeKind::Root { .. } => NodeKind::Root { child: None },
            NodeKind::Composite(c) => NodeKind::Composite(c.duplicate()),
            NodeKind::Decorator(d) => NodeKind::Decorator(d.duplicate()),
            NodeKind::Leaf(behavior) => NodeKind::Leaf(behavior.clone_box()),
        }
    }

    fn rewind(&mut self) {
        match self {
            NodeKind::Composite(c) => c.cursor = 0,
            NodeKind::Decorator(d) => d.cached_gate = false,
            NodeKind::Root { .. } | NodeKind::Leaf(_) => {}
        }
    }
}

pub(crate) struct NodeSlot<C> {
    pub(crate) id: NodeId,
    pub(crate) state: NodeState,
    pub(crate) kind: NodeKind<C>,
}

impl<C> NodeSlot<C> {
    pub(crate) fn new(id: NodeId, kind: NodeKind<C>) -> Self {
        Self {
            id,
            state: NodeState::default(),
            kind,
        }
    }
}

/// Read-only view of one node, handed out by traversal and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView<'a> {
    pub id: NodeId,
    pub index: NodeIndex,
    pub kind: NodeKindTag,
    pub state: NodeState,
    /// Leaf name for leaves, `None` for engine nodes.
    pub name: Option<&'a str>,
    pub depth: usize,
}

/// Every engine-owned runtime field of one node.
///
/// Two snapshots compare equal exactly when the engine state of the two
/// nodes is the same; leaf-private fields are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKindTag,
    pub state: NodeState,
    /// Composite cursor.
    pub cursor: Option<usize>,
    /// Cached gate of `evaluate_once` decorators.
    pub cached_gate: Option<bool>,
}

/// A behavior tree: node arena, id registry, blackboard and cached state.
pub struct Tree<C> {
    nodes: Vec<NodeSlot<C>>,
    registry: BTreeMap<NodeId, NodeIndex>,
    blackboard: Option<Blackboard>,
    state: Status,
}

impl<C> Tree<C> {
    /// Builds a template from a blueprint of the root's child.
    ///
    /// Composites without an explicit cascade flag use
    /// [`EngineConfig::default`]'s value.
    pub fn build(root_child: Option<Blueprint<C>>) -> Result<Self, GraphError> {
        Self::build_with_config(root_child, &EngineConfig::default())
    }

    /// Builds a template from a blueprint, using `config` for defaults.
    pub fn build_with_config(
        root_child: Option<Blueprint<C>>,
        config: &EngineConfig,
    ) -> Result<Self, GraphError> {
        let mut reserved = Vec::new();
        if let Some(child) = &root_child {
            child.collect_ids(&mut reserved);
        }
        let mut ids = IdAllocator::new(reserved);

        let mut nodes = vec![NodeSlot::new(ids.next(), NodeKind::Root { child: None })];
        if let Some(child) = root_child {
            let index = flatten(child, &mut nodes, &mut ids, config);
            nodes[0].kind.set_children(vec![index]);
        }

        Self::from_arena(nodes)
    }

    /// Wraps a pre-ordered arena whose slot 0 is the root.
    pub(crate) fn from_arena(nodes: Vec<NodeSlot<C>>) -> Result<Self, GraphError> {
        debug_assert!(
            matches!(nodes.first().map(|n| &n.kind), Some(NodeKind::Root { .. })),
            "arena must start with the root"
        );

        let mut tree = Self {
            nodes,
            registry: BTreeMap::new(),
            blackboard: None,
            state: Status::Running,
        };

        let mut order = Vec::with_capacity(tree.nodes.len());
        tree.traverse(|view| order.push((view.id, view.index)));
        for (id, index) in order {
            if tree.registry.insert(id, index).is_some() {
                return Err(GraphError::DuplicateId(id));
            }
        }

        Ok(tree)
    }

    /// Produces a private runtime instance of this tree.
    ///
    /// The root and everything below it are deep-copied in pre-order into a
    /// fresh arena, every child reference is re-resolved to the new indices,
    /// and the registry is rebuilt by traversing the copy. The instance has
    /// pristine runtime state, no blackboard until [`Tree::start`], and
    /// shares nothing mutable with `self`.
    pub fn instantiate(&self) -> Self {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        self.copy_subtree(NodeIndex::ROOT, &mut nodes);

        let mut registry = BTreeMap::new();
        let mut copy = Self {
            nodes,
            registry: BTreeMap::new(),
            blackboard: None,
            state: Status::Running,
        };
        copy.traverse(|view| {
            registry.insert(view.id, view.index);
        });
        copy.registry = registry;

        tracing::trace!(nodes = copy.nodes.len(), "instantiated behavior tree");
        copy
    }

    fn copy_subtree(&self, index: NodeIndex, out: &mut Vec<NodeSlot<C>>) -> NodeIndex {
        let slot = &self.nodes[index.0];
        let copied = NodeIndex(out.len());
        out.push(NodeSlot::new(slot.id, slot.kind.duplicate()));

        let children = slot
            .kind
            .children()
            .iter()
            .map(|&child| self.copy_subtree(child, out))
            .collect();
        out[copied.0].kind.set_children(children);
        copied
    }

    /// Binds this instance and gives it a fresh blackboard.
    ///
    /// # Panics
    ///
    /// Panics if the instance was already started; each instance is started
    /// exactly once.
    pub fn start(&mut self) {
        assert!(
            self.blackboard.is_none(),
            "behavior tree instance started twice"
        );
        self.blackboard = Some(Blackboard::new());
        tracing::debug!(nodes = self.nodes.len(), "behavior tree instance started");
    }

    /// Returns `true` once [`Tree::start`] has run.
    pub fn is_started(&self) -> bool {
        self.blackboard.is_some()
    }

    /// Polls the tree once.
    ///
    /// Does nothing once the cached root state is terminal: a finished tree
    /// stays inert until it is [rearmed](Tree::rearm) or discarded.
    ///
    /// # Panics
    ///
    /// Panics if the tree was never started. Ticking a template is an
    /// integration bug.
    pub fn update(&mut self, driver: &mut C) -> Status {
        let Some(blackboard) = self.blackboard.as_mut() else {
            panic!("behavior tree updated before start");
        };
        if self.state.is_terminal() {
            return self.state;
        }

        let mut exec = Executor {
            nodes: self.nodes.as_mut_slice(),
            blackboard,
            driver,
        };
        self.state = exec.update(NodeIndex::ROOT);

        if self.state.is_terminal() {
            tracing::debug!(status = %self.state, "behavior tree finished");
        }
        self.state
    }

    /// Cached root-level state.
    pub fn state(&self) -> Status {
        self.state
    }

    /// Forces the cached root state to `Failure` without running any hooks.
    ///
    /// This is the cancellation verb. Nodes that were `Running` keep their
    /// started flag; [`Tree::rearm`] clears them if the instance is reused.
    pub fn halt(&mut self) {
        tracing::debug!(previous = %self.state, "behavior tree halted");
        self.state = Status::Failure;
    }

    /// Puts every node back to idle and the cached state back to `Running`.
    ///
    /// Activation counts are kept, so leaves see `first_activation == false`
    /// on their next start.
    pub fn rearm(&mut self) {
        for slot in &mut self.nodes {
            slot.state.clear();
            slot.kind.rewind();
        }
        self.state = Status::Running;
        tracing::debug!("behavior tree rearmed");
    }

    /// The instance's blackboard, `None` until [`Tree::start`].
    pub fn blackboard(&self) -> Option<&Blackboard> {
        self.blackboard.as_ref()
    }

    /// Mutable access to the instance's blackboard, `None` until started.
    pub fn blackboard_mut(&mut self) -> Option<&mut Blackboard> {
        self.blackboard.as_mut()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the root has no child.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// View of the root node.
    pub fn root(&self) -> NodeView<'_> {
        self.view(NodeIndex::ROOT, 0)
    }

    /// Looks up a node by its stable id.
    pub fn node(&self, id: NodeId) -> Option<NodeView<'_>> {
        self.registry.get(&id).map(|&index| self.view(index, 0))
    }

    /// Children of `id` in evaluation order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.registry
            .get(&id)
            .map(|&index| {
                self.nodes[index.0]
                    .kind
                    .children()
                    .iter()
                    .map(|&child| self.nodes[child.0].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flat registry: every node in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeView<'_>> {
        let mut views = Vec::with_capacity(self.nodes.len());
        self.traverse(|view| views.push(view));
        views.into_iter()
    }

    /// Pre-order depth-first walk of the whole tree.
    pub fn traverse<'a>(&'a self, visit: impl FnMut(NodeView<'a>)) {
        self.traverse_from(NodeIndex::ROOT, visit);
    }

    /// Pre-order depth-first walk of the subtree rooted at `from`.
    ///
    /// Returns `false` if `from` is not part of this tree.
    pub fn traverse_node<'a>(&'a self, from: NodeId, visit: impl FnMut(NodeView<'a>)) -> bool {
        match self.registry.get(&from) {
            Some(&index) => {
                self.traverse_from(index, visit);
                true
            }
            None => false,
        }
    }

    fn traverse_from<'a>(&'a self, from: NodeIndex, mut visit: impl FnMut(NodeView<'a>)) {
        let mut stack = vec![(from, 0)];
        while let Some((index, depth)) = stack.pop() {
            visit(self.view(index, depth));
            let children = self.nodes[index.0].kind.children();
            stack.extend(children.iter().rev().map(|&child| (child, depth + 1)));
        }
    }

    fn view(&self, index: NodeIndex, depth: usize) -> NodeView<'_> {
        let slot = &self.nodes[index.0];
        NodeView {
            id: slot.id,
            index,
            kind: slot.kind.tag(),
            state: slot.state,
            name: match &slot.kind {
                NodeKind::Leaf(behavior) => Some(behavior.name()),
                _ => None,
            },
            depth,
        }
    }

    pub(crate) fn slots(&self) -> &[NodeSlot<C>] {
        &self.nodes
    }

    /// Engine-owned runtime state of every node, in arena order.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .iter()
            .map(|slot| NodeSnapshot {
                id: slot.id,
                kind: slot.kind.tag(),
                state: slot.state,
                cursor: match &slot.kind {
                    NodeKind::Composite(c) => Some(c.cursor),
                    _ => None,
                },
                cached_gate: match &slot.kind {
                    NodeKind::Decorator(d) => Some(d.cached_gate),
                    _ => None,
                },
            })
            .collect()
    }
}

impl<C> fmt::Debug for Tree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .field("started", &self.is_started())
            .field("state", &self.state)
            .finish()
    }
}

/// Hands out node ids, skipping every id an author already chose.
struct IdAllocator {
    reserved: Vec<NodeId>,
    next: u64,
}

impl IdAllocator {
    fn new(mut reserved: Vec<NodeId>) -> Self {
        reserved.sort_unstable();
        Self { reserved, next: 0 }
    }

    fn next(&mut self) -> NodeId {
        while self.reserved.binary_search(&NodeId(self.next)).is_ok() {
            self.next += 1;
        }
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

fn flatten<C>(
    blueprint: Blueprint<C>,
    nodes: &mut Vec<NodeSlot<C>>,
    ids: &mut IdAllocator,
    config: &EngineConfig,
) -> NodeIndex {
    let id = blueprint.id.unwrap_or_else(|| ids.next());
    let index = NodeIndex(nodes.len());

    let (kind, children) = match blueprint.shape {
        Shape::Composite {
            kind,
            cascade,
            children,
        } => {
            let cascade = cascade.unwrap_or(config.default_cascade);
            (NodeKind::Composite(Composite::new(kind, cascade)), children)
        }
        Shape::Decorator { rule, child } => (
            NodeKind::Decorator(Decorator::new(rule)),
            child.map(|c| vec![*c]).unwrap_or_default(),
        ),
        Shape::Leaf(behavior) => (NodeKind::Leaf(behavior), Vec::new()),
    };
    nodes.push(NodeSlot::new(id, kind));

    let children = children
        .into_iter()
        .map(|child| flatten(child, nodes, ids, config))
        .collect();
    nodes[index.0].kind.set_children(children);
    index
}

/// Borrowed view of one instance while it is being updated.
///
/// The arena is borrowed mutably for the whole update, so no hook can
/// restructure the tree while a composite is iterating its children.
struct Executor<'a, C> {
    nodes: &'a mut [NodeSlot<C>],
    blackboard: &'a mut Blackboard,
    driver: &'a mut C,
}

impl<C> Executor<'_, C> {
    /// The single entry point every node is updated through.
    fn update(&mut self, index: NodeIndex) -> Status {
        if !self.nodes[index.0].state.started {
            let first = self.nodes[index.0].state.activations == 0;
            self.on_start(index, first);
            let state = &mut self.nodes[index.0].state;
            state.activations = state.activations.saturating_add(1);
            state.started = true;
        }

        let status = self.on_update(index);
        self.nodes[index.0].state.current = status;

        if status.is_terminal() {
            self.on_stop(index);
            self.nodes[index.0].state.started = false;
        }
        status
    }

    fn on_start(&mut self, index: NodeIndex, first_activation: bool) {
        let slot = &mut self.nodes[index.0];
        match &mut slot.kind {
            NodeKind::Root { .. } => {}
            NodeKind::Composite(c) => c.on_start(),
            NodeKind::Decorator(d) => d.on_start(self.blackboard),
            NodeKind::Leaf(behavior) => {
                let mut ctx = TickContext::new(slot.id, self.blackboard, self.driver);
                behavior.on_start(&mut ctx, first_activation);
            }
        }
    }

    fn on_update(&mut self, index: NodeIndex) -> Status {
        let slot = &mut self.nodes[index.0];
        match &mut slot.kind {
            NodeKind::Root { child } => {
                let child = *child;
                match child {
                    Some(child) => self.update(child),
                    None => Status::Success,
                }
            }
            NodeKind::Composite(_) => self.update_composite(index),
            NodeKind::Decorator(d) => {
                if !d.admits(self.blackboard) {
                    return Status::Failure;
                }
                let child = d.child;
                let child_status = child.map(|child| self.update(child));
                decorator(self.nodes, index).map(child_status)
            }
            NodeKind::Leaf(behavior) => {
                let mut ctx = TickContext::new(slot.id, self.blackboard, self.driver);
                behavior.on_update(&mut ctx)
            }
        }
    }

    fn update_composite(&mut self, index: NodeIndex) -> Status {
        loop {
            let child = match composite(self.nodes, index).next_child() {
                Ok(child) => child,
                Err(exhausted) => return exhausted,
            };
            let status = self.update(child);
            if let Some(result) = composite(self.nodes, index).resolve(status) {
                return result;
            }
        }
    }

    fn on_stop(&mut self, index: NodeIndex) {
        let slot = &mut self.nodes[index.0];
        let status = slot.state.current;
        match &mut slot.kind {
            NodeKind::Decorator(d) => {
                if d.resets_subtree_on(status) {
                    self.reset_subtree(index);
                }
            }
            NodeKind::Leaf(behavior) => {
                let mut ctx = TickContext::new(slot.id, self.blackboard, self.driver);
                behavior.on_stop(&mut ctx);
            }
            NodeKind::Root { .. } | NodeKind::Composite(_) => {}
        }
    }

    /// Forces every descendant of `index` (not `index` itself) back to idle,
    /// visiting them in pre-order.
    fn reset_subtree(&mut self, index: NodeIndex) {
        let mut stack: Vec<NodeIndex> =
            self.nodes[index.0].kind.children().iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            let slot = &mut self.nodes[next.0];
            slot.state.clear();
            stack.extend(slot.kind.children().iter().rev().copied());
        }
        tracing::trace!(node = %self.nodes[index.0].id, "reset subtree after failure");
    }
}

fn composite<C>(nodes: &mut [NodeSlot<C>], index: NodeIndex) -> &mut Composite {
    match &mut nodes[index.0].kind {
        NodeKind::Composite(c) => c,
        _ => unreachable!("node {index} is not a composite"),
    }
}

fn decorator<C>(nodes: &mut [NodeSlot<C>], index: NodeIndex) -> &mut Decorator {
    match &mut nodes[index.0].kind {
        NodeKind::Decorator(d) => d,
        _ => unreachable!("node {index} is not a decorator"),
    }
}
