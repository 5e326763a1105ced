//! Persisted authoring graph.
//!
//! The editor saves a tree as a flat list of nodes that reference each
//! other by [`NodeId`]. [`GraphAsset::build_tree`] validates the structure,
//! resolves leaf names through a [`LeafRegistry`] and produces a template
//! [`Tree`]. Layout metadata rides along in the asset for tooling and is
//! never read by the engine.
//!
//! # Structural rules
//!
//! - exactly one `Root`, and nothing references it
//! - ids are unique and every reference resolves
//! - every node has at most one parent
//! - nodes unreachable from the root are dropped with a warning

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::composite::Composite;
use crate::config::EngineConfig;
use crate::decorator::Decorator;
use crate::error::GraphError;
use crate::tree::{NodeIndex, NodeKind, NodeSlot};
use crate::{
    AlwaysFailure, AlwaysRunning, AlwaysSuccess, Behavior, CompositeKind, DecoratorRule, NodeId,
    Tree,
};

/// A saved behavior graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphAsset {
    pub nodes: Vec<NodeSpec>,
}

/// One authored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub kind: NodeKindSpec,
    /// Editor position; ignored at runtime.
    #[serde(default)]
    pub layout: Option<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKindSpec {
    Root {
        #[serde(default)]
        child: Option<NodeId>,
    },
    Composite {
        kind: CompositeKind,
        #[serde(default)]
        children: Vec<NodeId>,
        /// Falls back to [`EngineConfig::default_cascade`].
        #[serde(default)]
        cascade: Option<bool>,
    },
    Decorator {
        rule: DecoratorRule,
        #[serde(default)]
        child: Option<NodeId>,
    },
    Leaf {
        name: String,
    },
}

impl NodeKindSpec {
    /// Referenced child ids, in evaluation order.
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKindSpec::Root { child } | NodeKindSpec::Decorator { child, .. } => {
                child.as_slice()
            }
            NodeKindSpec::Composite { children, .. } => children,
            NodeKindSpec::Leaf { .. } => &[],
        }
    }

    /// Returns `true` for the `Root` kind.
    pub fn is_root(&self) -> bool {
        matches!(self, NodeKindSpec::Root { .. })
    }
}

type LeafFactory<C> = Box<dyn Fn() -> Box<dyn Behavior<C>> + Send + Sync>;

/// Maps leaf names used in graph assets to constructors.
///
/// [`LeafRegistry::new`] pre-registers `succeed`, `fail` and `running`.
pub struct LeafRegistry<C> {
    factories: BTreeMap<String, LeafFactory<C>>,
}

impl<C: 'static> LeafRegistry<C> {
    /// Registry with the built-in leaves.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("succeed", || AlwaysSuccess);
        registry.register("fail", || AlwaysFailure);
        registry.register("running", || AlwaysRunning);
        registry
    }

    /// Registry with no leaves at all.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<B, F>(&mut self, name: impl Into<String>, factory: F)
    where
        B: Behavior<C> + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into(), Box::new(move || -> Box<dyn Behavior<C>> {
                Box::new(factory())
            }));
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds a fresh leaf for `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Behavior<C>>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl<C: 'static> Default for LeafRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphAsset {
    /// Validates the graph and builds a template tree from it.
    pub fn build_tree<C: 'static>(
        &self,
        registry: &LeafRegistry<C>,
        config: &EngineConfig,
    ) -> Result<Tree<C>, GraphError> {
        let root = self.validate(registry)?;

        let by_id: BTreeMap<NodeId, &NodeSpec> =
            self.nodes.iter().map(|node| (node.id, node)).collect();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let root_spec = by_id.get(&root).ok_or(GraphError::MissingRoot)?;
        emit(root_spec, &by_id, registry, config, &mut nodes)?;

        if nodes.len() < self.nodes.len() {
            let reachable: BTreeSet<NodeId> = nodes.iter().map(|slot| slot.id).collect();
            let dropped: Vec<NodeId> = self
                .nodes
                .iter()
                .map(|node| node.id)
                .filter(|id| !reachable.contains(id))
                .collect();
            tracing::warn!(?dropped, "dropping graph nodes unreachable from the root");
        }

        Tree::from_arena(nodes)
    }

    /// Checks the structural rules and returns the root's id.
    pub fn validate<C: 'static>(&self, registry: &LeafRegistry<C>) -> Result<NodeId, GraphError> {
        let mut by_id: BTreeMap<NodeId, &NodeSpec> = BTreeMap::new();
        for node in &self.nodes {
            if by_id.insert(node.id, node).is_some() {
                return Err(GraphError::DuplicateId(node.id));
            }
        }

        let roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|node| node.kind.is_root())
            .map(|node| node.id)
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(GraphError::MissingRoot),
            [root] => *root,
            _ => return Err(GraphError::MultipleRoots(roots.clone())),
        };

        let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for node in &self.nodes {
            for &child in node.kind.children() {
                match by_id.get(&child) {
                    None => {
                        return Err(GraphError::UnknownNode {
                            parent: node.id,
                            child,
                        });
                    }
                    Some(spec) if spec.kind.is_root() => {
                        return Err(GraphError::RootReferenced {
                            parent: node.id,
                            root: child,
                        });
                    }
                    Some(_) => {}
                }
                if let Some(&first) = parents.get(&child) {
                    return Err(GraphError::SharedChild {
                        child,
                        first,
                        second: node.id,
                    });
                }
                parents.insert(child, node.id);
            }

            if let NodeKindSpec::Leaf { name } = &node.kind
                && !registry.contains(name)
            {
                return Err(GraphError::UnknownLeaf {
                    id: node.id,
                    name: name.clone(),
                });
            }
        }

        Ok(root)
    }

    /// Describes an existing tree as an asset. Leaves are saved by name.
    pub fn from_tree<C>(tree: &Tree<C>) -> Self {
        let nodes = tree
            .slots()
            .iter()
            .map(|slot| {
                let child_ids = |children: &[NodeIndex]| -> Vec<NodeId> {
                    children.iter().map(|&c| tree.slots()[c.get()].id).collect()
                };
                let kind = match &slot.kind {
                    NodeKind::Root { child } => NodeKindSpec::Root {
                        child: child_ids(child.as_slice()).first().copied(),
                    },
                    NodeKind::Composite(c) => NodeKindSpec::Composite {
                        kind: c.kind,
                        children: child_ids(&c.children),
                        cascade: Some(c.cascade),
                    },
                    NodeKind::Decorator(d) => NodeKindSpec::Decorator {
                        rule: d.rule.clone(),
                        child: child_ids(d.child.as_slice()).first().copied(),
                    },
                    NodeKind::Leaf(behavior) => NodeKindSpec::Leaf {
                        name: behavior.name().to_owned(),
                    },
                };
                NodeSpec {
                    id: slot.id,
                    kind,
                    layout: None,
                }
            })
            .collect();
        Self { nodes }
    }

    /// Looks up an authored node by id.
    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

fn emit<C: 'static>(
    spec: &NodeSpec,
    by_id: &BTreeMap<NodeId, &NodeSpec>,
    registry: &LeafRegistry<C>,
    config: &EngineConfig,
    nodes: &mut Vec<NodeSlot<C>>,
) -> Result<NodeIndex, GraphError> {
    let kind = match &spec.kind {
        NodeKindSpec::Root { .. } => NodeKind::Root { child: None },
        NodeKindSpec::Composite { kind, cascade, .. } => NodeKind::Composite(Composite::new(
            *kind,
            cascade.unwrap_or(config.default_cascade),
        )),
        NodeKindSpec::Decorator { rule, .. } => NodeKind::Decorator(Decorator::new(rule.clone())),
        NodeKindSpec::Leaf { name } => {
            let behavior = registry
                .create(name)
                .ok_or_else(|| GraphError::UnknownLeaf {
                    id: spec.id,
                    name: name.clone(),
                })?;
            NodeKind::Leaf(behavior)
        }
    };

    let index = NodeIndex(nodes.len());
    nodes.push(NodeSlot::new(spec.id, kind));

    let mut children = Vec::with_capacity(spec.kind.children().len());
    for &child in spec.kind.children() {
        let child_spec = by_id.get(&child).ok_or(GraphError::UnknownNode {
            parent: spec.id,
            child,
        })?;
        children.push(emit(child_spec, by_id, registry, config, nodes)?);
    }
    nodes[index.get()].kind.set_children(children);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    fn node(id: u64, kind: NodeKindSpec) -> NodeSpec {
        NodeSpec {
            id: NodeId(id),
            kind,
            layout: None,
        }
    }

    fn leaf(id: u64, name: &str) -> NodeSpec {
        node(id, NodeKindSpec::Leaf { name: name.into() })
    }

    fn root(id: u64, child: Option<u64>) -> NodeSpec {
        node(
            id,
            NodeKindSpec::Root {
                child: child.map(NodeId),
            },
        )
    }

    fn sequence(id: u64, children: &[u64]) -> NodeSpec {
        node(
            id,
            NodeKindSpec::Composite {
                kind: CompositeKind::Sequence,
                children: children.iter().copied().map(NodeId).collect(),
                cascade: None,
            },
        )
    }

    fn build(asset: &GraphAsset) -> Result<Tree<()>, GraphError> {
        asset.build_tree(&LeafRegistry::new(), &EngineConfig::default())
    }

    #[test]
    fn builds_in_preorder_regardless_of_listing_order() {
        let asset = GraphAsset {
            nodes: vec![
                leaf(3, "succeed"),
                sequence(2, &[4, 3]),
                root(1, Some(2)),
                leaf(4, "fail"),
            ],
        };
        let tree = build(&asset).unwrap();
        let ids: Vec<u64> = tree.nodes().map(|view| view.id.0).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);

        let mut instance = tree.instantiate();
        instance.start();
        assert_eq!(instance.update(&mut ()), Status::Failure);
    }

    #[test]
    fn root_rules() {
        let missing = GraphAsset {
            nodes: vec![leaf(1, "succeed")],
        };
        assert_eq!(build(&missing).unwrap_err(), GraphError::MissingRoot);

        let twice = GraphAsset {
            nodes: vec![root(1, None), root(2, None)],
        };
        assert_eq!(
            build(&twice).unwrap_err(),
            GraphError::MultipleRoots(vec![NodeId(1), NodeId(2)])
        );

        let referenced = GraphAsset {
            nodes: vec![root(1, Some(2)), sequence(2, &[1])],
        };
        assert_eq!(
            build(&referenced).unwrap_err(),
            GraphError::RootReferenced {
                parent: NodeId(2),
                root: NodeId(1)
            }
        );
    }

    #[test]
    fn reference_rules() {
        let dangling = GraphAsset {
            nodes: vec![root(1, Some(9))],
        };
        assert_eq!(
            build(&dangling).unwrap_err(),
            GraphError::UnknownNode {
                parent: NodeId(1),
                child: NodeId(9)
            }
        );

        let shared = GraphAsset {
            nodes: vec![root(1, Some(2)), sequence(2, &[3, 3]), leaf(3, "succeed")],
        };
        assert_eq!(
            build(&shared).unwrap_err(),
            GraphError::SharedChild {
                child: NodeId(3),
                first: NodeId(2),
                second: NodeId(2)
            }
        );

        let duplicate = GraphAsset {
            nodes: vec![root(1, None), leaf(1, "succeed")],
        };
        assert_eq!(
            build(&duplicate).unwrap_err(),
            GraphError::DuplicateId(NodeId(1))
        );
    }

    #[test]
    fn unknown_leaf_is_rejected() {
        let asset = GraphAsset {
            nodes: vec![root(1, Some(2)), leaf(2, "declare_war")],
        };
        assert_eq!(
            build(&asset).unwrap_err(),
            GraphError::UnknownLeaf {
                id: NodeId(2),
                name: "declare_war".into()
            }
        );
    }

    #[test]
    fn unreachable_nodes_are_dropped() {
        let asset = GraphAsset {
            nodes: vec![
                root(1, Some(2)),
                leaf(2, "succeed"),
                sequence(5, &[6]),
                leaf(6, "fail"),
            ],
        };
        let tree = build(&asset).unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.node(NodeId(5)).is_none());
    }

    #[test]
    fn cascade_defaults_from_config() {
        let asset = GraphAsset {
            nodes: vec![
                root(1, Some(2)),
                sequence(2, &[3, 4]),
                leaf(3, "succeed"),
                leaf(4, "succeed"),
            ],
        };
        let config = EngineConfig {
            default_cascade: false,
            ..EngineConfig::default()
        };
        let template: Tree<()> = asset.build_tree(&LeafRegistry::new(), &config).unwrap();
        let mut tree = template.instantiate();
        tree.start();
        assert_eq!(tree.update(&mut ()), Status::Running);
        assert_eq!(tree.update(&mut ()), Status::Success);
    }

    #[test]
    fn from_tree_describes_structure() {
        let asset = GraphAsset {
            nodes: vec![root(1, Some(2)), sequence(2, &[3, 4]), leaf(3, "succeed"), leaf(4, "fail")],
        };
        let tree = build(&asset).unwrap();
        let exported = GraphAsset::from_tree(&tree);

        assert_eq!(exported.nodes.len(), 4);
        assert_eq!(exported.node(NodeId(2)).unwrap().kind.children(), &[NodeId(3), NodeId(4)]);
        assert_eq!(
            exported.node(NodeId(4)).unwrap().kind,
            NodeKindSpec::Leaf { name: "fail".into() }
        );
        assert!(build(&exported).is_ok());
    }

    #[test]
    fn custom_leaves_register_by_name() {
        let mut registry = LeafRegistry::<()>::empty();
        assert!(!registry.contains("succeed"));
        registry.register("hold_the_line", || AlwaysRunning);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["hold_the_line"]);
        assert!(registry.create("hold_the_line").is_some());
    }
}
