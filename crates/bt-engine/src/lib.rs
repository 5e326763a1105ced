//! Resumable behavior tree engine for agent decision making.
//!
//! A tree is authored once as a template, then instantiated per agent. Each
//! instance owns its node runtime state and a private [`Blackboard`], and is
//! polled with [`Tree::update`] once per driver tick. Nodes that return
//! `Running` are resumed on the next update instead of being restarted.
//!
//! - **Shared templates**: [`Tree::instantiate`] deep-copies a template into
//!   pristine runtime state; templates are never ticked
//! - **Arena storage**: nodes live in one pre-ordered `Vec`, addressed by
//!   [`NodeIndex`] and looked up by stable [`NodeId`]
//! - **Infallible ticking**: runtime problems surface as `Failure`; only
//!   construction returns errors ([`GraphError`])
//!
//! # Architecture
//!
//! - [`Behavior`]: trait implemented by leaves
//! - [`Status`]: Running, Success or Failure
//! - Composite nodes: [`CompositeKind::Sequence`], [`CompositeKind::Selector`]
//! - Decorator nodes: [`DecoratorRule`]
//! - Authoring: [`builder`] helpers in code, [`GraphAsset`] from RON files
//! - Driving: [`Brain`] binds an instance to an agent and ticks it on a cadence

pub mod blackboard;
pub mod brain;
pub mod builder;
pub mod composite;
pub mod config;
pub mod decorator;
pub mod error;
pub mod graph;
pub mod leaf;
pub mod loader;
pub mod node;
pub mod status;
pub mod tree;

// Re-export core types for ergonomic API
pub use blackboard::{Blackboard, Value};
pub use brain::{Brain, tick_brains};
pub use builder::Blueprint;
pub use composite::CompositeKind;
pub use config::{BrainConfig, EngineConfig};
pub use decorator::{CompareOp, DecoratorRule};
pub use error::GraphError;
pub use graph::{GraphAsset, LeafRegistry, NodeKindSpec, NodeSpec};
pub use leaf::{Action, AlwaysFailure, AlwaysRunning, AlwaysSuccess, Condition};
pub use loader::{ConfigLoader, GraphLoader, LoadResult};
pub use node::{Behavior, BehaviorClone, NodeId, NodeKindTag, NodeState, TickContext};
pub use status::Status;
pub use tree::{NodeIndex, NodeSnapshot, NodeView, Tree};
