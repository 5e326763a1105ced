//! Composite behavior nodes.
//!
//! Composite nodes control the execution flow of an ordered list of
//! children: [`CompositeKind::Sequence`] (AND logic) and
//! [`CompositeKind::Selector`] (OR logic). Child order is evaluation order.
//!
//! # Cascading
//!
//! Both kinds carry a `cascade` flag. With `cascade` set, a child that
//! finishes with the "keep going" outcome lets the composite move on to the
//! next child within the same update. Without it, the composite advances its
//! cursor and reports `Running`, so the next child is first polled on the
//! following update.

use serde::{Deserialize, Serialize};

use crate::Status;
use crate::tree::NodeIndex;

/// Which short-circuit rule a composite follows.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CompositeKind {
    /// Runs children in order until one fails.
    ///
    /// - `Failure` from a child: **stops immediately** and returns `Failure`
    /// - `Success` from a child: advances to the next child
    /// - all children succeeded (or no children): `Success`
    Sequence,

    /// Runs children in order until one succeeds.
    ///
    /// - `Success` from a child: **stops immediately** and returns `Success`
    /// - `Failure` from a child: advances to the next child
    /// - all children failed (or no children): `Failure`
    Selector,
}

impl CompositeKind {
    /// The child outcome that moves the cursor forward. It is also the
    /// composite's own result once every child has produced it.
    #[inline]
    pub fn advances_on(self) -> Status {
        match self {
            CompositeKind::Sequence => Status::Success,
            CompositeKind::Selector => Status::Failure,
        }
    }
}

/// Runtime data of a composite node inside a tree arena.
#[derive(Debug, Clone)]
pub(crate) struct Composite {
    pub(crate) kind: CompositeKind,
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) cursor: usize,
    pub(crate) cascade: bool,
}

impl Composite {
    pub(crate) fn new(kind: CompositeKind, cascade: bool) -> Self {
        Self {
            kind,
            children: Vec::new(),
            cursor: 0,
            cascade,
        }
    }

    pub(crate) fn on_start(&mut self) {
        self.cursor = 0;
    }

    /// The child to poll next, or the composite's result if there is none.
    pub(crate) fn next_child(&self) -> Result<NodeIndex, Status> {
        self.children
            .get(self.cursor)
            .copied()
            .ok_or(self.kind.advances_on())
    }

    /// Folds the status of the child under the cursor into the composite.
    ///
    /// Returns `Some(status)` when the composite must return from the
    /// current update, `None` when it should poll the next child right away.
    pub(crate) fn resolve(&mut self, child: Status) -> Option<Status> {
        if child.is_running() {
            return Some(Status::Running);
        }
        if child != self.kind.advances_on() {
            return Some(child);
        }

        self.cursor += 1;
        if self.cursor == self.children.len() {
            Some(child)
        } else if self.cascade {
            None
        } else {
            Some(Status::Running)
        }
    }

    /// Copy of the static configuration with a rewound cursor and no children.
    pub(crate) fn duplicate(&self) -> Self {
        Self::new(self.kind, self.cascade)
    }
}
