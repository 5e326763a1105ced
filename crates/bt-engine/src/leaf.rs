//! Built-in leaves.
//!
//! Game rules live in leaves written by the game; the leaves here are the
//! constant outcomes used for wiring and tests, plus closure adapters for
//! quick conditions and actions.

use crate::{Behavior, Blackboard, Status, TickContext};

/// Always returns `Success`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSuccess;

impl<C> Behavior<C> for AlwaysSuccess {
    fn on_update(&mut self, _ctx: &mut TickContext<'_, C>) -> Status {
        Status::Success
    }

    fn name(&self) -> &str {
        "succeed"
    }
}

/// Always returns `Failure`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFailure;

impl<C> Behavior<C> for AlwaysFailure {
    fn on_update(&mut self, _ctx: &mut TickContext<'_, C>) -> Status {
        Status::Failure
    }

    fn name(&self) -> &str {
        "fail"
    }
}

/// Always returns `Running`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRunning;

impl<C> Behavior<C> for AlwaysRunning {
    fn on_update(&mut self, _ctx: &mut TickContext<'_, C>) -> Status {
        Status::Running
    }

    fn name(&self) -> &str {
        "running"
    }
}

/// Succeeds when the predicate holds, fails otherwise.
///
/// Conditions only read state; they never return `Running`.
#[derive(Clone)]
pub struct Condition<F> {
    name: &'static str,
    cond: F,
}

impl<F> Condition<F> {
    /// Wraps a predicate over the blackboard and driver.
    pub fn new<C>(name: &'static str, cond: F) -> Self
    where
        F: Fn(&Blackboard, &C) -> bool,
    {
        Self { name, cond }
    }
}

impl<C, F> Behavior<C> for Condition<F>
where
    F: Fn(&Blackboard, &C) -> bool + Clone + Send + Sync + 'static,
{
    fn on_update(&mut self, ctx: &mut TickContext<'_, C>) -> Status {
        if (self.cond)(ctx.blackboard(), ctx.driver()) {
            Status::Success
        } else {
            Status::Failure
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Runs a closure as the leaf's `on_update`.
#[derive(Clone)]
pub struct Action<F> {
    name: &'static str,
    run: F,
}

impl<F> Action<F> {
    /// Wraps a closure run on every update.
    pub fn new<C>(name: &'static str, run: F) -> Self
    where
        F: FnMut(&mut TickContext<'_, C>) -> Status,
    {
        Self { name, run }
    }
}

impl<C, F> Behavior<C> for Action<F>
where
    F: FnMut(&mut TickContext<'_, C>) -> Status + Clone + Send + Sync + 'static,
{
    fn on_update(&mut self, ctx: &mut TickContext<'_, C>) -> Status {
        (self.run)(ctx)
    }

    fn name(&self) -> &str {
        self.name
    }
}
