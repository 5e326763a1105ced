//! Reference driver that owns one tree instance per agent.
//!
//! A [`Brain`] holds a shared template, instantiates and starts a private
//! copy when it is bound, and polls that copy on the cadence given by its
//! [`BrainConfig`]. Dropping or unbinding the brain discards the instance;
//! there is no in-place reuse.

use std::sync::Arc;

use crate::config::BrainConfig;
use crate::{Status, Tree};

/// Binds a private instance of a shared template tree to one agent.
pub struct Brain<C> {
    template: Arc<Tree<C>>,
    config: BrainConfig,
    instance: Option<Tree<C>>,
}

impl<C> Brain<C> {
    /// Creates an unbound brain that thinks on every driver tick.
    pub fn new(template: Arc<Tree<C>>) -> Self {
        Self::with_config(template, BrainConfig::default())
    }

    /// Creates an unbound brain with an explicit cadence.
    pub fn with_config(template: Arc<Tree<C>>, config: BrainConfig) -> Self {
        Self {
            template,
            config,
            instance: None,
        }
    }

    /// Cadence this brain thinks on.
    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Shared template instances are created from.
    pub fn template(&self) -> &Arc<Tree<C>> {
        &self.template
    }

    /// Instantiates and starts a fresh copy of the template, discarding any
    /// instance this brain already had.
    pub fn bind(&mut self) -> &mut Tree<C> {
        let mut tree = self.template.instantiate();
        tree.start();
        if self.instance.is_some() {
            tracing::debug!("rebinding brain, previous tree instance discarded");
        }
        self.instance.insert(tree)
    }

    /// Discards the current instance and returns it.
    pub fn unbind(&mut self) -> Option<Tree<C>> {
        let instance = self.instance.take();
        if let Some(tree) = &instance {
            tracing::debug!(state = %tree.state(), "brain unbound");
        }
        instance
    }

    /// Returns `true` while an instance is bound.
    pub fn is_bound(&self) -> bool {
        self.instance.is_some()
    }

    /// Polls the instance if this driver tick is one the brain thinks on.
    ///
    /// Returns the instance's cached state, or `None` when unbound.
    pub fn tick(&mut self, tick: u64, driver: &mut C) -> Option<Status> {
        let should_think = self.config.should_think(tick);
        let tree = self.instance.as_mut()?;
        if should_think && tree.state().is_running() {
            tree.update(driver);
        }
        Some(tree.state())
    }

    /// Cached state of the instance, `None` when unbound.
    pub fn state(&self) -> Option<Status> {
        self.instance.as_ref().map(Tree::state)
    }

    /// `true` once the bound instance reached `Success` or `Failure`.
    pub fn is_finished(&self) -> bool {
        self.state().is_some_and(Status::is_terminal)
    }

    /// The bound instance, if any.
    pub fn tree(&self) -> Option<&Tree<C>> {
        self.instance.as_ref()
    }

    /// Mutable access to the bound instance, if any.
    pub fn tree_mut(&mut self) -> Option<&mut Tree<C>> {
        self.instance.as_mut()
    }
}

/// Ticks every brain once for driver tick `tick`, sharing one driver context.
pub fn tick_brains<C>(tick: u64, driver: &mut C, brains: &mut [Brain<C>]) {
    for brain in brains.iter_mut() {
        brain.tick(tick, driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{increment, leaf, sequence};
    use crate::{Action, AlwaysSuccess, Status, TickContext};

    #[derive(Default)]
    struct Court {
        decrees: u32,
    }

    fn decree_twice() -> Arc<Tree<Court>> {
        let issue = || {
            leaf(Action::new("issue_decree", |ctx: &mut TickContext<'_, Court>| {
                ctx.driver_mut().decrees += 1;
                Status::Success
            }))
        };
        Arc::new(
            Tree::build(Some(increment("sessions", sequence(vec![issue(), issue()]).cascade(false))))
                .unwrap(),
        )
    }

    #[test]
    fn unbound_brain_does_nothing() {
        let mut brain = Brain::new(decree_twice());
        let mut court = Court::default();
        assert_eq!(brain.tick(0, &mut court), None);
        assert_eq!(court.decrees, 0);
        assert!(!brain.is_finished());
    }

    #[test]
    fn bound_brain_runs_to_completion_then_stops() {
        let mut brain = Brain::new(decree_twice());
        let mut court = Court::default();
        brain.bind();

        assert_eq!(brain.tick(0, &mut court), Some(Status::Running));
        assert_eq!(brain.tick(1, &mut court), Some(Status::Success));
        assert_eq!(brain.tick(2, &mut court), Some(Status::Success));
        assert_eq!(court.decrees, 2);
        assert!(brain.is_finished());

        let sessions = brain.tree().unwrap().blackboard().unwrap().int_or("sessions", 0);
        assert_eq!(sessions, 1);
    }

    #[test]
    fn cadence_skips_ticks() {
        let config = BrainConfig {
            think_every_ticks: 2,
            think_offset_ticks: 0,
        };
        let mut brain = Brain::with_config(decree_twice(), config);
        let mut court = Court::default();
        brain.bind();

        brain.tick(1, &mut court);
        assert_eq!(court.decrees, 0);
        brain.tick(2, &mut court);
        assert_eq!(court.decrees, 1);
    }

    #[test]
    fn rebinding_starts_a_fresh_instance() {
        let template = decree_twice();
        let mut brain = Brain::new(Arc::clone(&template));
        let mut court = Court::default();

        brain.bind();
        brain.tick(0, &mut court);
        brain.tick(1, &mut court);
        assert!(brain.is_finished());

        brain.bind();
        assert_eq!(brain.state(), Some(Status::Running));
        assert_eq!(brain.tree().unwrap().blackboard().unwrap().len(), 0);
        assert!(!template.is_started());

        assert!(brain.unbind().is_some());
        assert!(!brain.is_bound());
    }

    #[test]
    fn brains_share_template_but_not_state() {
        let template: Arc<Tree<Court>> = Arc::new(Tree::build(Some(leaf(AlwaysSuccess))).unwrap());
        let mut brains = vec![Brain::new(Arc::clone(&template)), Brain::new(template)];
        brains[0].bind();
        brains[1].bind();

        let mut court = Court::default();
        brains[0].tick(0, &mut court);
        assert_eq!(brains[0].state(), Some(Status::Success));
        assert_eq!(brains[1].state(), Some(Status::Running));

        tick_brains(1, &mut court, &mut brains);
        assert!(brains.iter().all(Brain::is_finished));
    }
}
