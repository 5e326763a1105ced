use bt_engine::builder::{invert, leaf, repeat, selector, sequence};
use bt_engine::{Behavior, Blueprint, Status, TickContext, Tree};
use proptest::prelude::*;

/// Leaf that reports a fixed outcome and counts its updates in the driver.
#[derive(Clone)]
struct Fixed {
    slot: usize,
    outcome: Status,
}

impl Behavior<Vec<u32>> for Fixed {
    fn on_update(&mut self, ctx: &mut TickContext<'_, Vec<u32>>) -> Status {
        ctx.driver_mut()[self.slot] += 1;
        self.outcome
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Leaf that replays `outcomes` in order, one per update.
#[derive(Clone)]
struct Script {
    outcomes: Vec<Status>,
    step: usize,
}

impl Script {
    fn new(outcomes: Vec<Status>) -> Self {
        Self { outcomes, step: 0 }
    }
}

impl Behavior<Vec<u32>> for Script {
    fn on_update(&mut self, _ctx: &mut TickContext<'_, Vec<u32>>) -> Status {
        let status = self.outcomes.get(self.step).copied().unwrap_or(Status::Running);
        self.step += 1;
        status
    }
}

fn terminal() -> impl Strategy<Value = Status> {
    prop_oneof![Just(Status::Success), Just(Status::Failure)]
}

fn any_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Running),
        Just(Status::Success),
        Just(Status::Failure)
    ]
}

fn fixed_children(outcomes: &[Status]) -> Vec<Blueprint<Vec<u32>>> {
    outcomes
        .iter()
        .enumerate()
        .map(|(slot, &outcome)| leaf(Fixed { slot, outcome }))
        .collect()
}

/// Runs a started instance until it leaves `Running`, with an update cap.
fn run(template: &Tree<Vec<u32>>, counts: &mut Vec<u32>) -> (Status, usize) {
    let mut tree = template.instantiate();
    tree.start();
    let mut updates = 0;
    loop {
        updates += 1;
        let status = tree.update(counts);
        if status.is_terminal() || updates > 64 {
            return (status, updates);
        }
    }
}

proptest! {
    #[test]
    fn sequence_fails_at_first_failure(
        outcomes in prop::collection::vec(terminal(), 0..12),
        cascade in any::<bool>(),
    ) {
        let template = Tree::build(Some(sequence(fixed_children(&outcomes)).cascade(cascade))).unwrap();
        let mut counts = vec![0; outcomes.len()];
        let (status, updates) = run(&template, &mut counts);

        let first_failure = outcomes.iter().position(|s| s.is_failure());
        let polled = first_failure.map_or(outcomes.len(), |i| i + 1);
        prop_assert_eq!(status, if first_failure.is_some() { Status::Failure } else { Status::Success });
        prop_assert!(counts[..polled].iter().all(|&c| c == 1));
        prop_assert!(counts[polled..].iter().all(|&c| c == 0));
        if cascade {
            prop_assert_eq!(updates, 1);
        } else {
            prop_assert_eq!(updates, polled.max(1));
        }
    }

    #[test]
    fn sequence_converges_when_every_child_succeeds(
        delays in prop::collection::vec(0usize..4, 0..8),
        cascade in any::<bool>(),
    ) {
        let children: Vec<_> = delays
            .iter()
            .map(|&delay| {
                let mut outcomes = vec![Status::Running; delay];
                outcomes.push(Status::Success);
                leaf(Script::new(outcomes))
            })
            .collect();
        let template = Tree::build(Some(sequence(children).cascade(cascade))).unwrap();
        let mut tree = template.instantiate();
        tree.start();

        let budget = delays.iter().sum::<usize>() + delays.len() + 1;
        let mut reported = Vec::new();
        for _ in 0..budget {
            let status = tree.update(&mut Vec::new());
            reported.push(status);
            if status.is_terminal() {
                break;
            }
        }

        prop_assert!(!reported.contains(&Status::Failure));
        prop_assert_eq!(reported.iter().filter(|s| s.is_success()).count(), 1);
        prop_assert_eq!(reported.last().copied(), Some(Status::Success));
        if cascade {
            prop_assert_eq!(reported.len(), delays.iter().sum::<usize>() + 1);
        }
    }

    #[test]
    fn selector_succeeds_at_first_success(
        outcomes in prop::collection::vec(terminal(), 0..12),
        cascade in any::<bool>(),
    ) {
        let template = Tree::build(Some(selector(fixed_children(&outcomes)).cascade(cascade))).unwrap();
        let mut counts = vec![0; outcomes.len()];
        let (status, updates) = run(&template, &mut counts);

        let first_success = outcomes.iter().position(|s| s.is_success());
        let polled = first_success.map_or(outcomes.len(), |i| i + 1);
        prop_assert_eq!(status, if first_success.is_some() { Status::Success } else { Status::Failure });
        prop_assert!(counts[..polled].iter().all(|&c| c == 1));
        prop_assert!(counts[polled..].iter().all(|&c| c == 0));
        if cascade {
            prop_assert_eq!(updates, 1);
        } else {
            prop_assert_eq!(updates, polled.max(1));
        }
    }

    #[test]
    fn double_inversion_is_identity(outcome in any_status()) {
        let template = Tree::build(Some(invert(invert(leaf(Fixed { slot: 0, outcome }))))).unwrap();
        let mut tree = template.instantiate();
        tree.start();
        prop_assert_eq!(tree.update(&mut vec![0]), outcome);
    }

    #[test]
    fn repeat_never_finishes(outcomes in prop::collection::vec(any_status(), 1000)) {
        let template = Tree::build(Some(repeat(leaf(Script::new(outcomes.clone()))))).unwrap();
        let mut tree = template.instantiate();
        tree.start();

        for _ in &outcomes {
            prop_assert_eq!(tree.update(&mut Vec::new()), Status::Running);
        }
        let polled = tree.nodes().last().map(|view| view.state.current);
        prop_assert_eq!(polled, outcomes.last().copied());
    }
}
