mod support;

use std::sync::{Arc, Mutex};

use authsync::{
    BoundaryId, BoundaryState, Component, Container, FaultBoundary, FaultRecord,
    GenericFallback,
};
use pretty_assertions::assert_eq;

use support::lock_unpoisoned;

struct Label(&'static str);

impl Component for Label {
    fn render(&mut self, _width: usize) -> Vec<String> {
        vec![self.0.to_string()]
    }
}

struct Exploding(&'static str);

impl Component for Exploding {
    fn render(&mut self, _width: usize) -> Vec<String> {
        panic!("{}", self.0);
    }
}

/// Publishes the wrapped boundary's state after every render.
struct Observed {
    boundary: FaultBoundary,
    state: Arc<Mutex<BoundaryState>>,
}

impl Observed {
    fn wrap(
        boundary: FaultBoundary,
    ) -> (Arc<Mutex<BoundaryState>>, BoundaryId, Box<dyn Component>) {
        let state = Arc::new(Mutex::new(boundary.state()));
        let id = boundary.id();
        let observed = Box::new(Self {
            boundary,
            state: Arc::clone(&state),
        });
        (state, id, observed)
    }
}

impl Component for Observed {
    fn render(&mut self, width: usize) -> Vec<String> {
        let lines = self.boundary.render(width);
        *lock_unpoisoned(&self.state) = self.boundary.state();
        lines
    }
}

type FaultLog = Arc<Mutex<Vec<FaultRecord>>>;

fn recording_fallback(log: &FaultLog) -> Box<dyn authsync::FallbackView> {
    let log = Arc::clone(log);
    Box::new(move |fault: &FaultRecord, _width: usize| {
        lock_unpoisoned(&log).push(fault.clone());
        vec![format!("[{} unavailable]", fault.label)]
    })
}

#[test]
fn faulted_boundary_does_not_affect_sibling_boundaries() {
    let log: FaultLog = Arc::default();
    let (broken_state, broken_id, broken) = Observed::wrap(FaultBoundary::new(
        "profile",
        Box::new(Exploding("profile query shape changed")),
        recording_fallback(&log),
    ));
    let (healthy_state, _, healthy) = Observed::wrap(FaultBoundary::new(
        "feed",
        Box::new(Label("latest posts")),
        recording_fallback(&log),
    ));

    let mut page = Container::new()
        .with_child(Box::new(Label("header")))
        .with_child(broken)
        .with_child(healthy);

    assert_eq!(
        page.render(80),
        vec!["header", "[profile unavailable]", "latest posts"]
    );
    assert_eq!(page.render(80)[1], "[profile unavailable]");

    assert_eq!(*lock_unpoisoned(&broken_state), BoundaryState::Faulted);
    assert_eq!(*lock_unpoisoned(&healthy_state), BoundaryState::Healthy);

    let faults = lock_unpoisoned(&log).clone();
    assert!(faults.iter().all(|fault| fault.contained_at == broken_id));
    assert_eq!(faults[0].error.message, "profile query shape changed");
}

#[test]
fn innermost_boundary_contains_nested_fault() {
    let log: FaultLog = Arc::default();
    let inner = FaultBoundary::new(
        "inner",
        Box::new(Exploding("inner widget failed")),
        recording_fallback(&log),
    );
    let inner_id = inner.id();
    let (outer_state, _, outer) = Observed::wrap(FaultBoundary::new(
        "outer",
        Box::new(Container::new().with_child(Box::new(inner))),
        recording_fallback(&log),
    ));
    let mut root = Container::new().with_child(outer);

    assert_eq!(root.render(80), vec!["[inner unavailable]"]);
    assert_eq!(*lock_unpoisoned(&outer_state), BoundaryState::Healthy);
    let faults = lock_unpoisoned(&log).clone();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].contained_at, inner_id);
}

#[test]
fn unguarded_sibling_fault_is_caught_by_enclosing_boundary_only() {
    let (inner_state, _, inner) = Observed::wrap(FaultBoundary::with_generic_fallback(
        "stats",
        Box::new(Label("42 members")),
    ));
    let mut outer = FaultBoundary::new(
        "dashboard",
        Box::new(
            Container::new()
                .with_child(inner)
                .with_child(Box::new(Exploding("unguarded widget"))),
        ),
        Box::new(GenericFallback::new().with_details(true)),
    );

    let lines = outer.render(120);

    assert!(outer.is_faulted());
    assert_eq!(lines[1], "error: unguarded widget");
    assert_eq!(*lock_unpoisoned(&inner_state), BoundaryState::Healthy);
}

#[test]
fn boundary_ids_are_never_reused() {
    let first = FaultBoundary::with_generic_fallback("a", Box::new(Label("a")));
    let second = FaultBoundary::with_generic_fallback("b", Box::new(Label("b")));
    let first_id = first.id();
    let remounted = first.remount();

    assert_ne!(first_id, second.id());
    assert_ne!(remounted.id(), first_id);
    assert_ne!(remounted.id(), second.id());
}
