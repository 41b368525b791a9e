//! Stub selection: scenario gating, then priority, then insertion order.
//!
//! ```text
//! all stubs → RequestMatcher (structural) → scenario gating → priority ↑, index ↑ → first
//! ```

use crate::scenario::ScenarioStates;
use crate::stub::StubRule;
use std::cmp::Ordering;
use tracing::debug;

/// Structural matching collaborator: decides whether a stub's patterns match
/// a request. Implemented outside this crate.
pub trait RequestMatcher<R: ?Sized> {
    fn matches(&self, stub: &StubRule, request: &R) -> bool;
}

impl<R, F> RequestMatcher<R> for F
where
    R: ?Sized,
    F: Fn(&StubRule, &R) -> bool,
{
    fn matches(&self, stub: &StubRule, request: &R) -> bool {
        self(stub, request)
    }
}

/// Total order used for selection: lower priority value first, then earlier
/// registration first.
pub fn selection_order(a: &StubRule, b: &StubRule) -> Ordering {
    a.compare_priority_with(b)
        .then_with(|| a.insertion_index().cmp(&b.insertion_index()))
}

/// Pick the stub to serve among candidates that already match structurally.
pub fn select<'a, I, S>(candidates: I, states: &S) -> Option<&'a StubRule>
where
    I: IntoIterator<Item = &'a StubRule>,
    S: ScenarioStates + ?Sized,
{
    candidates
        .into_iter()
        .filter(|stub| stub.satisfies_current_state(states))
        .min_by(|a, b| selection_order(a, b))
}

/// Filter `stubs` through `matcher` for `request`, then [`select`].
pub fn select_for<'a, R, M, S>(
    stubs: &'a [StubRule],
    request: &R,
    matcher: &M,
    states: &S,
) -> Option<&'a StubRule>
where
    R: ?Sized,
    M: RequestMatcher<R> + ?Sized,
    S: ScenarioStates + ?Sized,
{
    let selected = select(
        stubs.iter().filter(|stub| matcher.matches(stub, request)),
        states,
    );
    match selected {
        Some(stub) => debug!(
            "Selected stub {} (priority={}, index={})",
            stub.id(),
            stub.effective_priority(),
            stub.insertion_index()
        ),
        None => debug!("No stub selected among {} registered", stubs.len()),
    }
    selected
}

/// Sort stubs into selection order.
pub fn sort_for_selection(stubs: &mut [StubRule]) {
    stubs.sort_by(selection_order);
}
