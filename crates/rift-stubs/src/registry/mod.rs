//! Stub registry: the live, ordered set of stubs and the scenarios they share.
//!
//! This module provides:
//! - `StubRegistry`: registration, removal, editing and serving of stubs
//! - `MappingStore`: persistence collaborator for stub documents
//! - `InMemoryMappingStore`: in-memory `MappingStore`
//!
//! Rules and the insertion counter live under one `RwLock`, so insertion
//! indices are assigned atomically and strictly increase. Serving a request
//! holds the rule read lock and the scenario table together, making the gating
//! read and the transition write of that request atomic. Structural matching
//! runs before the scenario table is taken. Locks are always taken rules
//! first, scenarios second.

mod store;


pub use store::{InMemoryMappingStore, MappingStore};

use crate::config::EngineConfig;
use crate::error::StubError;
use crate::pattern::UrlConflictPolicy;
use crate::scenario::{Scenario, Scenarios, STARTED};
use crate::selector::{select, sort_for_selection, RequestMatcher};
use crate::stub::{IdGenerator, RandomIds, StubMappingDocument, StubRule};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Default)]
struct RuleSet {
    /// Registration order
    stubs: Vec<StubRule>,
    next_index: u64,
}

impl RuleSet {
    fn position(&self, id: Uuid) -> Result<usize, StubError> {
        self.stubs
            .iter()
            .position(|s| s.id() == id)
            .ok_or(StubError::NotFound(id))
    }

    fn contains(&self, id: Uuid) -> bool {
        self.stubs.iter().any(|s| s.id() == id)
    }

    fn references_scenario(&self, name: &str) -> bool {
        self.stubs.iter().any(|s| s.scenario_name() == Some(name))
    }

    fn admit(&mut self, mut stub: StubRule, scenarios: &Scenarios) -> Uuid {
        stub.set_insertion_index(self.next_index);
        self.next_index += 1;
        if let Some(name) = stub.scenario_name() {
            scenarios.ensure(name);
        }
        let id = stub.id();
        debug!(
            "Registered stub {} at index {} (priority={})",
            id,
            stub.insertion_index(),
            stub.effective_priority()
        );
        self.stubs.push(stub);
        id
    }
}

/// Live set of stubs with their scenarios
pub struct StubRegistry {
    rules: RwLock<RuleSet>,
    scenarios: Scenarios,
    ids: Arc<dyn IdGenerator>,
    url_conflict: UrlConflictPolicy,
    default_transient: bool,
}

impl Default for StubRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StubRegistry {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(RuleSet::default()),
            scenarios: Scenarios::new(),
            ids: Arc::new(RandomIds),
            url_conflict: UrlConflictPolicy::default(),
            default_transient: true,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            scenarios: Scenarios::from_config(&config.scenarios),
            url_conflict: config.url_conflict,
            default_transient: config.default_transient,
            ..Self::new()
        }
    }

    /// Use `ids` for stubs created from documents that carry no uuid.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn id_generator(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub fn url_conflict(&self) -> UrlConflictPolicy {
        self.url_conflict
    }

    /// Transient flag given to stubs parsed by [`register_json`](Self::register_json)
    pub fn default_transient(&self) -> bool {
        self.default_transient
    }

    /// Register a stub and assign its insertion index.
    pub fn register(&self, stub: StubRule) -> Result<Uuid, StubError> {
        validate_binding(&stub)?;
        let mut rules = self.rules.write();
        if rules.contains(stub.id()) {
            return Err(StubError::DuplicateId(stub.id()));
        }
        let id = rules.admit(stub, &self.scenarios);
        info!("Stub {} registered ({} total)", id, rules.stubs.len());
        Ok(id)
    }

    /// Register several stubs, in order. Nothing is registered if any of them
    /// is invalid.
    pub fn register_all<I>(&self, stubs: I) -> Result<Vec<Uuid>, StubError>
    where
        I: IntoIterator<Item = StubRule>,
    {
        let stubs: Vec<StubRule> = stubs.into_iter().collect();
        let mut rules = self.rules.write();

        let mut seen = HashSet::with_capacity(stubs.len());
        for stub in &stubs {
            validate_binding(stub)?;
            if rules.contains(stub.id()) || !seen.insert(stub.id()) {
                return Err(StubError::DuplicateId(stub.id()));
            }
        }

        let ids: Vec<Uuid> = stubs
            .into_iter()
            .map(|stub| rules.admit(stub, &self.scenarios))
            .collect();
        info!(
            "Registered {} stub(s) ({} total)",
            ids.len(),
            rules.stubs.len()
        );
        Ok(ids)
    }

    /// Parse a stub mapping document and register it.
    pub fn register_json(&self, json: &str) -> Result<Uuid, StubError> {
        let doc: StubMappingDocument = serde_json::from_str(json)?;
        let mut stub = StubRule::from_document(doc, self.ids.as_ref(), self.url_conflict)?;
        stub.set_transient(self.default_transient);
        self.register(stub)
    }

    /// Remove a stub. Scenarios no longer referenced by any stub are dropped,
    /// unless they have a configured starting state.
    pub fn remove(&self, id: Uuid) -> Result<StubRule, StubError> {
        let mut rules = self.rules.write();
        let position = rules.position(id)?;
        let removed = rules.stubs.remove(position);
        if let Some(name) = removed.scenario_name() {
            self.release_scenario(&rules, name);
        }
        info!("Stub {} removed ({} remaining)", id, rules.stubs.len());
        Ok(removed)
    }

    /// Replace the stub registered under `id`. The replacement takes over the
    /// id and insertion index of the stub it replaces.
    pub fn edit(&self, id: Uuid, replacement: StubRule) -> Result<(), StubError> {
        validate_binding(&replacement)?;
        let mut rules = self.rules.write();
        let position = rules.position(id)?;

        let mut replacement = replacement.with_id(id);
        replacement.set_insertion_index(rules.stubs[position].insertion_index());
        if let Some(name) = replacement.scenario_name() {
            self.scenarios.ensure(name);
        }

        let previous = std::mem::replace(&mut rules.stubs[position], replacement);
        if let Some(name) = previous.scenario_name() {
            self.release_scenario(&rules, name);
        }
        info!("Stub {} edited", id);
        Ok(())
    }

    pub fn update_priority(&self, id: Uuid, priority: Option<i32>) -> Result<(), StubError> {
        let mut rules = self.rules.write();
        let position = rules.position(id)?;
        rules.stubs[position].set_priority(priority);
        debug!("Stub {} priority set to {:?}", id, priority);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<StubRule> {
        self.rules.read().stubs.iter().find(|s| s.id() == id).cloned()
    }

    /// All stubs in selection order
    pub fn list(&self) -> Vec<StubRule> {
        let mut stubs = self.rules.read().stubs.clone();
        sort_for_selection(&mut stubs);
        stubs
    }

    pub fn len(&self) -> usize {
        self.rules.read().stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select the stub for `request` and apply its scenario transition.
    ///
    /// `matcher` runs without the scenario lock, so concurrent requests match
    /// in parallel and the matcher may read back into the registry. Gating,
    /// selection and transition then run under one scenario lock, so two
    /// concurrent requests never both observe the pre-transition state.
    pub fn serve<R, M>(&self, request: &R, matcher: &M) -> Option<StubRule>
    where
        R: ?Sized,
        M: RequestMatcher<R> + ?Sized,
    {
        let rules = self.rules.read();
        let candidates: Vec<&StubRule> = rules
            .stubs
            .iter()
            .filter(|stub| matcher.matches(stub, request))
            .collect();
        if candidates.is_empty() {
            debug!("No stub matched among {} registered", rules.stubs.len());
            return None;
        }

        let mut table = self.scenarios.lock();
        let Some(selected) = select(candidates, &table) else {
            debug!("All matching stubs excluded by scenario state");
            return None;
        };
        let selected = selected.clone();
        selected.apply_transition_if_needed(&mut table);
        drop(table);

        debug!(
            "Serving stub {} (priority={}, index={})",
            selected.id(),
            selected.effective_priority(),
            selected.insertion_index()
        );
        Some(selected)
    }

    /// Like [`serve`](Self::serve), falling back to the not-configured stub.
    pub fn serve_or_not_configured<R, M>(&self, request: &R, matcher: &M) -> StubRule
    where
        R: ?Sized,
        M: RequestMatcher<R> + ?Sized,
    {
        self.serve(request, matcher)
            .unwrap_or_else(|| StubRule::not_configured().clone())
    }

    pub fn scenario_state(&self, name: &str) -> Option<String> {
        self.scenarios.get_state(name)
    }

    pub fn set_scenario_state(&self, name: &str, state: &str) {
        info!("Scenario '{}' set to '{}'", name, state);
        self.scenarios.set_state(name, state);
    }

    /// Return every scenario to its starting state.
    pub fn reset_scenarios(&self) {
        self.scenarios.reset_all();
    }

    /// Scenario snapshot, including the states registered stubs mention
    pub fn scenarios(&self) -> Vec<Scenario> {
        let rules = self.rules.read();
        let mut scenarios = self.scenarios.snapshot();
        for scenario in &mut scenarios {
            let mut possible: BTreeSet<String> = BTreeSet::new();
            possible.insert(STARTED.to_string());
            for binding in rules
                .stubs
                .iter()
                .filter_map(StubRule::scenario)
                .filter(|b| b.scenario_name == scenario.name)
            {
                possible.extend(binding.required_state.iter().cloned());
                possible.extend(binding.new_state.iter().cloned());
            }
            scenario.possible_states = possible;
        }
        scenarios
    }

    /// Drop every stub and scenario. Configured scenarios return to their
    /// initial state. Insertion indices keep increasing.
    pub fn reset(&self) {
        let mut rules = self.rules.write();
        let dropped = rules.stubs.len();
        rules.stubs.clear();
        self.scenarios.clear();
        info!("Registry reset, {} stub(s) dropped", dropped);
    }

    /// Write every transient stub to `store` and mark it persisted.
    pub fn persist_transient(&self, store: &dyn MappingStore) -> Result<usize, StubError> {
        let mut rules = self.rules.write();
        let mut written = 0;
        for stub in rules.stubs.iter_mut().filter(|s| s.is_transient()) {
            store.save(&stub.to_document())?;
            stub.set_transient(false);
            written += 1;
        }
        info!("Persisted {} stub(s)", written);
        Ok(written)
    }

    /// Register every stub held by `store`. Loaded stubs are not transient.
    pub fn load_from(&self, store: &dyn MappingStore) -> Result<usize, StubError> {
        let stubs = store
            .load_all()?
            .into_iter()
            .map(|doc| -> Result<StubRule, StubError> {
                let mut stub = StubRule::from_document(doc, self.ids.as_ref(), self.url_conflict)?;
                stub.set_transient(false);
                Ok(stub)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let count = stubs.len();
        self.register_all(stubs)?;
        Ok(count)
    }

    /// Drop `name` once no stub references it and it is not configured.
    fn release_scenario(&self, rules: &RuleSet, name: &str) {
        if rules.references_scenario(name) || self.scenarios.is_configured(name) {
            return;
        }
        self.scenarios.remove(name);
        debug!("Scenario '{}' dropped with its last stub", name);
    }

    /// Remove a stub and, if it was persisted, its stored document.
    pub fn remove_persisted(
        &self,
        id: Uuid,
        store: &dyn MappingStore,
    ) -> Result<StubRule, StubError> {
        let removed = self.remove(id)?;
        if !removed.is_transient() {
            store.remove(id)?;
        }
        Ok(removed)
    }
}

/// Scenario bindings must name their scenario.
fn validate_binding(stub: &StubRule) -> Result<(), StubError> {
    match stub.scenario() {
        Some(binding) if binding.scenario_name.trim().is_empty() => {
            if binding.new_state.is_some() {
                Err(StubError::TransitionWithoutScenario(stub.id()))
            } else if binding.required_state.is_some() {
                Err(StubError::RequiredStateWithoutScenario(stub.id()))
            } else {
                Err(StubError::BlankScenarioName(stub.id()))
            }
        }
        _ => Ok(()),
    }
}
