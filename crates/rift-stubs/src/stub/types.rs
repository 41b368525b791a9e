//! Stub rule entity: match criteria, response, priority, identity,
//! insertion order and scenario binding.

use super::identity::{IdGenerator, RandomIds};
use crate::error::StubError;
use crate::pattern::{normalize, NewRequestPattern, RequestPattern, UrlConflictPolicy};
use crate::scenario::ScenarioStates;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;
use uuid::Uuid;

/// Priority used when a stub declares none. Lower values win.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Stub served when no registered stub matches a request.
pub static NOT_CONFIGURED: Lazy<StubRule> = Lazy::new(|| {
    StubRule::new(
        Uuid::nil(),
        MatchSpec::Canonical(NewRequestPattern::any()),
        ResponseDefinition::not_configured(),
    )
});

/// Opaque response directive. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseDefinition(serde_json::Value);

impl ResponseDefinition {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// 404 response flagged as not configured
    pub fn not_configured() -> Self {
        Self(serde_json::json!({"status": 404, "wasConfigured": false}))
    }

    pub fn was_configured(&self) -> bool {
        self.0
            .get("wasConfigured")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Ties a stub to a named scenario.
///
/// A transition target cannot exist without a scenario name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioBinding {
    pub scenario_name: String,
    pub required_state: Option<String>,
    pub new_state: Option<String>,
}

impl ScenarioBinding {
    pub fn new(scenario_name: impl Into<String>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            required_state: None,
            new_state: None,
        }
    }

    pub fn requires(mut self, state: impl Into<String>) -> Self {
        self.required_state = Some(state.into());
        self
    }

    pub fn transitions_to(mut self, state: impl Into<String>) -> Self {
        self.new_state = Some(state.into());
        self
    }
}

/// Request-matching criteria of a stub.
///
/// When built from a legacy pattern the canonical form is derived at the same
/// time, so readers never observe a canonical form older than the legacy one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSpec {
    Legacy {
        legacy: RequestPattern,
        canonical: NewRequestPattern,
    },
    Canonical(NewRequestPattern),
}

impl MatchSpec {
    pub fn from_legacy(
        legacy: RequestPattern,
        policy: UrlConflictPolicy,
    ) -> Result<Self, StubError> {
        let canonical = normalize(&legacy, policy)?;
        Ok(MatchSpec::Legacy { legacy, canonical })
    }

    pub fn from_canonical(canonical: NewRequestPattern) -> Result<Self, StubError> {
        canonical.validate()?;
        Ok(MatchSpec::Canonical(canonical))
    }

    pub fn canonical(&self) -> &NewRequestPattern {
        match self {
            MatchSpec::Legacy { canonical, .. } => canonical,
            MatchSpec::Canonical(canonical) => canonical,
        }
    }

    pub fn legacy(&self) -> Option<&RequestPattern> {
        match self {
            MatchSpec::Legacy { legacy, .. } => Some(legacy),
            MatchSpec::Canonical(_) => None,
        }
    }
}

/// A request-matching rule bound to a canned response.
///
/// Equality ignores `id`: two stubs built independently with the same content
/// and insertion index compare equal.
#[derive(Debug, Clone)]
pub struct StubRule {
    id: Uuid,
    match_spec: MatchSpec,
    response: ResponseDefinition,
    priority: Option<i32>,
    scenario: Option<ScenarioBinding>,
    insertion_index: u64,
    is_transient: bool,
}

impl StubRule {
    pub fn new(id: Uuid, match_spec: MatchSpec, response: ResponseDefinition) -> Self {
        Self {
            id,
            match_spec,
            response,
            priority: None,
            scenario: None,
            insertion_index: 0,
            is_transient: true,
        }
    }

    pub fn builder(response: ResponseDefinition) -> StubRuleBuilder<'static> {
        StubRuleBuilder::new(response)
    }

    /// Sentinel stub for unmatched requests
    pub fn not_configured() -> &'static StubRule {
        &NOT_CONFIGURED
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Replace the id. Only meaningful before registration.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn match_spec(&self) -> &MatchSpec {
        &self.match_spec
    }

    /// Legacy pattern, if this stub was defined with one
    pub fn request(&self) -> Option<&RequestPattern> {
        self.match_spec.legacy()
    }

    /// Canonical pattern the matching engine evaluates
    pub fn new_request(&self) -> &NewRequestPattern {
        self.match_spec.canonical()
    }

    /// Replace the legacy pattern and re-derive the canonical one.
    ///
    /// On error the stub is left unchanged.
    pub fn set_request(
        &mut self,
        request: RequestPattern,
        policy: UrlConflictPolicy,
    ) -> Result<(), StubError> {
        self.match_spec = MatchSpec::from_legacy(request, policy)?;
        Ok(())
    }

    /// Install a canonical-only pattern, dropping any legacy form.
    pub fn set_new_request(&mut self, new_request: NewRequestPattern) -> Result<(), StubError> {
        self.match_spec = MatchSpec::from_canonical(new_request)?;
        Ok(())
    }

    pub fn response(&self) -> &ResponseDefinition {
        &self.response
    }

    pub fn set_response(&mut self, response: ResponseDefinition) {
        self.response = response;
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Option<i32>) {
        self.priority = priority;
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn scenario(&self) -> Option<&ScenarioBinding> {
        self.scenario.as_ref()
    }

    pub fn scenario_name(&self) -> Option<&str> {
        self.scenario.as_ref().map(|b| b.scenario_name.as_str())
    }

    pub fn set_scenario(&mut self, scenario: Option<ScenarioBinding>) {
        self.scenario = scenario;
    }

    pub fn insertion_index(&self) -> u64 {
        self.insertion_index
    }

    pub(crate) fn set_insertion_index(&mut self, insertion_index: u64) {
        self.insertion_index = insertion_index;
    }

    /// True while the stub has not been written to durable storage
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn set_transient(&mut self, is_transient: bool) {
        self.is_transient = is_transient;
    }

    pub fn is_scenario_gated(&self) -> bool {
        self.scenario.is_some()
    }

    pub fn modifies_scenario_state(&self) -> bool {
        self.scenario
            .as_ref()
            .is_some_and(|b| b.new_state.is_some())
    }

    /// Fires regardless of scenario state
    pub fn is_state_independent(&self) -> bool {
        self.scenario
            .as_ref()
            .map_or(true, |b| b.required_state.is_none())
    }

    /// Whether the stub is eligible under the scenario states as they are now.
    ///
    /// A gated stub whose scenario is unknown to `states` is never eligible.
    pub fn satisfies_current_state<S>(&self, states: &S) -> bool
    where
        S: ScenarioStates + ?Sized,
    {
        let Some(binding) = &self.scenario else {
            return true;
        };
        let Some(required) = binding.required_state.as_deref() else {
            return true;
        };
        match states.current_state(&binding.scenario_name) {
            Some(current) => current == required,
            None => {
                debug!(
                    "Stub {} excluded: scenario '{}' is not initialized",
                    self.id, binding.scenario_name
                );
                false
            }
        }
    }

    /// Move the bound scenario to `new_state`, if one is declared.
    ///
    /// Call once per served request, after this stub was selected.
    pub fn apply_transition_if_needed<S>(&self, states: &mut S)
    where
        S: ScenarioStates + ?Sized,
    {
        if let Some(ScenarioBinding {
            scenario_name,
            new_state: Some(new_state),
            ..
        }) = &self.scenario
        {
            states.transition(scenario_name, new_state);
        }
    }

    /// Priority comparison with absent priorities treated as
    /// [`DEFAULT_PRIORITY`]. `Less` means `self` takes precedence.
    pub fn compare_priority_with(&self, other: &StubRule) -> Ordering {
        self.effective_priority().cmp(&other.effective_priority())
    }
}

impl PartialEq for StubRule {
    fn eq(&self, other: &Self) -> bool {
        self.insertion_index == other.insertion_index
            && self.is_transient == other.is_transient
            && self.match_spec == other.match_spec
            && self.response == other.response
            && self.priority == other.priority
            && self.scenario == other.scenario
    }
}

/// Builder for [`StubRule`] with an injectable id generator.
pub struct StubRuleBuilder<'a> {
    response: ResponseDefinition,
    request: Option<RequestPattern>,
    new_request: Option<NewRequestPattern>,
    priority: Option<i32>,
    scenario: Option<ScenarioBinding>,
    url_conflict: UrlConflictPolicy,
    ids: &'a dyn IdGenerator,
}

impl StubRuleBuilder<'static> {
    pub fn new(response: ResponseDefinition) -> Self {
        Self {
            response,
            request: None,
            new_request: None,
            priority: None,
            scenario: None,
            url_conflict: UrlConflictPolicy::default(),
            ids: &RandomIds,
        }
    }
}

impl<'a> StubRuleBuilder<'a> {
    pub fn request(mut self, request: RequestPattern) -> Self {
        self.request = Some(request);
        self
    }

    pub fn new_request(mut self, new_request: NewRequestPattern) -> Self {
        self.new_request = Some(new_request);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn scenario(mut self, scenario: ScenarioBinding) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn url_conflict(mut self, policy: UrlConflictPolicy) -> Self {
        self.url_conflict = policy;
        self
    }

    pub fn ids<'b>(self, ids: &'b dyn IdGenerator) -> StubRuleBuilder<'b> {
        StubRuleBuilder {
            response: self.response,
            request: self.request,
            new_request: self.new_request,
            priority: self.priority,
            scenario: self.scenario,
            url_conflict: self.url_conflict,
            ids,
        }
    }

    /// Build the stub. A legacy pattern takes precedence over a canonical one;
    /// with neither, the stub matches every request.
    pub fn build(self) -> Result<StubRule, StubError> {
        let match_spec = match (self.request, self.new_request) {
            (Some(request), _) => MatchSpec::from_legacy(request, self.url_conflict)?,
            (None, Some(new_request)) => MatchSpec::from_canonical(new_request)?,
            (None, None) => MatchSpec::Canonical(NewRequestPattern::any()),
        };
        let mut stub = StubRule::new(self.ids.next_id(), match_spec, self.response);
        stub.priority = self.priority;
        stub.scenario = self.scenario;
        Ok(stub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{RequestMethod, StringValuePattern, UrlPattern, ValuePattern};
    use crate::stub::SequentialIds;
    use serde_json::json;
    use std::collections::HashMap;

    fn ok_response() -> ResponseDefinition {
        ResponseDefinition::new(json!({"status": 200, "body": "ok"}))
    }

    fn states(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn gated(required: Option<&str>, new_state: Option<&str>) -> StubRule {
        let mut binding = ScenarioBinding::new("login");
        binding.required_state = required.map(str::to_string);
        binding.new_state = new_state.map(str::to_string);
        StubRule::builder(ok_response())
            .scenario(binding)
            .build()
            .unwrap()
    }

    #[test]
    fn test_unbound_stub_always_satisfies() {
        let stub = StubRule::builder(ok_response()).build().unwrap();
        assert!(!stub.is_scenario_gated());
        assert!(stub.is_state_independent());
        assert!(stub.satisfies_current_state(&HashMap::new()));
    }

    #[test]
    fn test_gated_without_required_state_is_independent() {
        let stub = gated(None, Some("NEXT"));
        assert!(stub.is_scenario_gated());
        assert!(stub.is_state_independent());
        assert!(stub.modifies_scenario_state());
        // Even an unknown scenario does not exclude it
        assert!(stub.satisfies_current_state(&HashMap::new()));
    }

    #[test]
    fn test_required_state_gating_follows_live_state() {
        let stub = gated(Some("A"), None);
        let mut live = states(&[("login", "Started")]);
        assert!(!stub.satisfies_current_state(&live));

        live.transition("login", "A");
        assert!(stub.satisfies_current_state(&live));

        live.transition("login", "B");
        assert!(!stub.satisfies_current_state(&live));
    }

    #[test]
    fn test_unresolved_scenario_excludes_gated_stub() {
        let stub = gated(Some("A"), None);
        assert!(!stub.satisfies_current_state(&states(&[("other", "A")])));
    }

    #[test]
    fn test_transition_applied_and_repeatable() {
        let stub = gated(None, Some("B"));
        let mut live = states(&[("login", "Started")]);

        stub.apply_transition_if_needed(&mut live);
        assert_eq!(live.current_state("login"), Some("B"));

        stub.apply_transition_if_needed(&mut live);
        stub.apply_transition_if_needed(&mut live);
        assert_eq!(live.current_state("login"), Some("B"));
    }

    #[test]
    fn test_transition_noop_without_new_state() {
        let stub = gated(Some("A"), None);
        let mut live = states(&[("login", "A")]);
        stub.apply_transition_if_needed(&mut live);
        assert_eq!(live.current_state("login"), Some("A"));

        let unbound = StubRule::builder(ok_response()).build().unwrap();
        unbound.apply_transition_if_needed(&mut live);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_compare_priority_with_defaults() {
        let mut high = StubRule::builder(ok_response()).build().unwrap();
        let mut low = StubRule::builder(ok_response()).build().unwrap();
        let none_a = StubRule::builder(ok_response()).build().unwrap();
        let none_b = StubRule::builder(ok_response()).build().unwrap();

        high.set_priority(Some(1));
        low.set_priority(Some(10));

        assert_eq!(high.compare_priority_with(&low), Ordering::Less);
        assert_eq!(low.compare_priority_with(&high), Ordering::Greater);
        assert_eq!(none_a.compare_priority_with(&none_b), Ordering::Equal);
        // Absent behaves exactly like 5
        low.set_priority(Some(DEFAULT_PRIORITY));
        assert_eq!(low.compare_priority_with(&none_a), Ordering::Equal);
        high.set_priority(Some(-3));
        assert_eq!(high.compare_priority_with(&none_a), Ordering::Less);
    }

    #[test]
    fn test_equality_ignores_id() {
        let ids = SequentialIds::new();
        let request = RequestPattern::new(RequestMethod::Get, "/ping");
        let a = StubRule::builder(ok_response())
            .request(request.clone())
            .priority(2)
            .ids(&ids)
            .build()
            .unwrap();
        let b = StubRule::builder(ok_response())
            .request(request)
            .priority(2)
            .ids(&ids)
            .build()
            .unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_includes_insertion_index_and_transient_flag() {
        let a = StubRule::builder(ok_response()).build().unwrap();
        let mut b = a.clone().with_id(Uuid::new_v4());
        assert_eq!(a, b);

        b.set_insertion_index(7);
        assert_ne!(a, b);

        let mut c = a.clone();
        c.set_transient(false);
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_request_refreshes_canonical_form() {
        let mut stub = StubRule::builder(ok_response())
            .request(RequestPattern::new(RequestMethod::Get, "/old"))
            .build()
            .unwrap();
        assert_eq!(stub.new_request().url, UrlPattern::Path("/old".to_string()));

        let replacement = RequestPattern::new(RequestMethod::Post, "/new")
            .with_header("Accept", ValuePattern::equal_to("application/json"));
        stub.set_request(replacement.clone(), UrlConflictPolicy::Reject)
            .unwrap();

        assert_eq!(stub.request(), Some(&replacement));
        assert_eq!(stub.new_request().url, UrlPattern::Path("/new".to_string()));
        assert_eq!(stub.new_request().method, RequestMethod::Post);
        assert_eq!(
            stub.new_request().headers.as_ref().unwrap()["Accept"].patterns(),
            &[StringValuePattern::EqualTo("application/json".to_string())]
        );
    }

    #[test]
    fn test_failed_set_request_keeps_previous_pattern() {
        let mut stub = StubRule::builder(ok_response())
            .request(RequestPattern::new(RequestMethod::Get, "/keep"))
            .build()
            .unwrap();
        let conflicting = RequestPattern {
            url: Some("/a".to_string()),
            url_path: Some("/a".to_string()),
            ..Default::default()
        };
        assert!(stub
            .set_request(conflicting, UrlConflictPolicy::Reject)
            .is_err());
        assert_eq!(stub.new_request().url, UrlPattern::Path("/keep".to_string()));
    }

    #[test]
    fn test_set_new_request_drops_legacy_form() {
        let mut stub = StubRule::builder(ok_response())
            .request(RequestPattern::new(RequestMethod::Get, "/legacy"))
            .build()
            .unwrap();
        stub.set_new_request(NewRequestPattern::any()).unwrap();
        assert!(stub.request().is_none());
        assert!(stub.new_request().url.is_any());
    }

    #[test]
    fn test_builder_injected_ids() {
        let ids = SequentialIds::new();
        let stub = StubRule::builder(ok_response()).ids(&ids).build().unwrap();
        assert_eq!(stub.id(), Uuid::from_u128(1));
        assert!(stub.is_transient());
        assert_eq!(stub.insertion_index(), 0);
    }

    #[test]
    fn test_not_configured_sentinel() {
        let stub = StubRule::not_configured();
        assert!(stub.id().is_nil());
        assert!(!stub.response().was_configured());
        assert!(stub.new_request().url.is_any());
        assert!(ok_response().was_configured());
    }
}
