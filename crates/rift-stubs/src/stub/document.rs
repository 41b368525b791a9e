//! Stub mapping documents: the serialized form of a stub.
//!
//! The document is a schema of its own, kept separate from [`StubRule`]. Field
//! order is fixed (`uuid`, `request`, `newRequest`, `response`, then the
//! optional priority and scenario fields) and absent values are omitted rather
//! than written as `null`. Insertion index and transient flag are runtime state
//! and never serialized.

use super::identity::{IdGenerator, RandomIds};
use super::types::{MatchSpec, ResponseDefinition, ScenarioBinding, StubRule};
use crate::error::StubError;
use crate::pattern::{NewRequestPattern, RequestPattern, UrlConflictPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Serialized stub mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubMappingDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_request: Option<NewRequestPattern>,
    pub response: ResponseDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_scenario_state: Option<String>,
}

impl From<&StubRule> for StubMappingDocument {
    fn from(stub: &StubRule) -> Self {
        let binding = stub.scenario();
        Self {
            uuid: Some(stub.id()),
            request: stub.request().cloned(),
            new_request: Some(stub.new_request().clone()),
            response: stub.response().clone(),
            priority: stub.priority(),
            scenario_name: binding.map(|b| b.scenario_name.clone()),
            required_scenario_state: binding.and_then(|b| b.required_state.clone()),
            new_scenario_state: binding.and_then(|b| b.new_state.clone()),
        }
    }
}

impl StubRule {
    /// Build a stub from a document.
    ///
    /// A legacy `request` wins over a stored `newRequest`: the canonical form
    /// is re-derived rather than trusted. Documents without a `uuid` get one
    /// from `ids`.
    pub fn from_document(
        doc: StubMappingDocument,
        ids: &dyn IdGenerator,
        policy: UrlConflictPolicy,
    ) -> Result<StubRule, StubError> {
        let id = doc.uuid.unwrap_or_else(|| ids.next_id());

        let match_spec = match (doc.request, doc.new_request) {
            (Some(request), _) => MatchSpec::from_legacy(request, policy)?,
            (None, Some(new_request)) => MatchSpec::from_canonical(new_request)?,
            (None, None) => return Err(StubError::MissingField("request")),
        };

        let scenario = match doc.scenario_name {
            Some(scenario_name) => Some(ScenarioBinding {
                scenario_name,
                required_state: doc.required_scenario_state,
                new_state: doc.new_scenario_state,
            }),
            None if doc.new_scenario_state.is_some() => {
                return Err(StubError::TransitionWithoutScenario(id));
            }
            None if doc.required_scenario_state.is_some() => {
                return Err(StubError::RequiredStateWithoutScenario(id));
            }
            None => None,
        };

        let mut stub = StubRule::new(id, match_spec, doc.response);
        stub.set_priority(doc.priority);
        stub.set_scenario(scenario);
        Ok(stub)
    }

    /// Parse a stub mapping JSON document with random ids and strict URL
    /// validation.
    pub fn from_json(json: &str) -> Result<StubRule, StubError> {
        let doc: StubMappingDocument = serde_json::from_str(json)?;
        StubRule::from_document(doc, &RandomIds, UrlConflictPolicy::Reject)
    }

    pub fn to_document(&self) -> StubMappingDocument {
        StubMappingDocument::from(self)
    }

    pub fn to_json(&self) -> Result<String, StubError> {
        Ok(serde_json::to_string(&self.to_document())?)
    }

    pub fn to_json_pretty(&self) -> Result<String, StubError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }
}

impl fmt::Display for StubRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
