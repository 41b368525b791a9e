//! Integration tests for stub selection through the public API.
//!
//! Stubs are loaded from JSON documents the way an admin API or a mappings
//! directory would hand them over, and requests are matched with a small
//! method + path matcher standing in for the real predicate engine.

use rift_stubs::pattern::{RequestMethod, UrlPattern};
use rift_stubs::stub::SequentialIds;
use rift_stubs::{
    EngineConfig, InMemoryMappingStore, RequestMatcher, StubError, StubRegistry, StubRule, STARTED,
};
use std::sync::Arc;

struct Request {
    method: RequestMethod,
    path: &'static str,
}

fn get(path: &'static str) -> Request {
    Request {
        method: RequestMethod::Get,
        path,
    }
}

fn post(path: &'static str) -> Request {
    Request {
        method: RequestMethod::Post,
        path,
    }
}

struct MethodAndPath;

impl RequestMatcher<Request> for MethodAndPath {
    fn matches(&self, stub: &StubRule, request: &Request) -> bool {
        let pattern = stub.new_request();
        let method_ok = pattern.method.is_any() || pattern.method == request.method;
        let path_ok = match &pattern.url {
            UrlPattern::Any => true,
            UrlPattern::Path(path) | UrlPattern::Url(path) => path == request.path,
            _ => false,
        };
        method_ok && path_ok
    }
}

fn body(stub: &StubRule) -> String {
    stub.response().as_value()["body"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

const TODO_LIST: &str = r#"{
    "request": {"method": "GET", "urlPath": "/todo/items"},
    "response": {"status": 200, "body": "Buy milk"},
    "scenarioName": "To do list",
    "requiredScenarioState": "Started"
}"#;

const ADD_ITEM: &str = r#"{
    "request": {"method": "POST", "urlPath": "/todo/items"},
    "response": {"status": 201, "body": "added"},
    "scenarioName": "To do list",
    "requiredScenarioState": "Started",
    "newScenarioState": "Cancel newspaper item added"
}"#;

const UPDATED_LIST: &str = r#"{
    "request": {"method": "GET", "urlPath": "/todo/items"},
    "response": {"status": 200, "body": "Buy milk, Cancel newspaper subscription"},
    "scenarioName": "To do list",
    "requiredScenarioState": "Cancel newspaper item added"
}"#;

#[test]
fn test_todo_list_scenario() {
    let registry = StubRegistry::new();
    for doc in [TODO_LIST, ADD_ITEM, UPDATED_LIST] {
        registry.register_json(doc).unwrap();
    }

    let served = registry.serve(&get("/todo/items"), &MethodAndPath).unwrap();
    assert_eq!(body(&served), "Buy milk");

    let served = registry.serve(&post("/todo/items"), &MethodAndPath).unwrap();
    assert_eq!(body(&served), "added");

    let served = registry.serve(&get("/todo/items"), &MethodAndPath).unwrap();
    assert_eq!(body(&served), "Buy milk, Cancel newspaper subscription");

    registry.reset_scenarios();
    assert_eq!(
        registry.scenario_state("To do list").as_deref(),
        Some(STARTED)
    );
}

#[test]
fn test_catch_all_loses_to_specific_priority() {
    let registry = StubRegistry::new();
    registry
        .register_json(
            r#"{"request": {"method": "ANY"}, "response": {"status": 404, "body": "fallback"}, "priority": 10}"#,
        )
        .unwrap();
    registry
        .register_json(
            r#"{"request": {"method": "GET", "url": "/health"}, "response": {"status": 200, "body": "up"}, "priority": 1}"#,
        )
        .unwrap();

    assert_eq!(
        body(&registry.serve(&get("/health"), &MethodAndPath).unwrap()),
        "up"
    );
    assert_eq!(
        body(&registry.serve(&get("/other"), &MethodAndPath).unwrap()),
        "fallback"
    );
}

#[test]
fn test_persist_and_reload_preserves_selection() {
    let store = InMemoryMappingStore::new();
    let ids = Arc::new(SequentialIds::new());
    let registry = StubRegistry::new().with_id_generator(ids.clone());
    registry
        .register_json(r#"{"request": {"urlPath": "/a"}, "response": {"body": "first"}}"#)
        .unwrap();
    registry
        .register_json(r#"{"request": {"urlPath": "/a"}, "response": {"body": "second"}}"#)
        .unwrap();
    registry.persist_transient(&store).unwrap();

    let restored = StubRegistry::new();
    restored.load_from(&store).unwrap();
    assert_eq!(
        body(&restored.serve(&get("/a"), &MethodAndPath).unwrap()),
        "first"
    );
    assert_eq!(restored.list(), registry.list());
}

#[test]
fn test_configuration_errors_surface_at_registration() {
    let registry = StubRegistry::from_config(&EngineConfig::default());

    let err = registry
        .register_json(r#"{"request": {"urlPath": "/x"}, "response": {}, "newScenarioState": "B"}"#)
        .unwrap_err();
    assert!(matches!(err, StubError::TransitionWithoutScenario(_)));

    let err = registry
        .register_json(r#"{"request": {"urlPath": "/x", "urlPathPattern": "/x.*"}, "response": {}}"#)
        .unwrap_err();
    assert!(matches!(err, StubError::ConflictingUrlPatterns(_)));

    let err = registry.register_json(r#"{"request": {"urlPath": "/x"}}"#).unwrap_err();
    assert!(matches!(err, StubError::Deserialization(_)));

    assert!(registry.is_empty());
}
