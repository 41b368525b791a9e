//! Stub rules, scenarios and stub selection for Rift HTTP mocking.
//!
//! A stub binds a request pattern to a canned response. For every request the
//! registry keeps the stubs that match structurally, drops those whose scenario
//! is in the wrong state, and serves the one with the lowest priority value,
//! earliest registration first on ties. Serving a stub may move its scenario to
//! a new state.
//!
//! Matching request fields against patterns is left to the embedder through
//! [`selector::RequestMatcher`].

pub mod config;
pub mod error;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod scenario;
pub mod selector;
pub mod stub;

pub use config::EngineConfig;
pub use error::StubError;
pub use registry::{InMemoryMappingStore, MappingStore, StubRegistry};
pub use scenario::{Scenario, ScenarioStates, Scenarios, STARTED};
pub use selector::{select, RequestMatcher};
pub use stub::{
    IdGenerator, MatchSpec, ResponseDefinition, ScenarioBinding, StubMappingDocument, StubRule,
    DEFAULT_PRIORITY,
};
