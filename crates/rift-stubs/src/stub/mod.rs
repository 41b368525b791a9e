//! Stub rules.
//!
//! - `types`: the [`StubRule`] entity, its match criteria and scenario binding
//! - `document`: serialized stub mapping documents
//! - `identity`: id generators

mod document;
mod identity;
mod types;

pub use document::StubMappingDocument;
pub use identity::{IdGenerator, RandomIds, SequentialIds};
pub use types::{
    MatchSpec, ResponseDefinition, ScenarioBinding, StubRule, StubRuleBuilder, DEFAULT_PRIORITY,
    NOT_CONFIGURED,
};
