//! Canonical pattern building blocks shared by the legacy and canonical
//! request patterns.
//!
//! The patterns are carried as data only. Evaluating them against a request is
//! the job of the matcher collaborator (see [`crate::selector::RequestMatcher`]).

use crate::error::StubError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Single string-valued matching operator.
///
/// Serializes with the operator as the key, e.g. `{"equalTo": "text/plain"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringValuePattern {
    EqualTo(String),
    Contains(String),
    Matches(String),
    DoesNotMatch(String),
    EqualToJson(String),
    MatchesJsonPath(String),
    EqualToXml(String),
    #[serde(rename = "matchesXPath")]
    MatchesXPath(String),
    /// Field must be absent (`true`) or present with any value (`false`)
    Absent(bool),
}

impl StringValuePattern {
    /// Operator name as it appears on the wire
    pub fn operator(&self) -> &'static str {
        match self {
            StringValuePattern::EqualTo(_) => "equalTo",
            StringValuePattern::Contains(_) => "contains",
            StringValuePattern::Matches(_) => "matches",
            StringValuePattern::DoesNotMatch(_) => "doesNotMatch",
            StringValuePattern::EqualToJson(_) => "equalToJson",
            StringValuePattern::MatchesJsonPath(_) => "matchesJsonPath",
            StringValuePattern::EqualToXml(_) => "equalToXml",
            StringValuePattern::MatchesXPath(_) => "matchesXPath",
            StringValuePattern::Absent(_) => "absent",
        }
    }

    /// Reject regex operands that would never compile at match time.
    pub fn validate(&self) -> Result<(), StubError> {
        match self {
            StringValuePattern::Matches(pattern) | StringValuePattern::DoesNotMatch(pattern) => {
                compile_check(pattern)
            }
            _ => Ok(()),
        }
    }
}

/// Ordered list of patterns applied to a single multi-valued key
/// (header or query parameter).
///
/// Legacy stubs always produce exactly one entry per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiValuePattern(Vec<StringValuePattern>);

impl MultiValuePattern {
    pub fn single(pattern: StringValuePattern) -> Self {
        Self(vec![pattern])
    }

    pub fn new(patterns: Vec<StringValuePattern>) -> Self {
        Self(patterns)
    }

    pub fn patterns(&self) -> &[StringValuePattern] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// URL criterion of a request pattern. At most one alternative applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UrlPattern {
    /// No URL criterion
    #[default]
    Any,
    /// Exact match on path and query (`url`)
    Url(String),
    /// Regex over path and query (`urlPattern`)
    UrlRegex(String),
    /// Exact match on the path only (`urlPath`)
    Path(String),
    /// Regex over the path only (`urlPathPattern`)
    PathRegex(String),
}

impl UrlPattern {
    /// Field name used for this alternative in stub documents
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            UrlPattern::Any => None,
            UrlPattern::Url(_) => Some("url"),
            UrlPattern::UrlRegex(_) => Some("urlPattern"),
            UrlPattern::Path(_) => Some("urlPath"),
            UrlPattern::PathRegex(_) => Some("urlPathPattern"),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            UrlPattern::Any => None,
            UrlPattern::Url(v)
            | UrlPattern::UrlRegex(v)
            | UrlPattern::Path(v)
            | UrlPattern::PathRegex(v) => Some(v),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, UrlPattern::Any)
    }

    pub fn validate(&self) -> Result<(), StubError> {
        match self {
            UrlPattern::UrlRegex(pattern) | UrlPattern::PathRegex(pattern) => {
                compile_check(pattern)
            }
            _ => Ok(()),
        }
    }
}

/// HTTP method criterion. `ANY` matches every method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
    #[default]
    Any,
}

impl RequestMethod {
    pub fn is_any(&self) -> bool {
        matches!(self, RequestMethod::Any)
    }
}

fn compile_check(pattern: &str) -> Result<(), StubError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| StubError::invalid_pattern(pattern, e))
}
