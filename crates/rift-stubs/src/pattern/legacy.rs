//! Legacy request pattern: one value pattern per header, query parameter and
//! cookie, and URL criteria spread over four optional fields.

use super::types::{RequestMethod, StringValuePattern};
use crate::error::StubError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Legacy single-value pattern. Operators are optional fields; the first one
/// set (in declaration order) is the effective operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equal_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equal_to_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equal_to_xml: Option<String>,
    #[serde(
        default,
        rename = "matchesXPath",
        skip_serializing_if = "Option::is_none"
    )]
    pub matches_xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_json_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub does_not_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absent: Option<bool>,
}

impl ValuePattern {
    pub fn equal_to(value: impl Into<String>) -> Self {
        Self {
            equal_to: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            contains: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn matches(regex: impl Into<String>) -> Self {
        Self {
            matches: Some(regex.into()),
            ..Default::default()
        }
    }

    pub fn absent() -> Self {
        Self {
            absent: Some(true),
            ..Default::default()
        }
    }

    /// Convert to the canonical single-operator form.
    pub fn to_string_value_pattern(&self) -> Result<StringValuePattern, StubError> {
        let pattern = if let Some(v) = &self.equal_to {
            StringValuePattern::EqualTo(v.clone())
        } else if let Some(v) = &self.equal_to_json {
            StringValuePattern::EqualToJson(v.clone())
        } else if let Some(v) = &self.equal_to_xml {
            StringValuePattern::EqualToXml(v.clone())
        } else if let Some(v) = &self.matches_xpath {
            StringValuePattern::MatchesXPath(v.clone())
        } else if let Some(v) = &self.matches_json_path {
            StringValuePattern::MatchesJsonPath(v.clone())
        } else if let Some(v) = &self.contains {
            StringValuePattern::Contains(v.clone())
        } else if let Some(v) = &self.matches {
            StringValuePattern::Matches(v.clone())
        } else if let Some(v) = &self.does_not_match {
            StringValuePattern::DoesNotMatch(v.clone())
        } else if let Some(absent) = self.absent {
            StringValuePattern::Absent(absent)
        } else {
            return Err(StubError::invalid_pattern(
                "{}",
                "value pattern declares no operator",
            ));
        };
        pattern.validate()?;
        Ok(pattern)
    }
}

/// Legacy request-matching criteria as found in older stub documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<String>,
    #[serde(default)]
    pub method: RequestMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, ValuePattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<BTreeMap<String, ValuePattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, ValuePattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_patterns: Option<Vec<ValuePattern>>,
}

impl RequestPattern {
    /// Pattern matching `method` on an exact path
    pub fn new(method: RequestMethod, url_path: impl Into<String>) -> Self {
        Self {
            method,
            url_path: Some(url_path.into()),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, pattern: ValuePattern) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), pattern);
        self
    }

    pub fn with_query_parameter(mut self, name: impl Into<String>, pattern: ValuePattern) -> Self {
        self.query_parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), pattern);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, pattern: ValuePattern) -> Self {
        self.cookies
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), pattern);
        self
    }

    pub fn with_body_pattern(mut self, pattern: ValuePattern) -> Self {
        self.body_patterns.get_or_insert_with(Vec::new).push(pattern);
        self
    }

    /// URL alternatives that are set, in precedence order
    pub(crate) fn url_alternatives(&self) -> Vec<(&'static str, &str)> {
        [
            ("url", self.url.as_deref()),
            ("urlPattern", self.url_pattern.as_deref()),
            ("urlPath", self.url_path.as_deref()),
            ("urlPathPattern", self.url_path_pattern.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}
