//! Canonical (multi-value) request pattern evaluated by the matching engine.

use super::types::{MultiValuePattern, RequestMethod, StringValuePattern, UrlPattern};
use crate::error::StubError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical request-matching criteria.
///
/// Absent maps stay `None` so "not constrained" is distinguishable from
/// "constrained by an empty set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NewRequestPatternRaw", into = "NewRequestPatternRaw")]
pub struct NewRequestPattern {
    pub url: UrlPattern,
    pub method: RequestMethod,
    pub headers: Option<BTreeMap<String, MultiValuePattern>>,
    pub query_parameters: Option<BTreeMap<String, MultiValuePattern>>,
    pub cookies: Option<BTreeMap<String, StringValuePattern>>,
    pub body_patterns: Option<Vec<StringValuePattern>>,
}

impl NewRequestPattern {
    /// Pattern that matches every request
    pub fn any() -> Self {
        Self::default()
    }

    /// Check every regex operand compiles.
    pub fn validate(&self) -> Result<(), StubError> {
        self.url.validate()?;
        let multi = self
            .headers
            .iter()
            .chain(self.query_parameters.iter())
            .flat_map(|map| map.values())
            .flat_map(|multi| multi.patterns());
        let single = self
            .cookies
            .iter()
            .flat_map(|map| map.values())
            .chain(self.body_patterns.iter().flatten());
        multi.chain(single).try_for_each(StringValuePattern::validate)
    }
}

/// Wire form: URL alternatives are separate optional fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewRequestPatternRaw {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_path_pattern: Option<String>,
    #[serde(default)]
    method: RequestMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    headers: Option<BTreeMap<String, MultiValuePattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query_parameters: Option<BTreeMap<String, MultiValuePattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cookies: Option<BTreeMap<String, StringValuePattern>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body_patterns: Option<Vec<StringValuePattern>>,
}

impl TryFrom<NewRequestPatternRaw> for NewRequestPattern {
    type Error = StubError;

    fn try_from(raw: NewRequestPatternRaw) -> Result<Self, Self::Error> {
        let alternatives = [
            raw.url.map(UrlPattern::Url),
            raw.url_pattern.map(UrlPattern::UrlRegex),
            raw.url_path.map(UrlPattern::Path),
            raw.url_path_pattern.map(UrlPattern::PathRegex),
        ];
        let mut set = Vec::new();
        let mut url = UrlPattern::Any;
        for alternative in alternatives.into_iter().flatten() {
            set.extend(alternative.field_name());
            url = alternative;
        }
        // The canonical form never carries more than one URL criterion
        if set.len() > 1 {
            return Err(StubError::ConflictingUrlPatterns(set));
        }

        Ok(Self {
            url,
            method: raw.method,
            headers: raw.headers,
            query_parameters: raw.query_parameters,
            cookies: raw.cookies,
            body_patterns: raw.body_patterns,
        })
    }
}

impl From<NewRequestPattern> for NewRequestPatternRaw {
    fn from(pattern: NewRequestPattern) -> Self {
        let mut raw = NewRequestPatternRaw {
            method: pattern.method,
            headers: pattern.headers,
            query_parameters: pattern.query_parameters,
            cookies: pattern.cookies,
            body_patterns: pattern.body_patterns,
            ..Default::default()
        };
        match pattern.url {
            UrlPattern::Any => {}
            UrlPattern::Url(v) => raw.url = Some(v),
            UrlPattern::UrlRegex(v) => raw.url_pattern = Some(v),
            UrlPattern::Path(v) => raw.url_path = Some(v),
            UrlPattern::PathRegex(v) => raw.url_path_pattern = Some(v),
        }
        raw
    }
}
