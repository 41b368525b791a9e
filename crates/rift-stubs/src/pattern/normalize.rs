//! Legacy → canonical pattern normalization.

use super::canonical::NewRequestPattern;
use super::legacy::{RequestPattern, ValuePattern};
use super::types::{MultiValuePattern, StringValuePattern, UrlPattern};
use crate::error::StubError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// What to do when a legacy pattern sets more than one URL alternative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlConflictPolicy {
    /// Fail normalization with [`StubError::ConflictingUrlPatterns`]
    #[default]
    Reject,
    /// Use the first alternative in `url`, `urlPattern`, `urlPath`,
    /// `urlPathPattern` order
    FirstWins,
}

impl UrlPattern {
    /// Pick the URL criterion from the four legacy alternatives.
    pub fn from_one_of(
        legacy: &RequestPattern,
        policy: UrlConflictPolicy,
    ) -> Result<UrlPattern, StubError> {
        let alternatives = legacy.url_alternatives();
        if alternatives.len() > 1 {
            let names: Vec<&'static str> = alternatives.iter().map(|(name, _)| *name).collect();
            match policy {
                UrlConflictPolicy::Reject => {
                    return Err(StubError::ConflictingUrlPatterns(names));
                }
                UrlConflictPolicy::FirstWins => {
                    warn!(
                        "Multiple URL criteria set ({}), using '{}'",
                        names.join(", "),
                        names[0]
                    );
                }
            }
        }

        let url = match alternatives.first() {
            None => UrlPattern::Any,
            Some(&("url", v)) => UrlPattern::Url(v.to_string()),
            Some(&("urlPattern", v)) => UrlPattern::UrlRegex(v.to_string()),
            Some(&("urlPath", v)) => UrlPattern::Path(v.to_string()),
            Some(&(_, v)) => UrlPattern::PathRegex(v.to_string()),
        };
        url.validate()?;
        Ok(url)
    }
}

/// Derive the canonical pattern from a legacy one.
///
/// Pure: the same input always yields the same output. Callers rerun it every
/// time the legacy pattern is replaced.
pub fn normalize(
    legacy: &RequestPattern,
    policy: UrlConflictPolicy,
) -> Result<NewRequestPattern, StubError> {
    Ok(NewRequestPattern {
        url: UrlPattern::from_one_of(legacy, policy)?,
        method: legacy.method,
        headers: to_multi_value_map(legacy.headers.as_ref())?,
        query_parameters: to_multi_value_map(legacy.query_parameters.as_ref())?,
        cookies: to_string_value_map(legacy.cookies.as_ref())?,
        body_patterns: to_string_value_list(legacy.body_patterns.as_deref())?,
    })
}

fn to_multi_value_map(
    map: Option<&BTreeMap<String, ValuePattern>>,
) -> Result<Option<BTreeMap<String, MultiValuePattern>>, StubError> {
    map.map(|map| {
        map.iter()
            .map(|(key, pattern)| {
                let pattern = pattern.to_string_value_pattern()?;
                Ok((key.clone(), MultiValuePattern::single(pattern)))
            })
            .collect()
    })
    .transpose()
}

fn to_string_value_map(
    map: Option<&BTreeMap<String, ValuePattern>>,
) -> Result<Option<BTreeMap<String, StringValuePattern>>, StubError> {
    map.map(|map| {
        map.iter()
            .map(|(key, pattern)| Ok((key.clone(), pattern.to_string_value_pattern()?)))
            .collect()
    })
    .transpose()
}

fn to_string_value_list(
    patterns: Option<&[ValuePattern]>,
) -> Result<Option<Vec<StringValuePattern>>, StubError> {
    patterns
        .map(|patterns| {
            patterns
                .iter()
                .map(ValuePattern::to_string_value_pattern)
                .collect()
        })
        .transpose()
}
