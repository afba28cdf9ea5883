//! Detector identifier normalisation.
//!
//! User input arrives either as one delimited string (`"H1 L1"`,
//! `"[H1, L1]"`, `"'H1','L1'"`) or as a list of tokens, each of which may
//! itself be delimited. Every form flattens to the same token stream, which is
//! case folded, validated against the registry and stored sorted.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use sweepdag_core::errors::{ErrorInfo, SweepError};
use sweepdag_core::registry::Registry;

const DELIMITERS: &[char] = &[',', '[', ']', '"', '\''];

/// Splits a delimited string into bare tokens.
///
/// `"[H1, 'L1'] V1"` yields `["H1", "L1", "V1"]`.
pub fn split_tokens(raw: &str) -> Vec<String> {
    raw.replace(DELIMITERS, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Sorted, non-empty set of registered detector identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectorSet(BTreeSet<String>);

impl DetectorSet {
    /// Normalises and validates raw detector input.
    ///
    /// Fails with a configuration error naming the first token that is not in
    /// `registry`, or when the input holds no tokens at all.
    pub fn parse<S: AsRef<str>>(input: &[S], registry: &Registry) -> Result<Self, SweepError> {
        let mut members = BTreeSet::new();
        for token in input.iter().flat_map(|raw| split_tokens(raw.as_ref())) {
            match registry.lookup(&token) {
                Some(canonical) => {
                    members.insert(canonical.to_string());
                }
                None => {
                    return Err(SweepError::Config(
                        ErrorInfo::new(
                            "config.unknown_detector",
                            format!(
                                "detectors contains \"{}\" not in the known {} list: {}",
                                token,
                                registry.kind(),
                                registry
                            ),
                        )
                        .with_context("field", "detectors")
                        .with_context("token", token.clone()),
                    ));
                }
            }
        }
        if members.is_empty() {
            return Err(SweepError::config(
                "config.empty_detectors",
                "detectors",
                "at least one detector must be given",
            ));
        }
        Ok(Self(members))
    }

    pub(crate) fn singleton(id: &str) -> Self {
        Self(BTreeSet::from([id.to_string()]))
    }

    /// Iterates identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of detectors in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for sets built through [`DetectorSet::parse`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `id` is a member.
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// True when every member of `self` is also in `other`.
    pub fn is_subset(&self, other: &DetectorSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Concatenated identifiers, e.g. `H1L1`. Used in job names and labels.
    pub fn joined(&self) -> String {
        self.0.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for DetectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().map(String::as_str).collect::<Vec<_>>().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_strips_brackets_quotes_and_commas() {
        assert_eq!(split_tokens("[H1, 'L1'] \"V1\""), vec!["H1", "L1", "V1"]);
        assert!(split_tokens(" , [] ").is_empty());
    }

    #[test]
    fn parse_sorts_folds_and_dedups() {
        let registry = Registry::detectors();
        let set = DetectorSet::parse(&["l1 h1", "H1"], &registry).expect("valid");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["H1", "L1"]);
        assert_eq!(set.joined(), "H1L1");
        assert_eq!(set.to_string(), "H1 L1");
    }

    #[test]
    fn unknown_token_is_named() {
        let registry = Registry::detectors();
        let err = DetectorSet::parse(&["H1 K1"], &registry).unwrap_err();
        assert_eq!(err.info().code, "config.unknown_detector");
        assert_eq!(err.info().context.get("token").map(String::as_str), Some("K1"));
        assert!(err.info().message.contains("[H1, L1, V1]"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let registry = Registry::detectors();
        let err = DetectorSet::parse(&["[]"], &registry).unwrap_err();
        assert_eq!(err.info().code, "config.empty_detectors");
    }
}
