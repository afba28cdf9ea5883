//! Closed identifier registries for detectors and samplers.
//!
//! A registry is a sorted set of canonical identifiers. Lookups normalise the
//! candidate (trim + case folding) before the membership check so callers
//! never have to care about how the user spelled an identifier. Extensions are
//! explicit: new identifiers must be [`Registry::register`]ed before use.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Interferometers understood by the analysis executables out of the box.
pub const KNOWN_DETECTORS: &[&str] = &["H1", "L1", "V1"];

/// Samplers the analysis executables are known to ship with.
pub const KNOWN_SAMPLERS: &[&str] = &[
    "cpnest",
    "dynesty",
    "emcee",
    "nestle",
    "ptemcee",
    "pymc3",
    "pymultinest",
    "ultranest",
];

/// How identifiers are folded before they are stored or looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    /// `h1` becomes `H1`.
    Upper,
    /// `Dynesty` becomes `dynesty`.
    Lower,
}

impl Case {
    fn fold(self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            Case::Upper => trimmed.to_uppercase(),
            Case::Lower => trimmed.to_lowercase(),
        }
    }
}

/// Named whitelist of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    kind: String,
    case: Case,
    members: BTreeSet<String>,
}

impl Registry {
    /// Creates an empty registry. `kind` is used in diagnostics ("detector").
    pub fn empty(kind: impl Into<String>, case: Case) -> Self {
        Self {
            kind: kind.into(),
            case,
            members: BTreeSet::new(),
        }
    }

    /// Registry seeded with [`KNOWN_DETECTORS`].
    pub fn detectors() -> Self {
        let mut registry = Self::empty("detector", Case::Upper);
        for id in KNOWN_DETECTORS {
            registry.register(id);
        }
        registry
    }

    /// Registry seeded with [`KNOWN_SAMPLERS`].
    pub fn samplers() -> Self {
        let mut registry = Self::empty("sampler", Case::Lower);
        for id in KNOWN_SAMPLERS {
            registry.register(id);
        }
        registry
    }

    /// Adds an identifier, returning its canonical form.
    pub fn register(&mut self, id: &str) -> String {
        let canonical = self.normalize(id);
        self.members.insert(canonical.clone());
        canonical
    }

    /// Folds the identifier according to the registry's case policy.
    pub fn normalize(&self, id: &str) -> String {
        self.case.fold(id)
    }

    /// Returns the canonical identifier when `id` is a member.
    pub fn lookup(&self, id: &str) -> Option<&str> {
        let canonical = self.normalize(id);
        self.members.get(&canonical).map(String::as_str)
    }

    /// True when `id` (after normalisation) is a member.
    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Label used in diagnostics.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Iterates the members in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, id) in self.members.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "]")
    }
}
