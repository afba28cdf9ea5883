//! Structured error types shared across sweepdag crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SweepError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (offending field, job name, path, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the sweep compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SweepError {
    /// Invalid user supplied configuration. Raised before any job is compiled.
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Broken expansion/compilation invariant. Indicates a defect, not bad input.
    #[error("internal invariant violated: {0}")]
    Internal(ErrorInfo),
    /// The submission backend rejected the rendered graph.
    #[error("backend error: {0}")]
    Backend(ErrorInfo),
    /// Filesystem failures while preparing directories or writing artifacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SweepError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SweepError::Config(info)
            | SweepError::Internal(info)
            | SweepError::Backend(info)
            | SweepError::Io(info)
            | SweepError::Serde(info) => info,
        }
    }

    /// True when the error was caused by the supplied configuration rather
    /// than by a defect or the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(self, SweepError::Config(_) | SweepError::Serde(_))
    }

    /// Shorthand for a configuration error naming the offending field.
    pub fn config(
        code: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SweepError::Config(ErrorInfo::new(code, message).with_context("field", field))
    }

    /// Shorthand for an invariant violation.
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        SweepError::Internal(ErrorInfo::new(code, message))
    }

    /// Wraps a filesystem error together with the path that triggered it.
    pub fn io(
        code: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        err: impl ToString,
    ) -> Self {
        SweepError::Io(
            ErrorInfo::new(code, err.to_string())
                .with_context("path", path.as_ref().display().to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_context_in_key_order() {
        let info = ErrorInfo::new("E1", "boom")
            .with_context("z", "last")
            .with_context("a", "first")
            .with_hint("try again");
        assert_eq!(
            info.to_string(),
            "boom (code: E1) | context: [a=first, z=last] | hint: try again"
        );
    }

    #[test]
    fn config_shorthand_names_the_field() {
        let err = SweepError::config("config.accounting", "accounting", "must not be empty");
        assert!(err.is_user_error());
        assert_eq!(err.info().context.get("field").map(String::as_str), Some("accounting"));
    }
}
