//! Handle syntax validation.
//!
//! A handle is a dotted hostname identifying a user (`alice.example.com`).
//! Validation is fully anchored over the whole string and reports the first
//! violated rule as a typed [`HandleError`] kind, so route layers can map
//! each failure to a precise message. Handles are stored lowercased.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use miette::Diagnostic;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Maximum total handle length in bytes.
pub const MAX_HANDLE_LEN: usize = 253;
/// Maximum length of a single dot-separated label.
pub const MAX_LABEL_LEN: usize = 63;

/// Why a handle failed validation. Rules are checked in declaration order
/// and the first violation wins.
#[derive(Debug, Error, Diagnostic, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    #[error("handle contains invalid characters")]
    #[diagnostic(
        code(tambour_identity::handle_chars),
        help("only ASCII letters, digits, '.' and '-' are allowed")
    )]
    InvalidCharacters,
    #[error("handle is too long (253 chars max)")]
    #[diagnostic(code(tambour_identity::handle_too_long))]
    TooLong,
    #[error("handle domain needs at least two parts")]
    #[diagnostic(
        code(tambour_identity::handle_too_few_labels),
        help("a bare name like `alice` is not a handle; use `alice.example.com`")
    )]
    TooFewLabels,
    #[error("handle parts can not be empty")]
    #[diagnostic(code(tambour_identity::handle_empty_label))]
    EmptyLabel,
    #[error("handle part too long (max 63 chars)")]
    #[diagnostic(code(tambour_identity::handle_label_too_long))]
    LabelTooLong,
    #[error("handle parts can not start or end with hyphens")]
    #[diagnostic(code(tambour_identity::handle_hyphen_boundary))]
    HyphenBoundary,
    #[error("handle final component (TLD) must start with an ASCII letter")]
    #[diagnostic(code(tambour_identity::handle_invalid_tld))]
    InvalidTld,
}

/// A validated, lowercased handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Handle(SmolStr);

impl Handle {
    /// Validate `raw` against the handle grammar and normalize to lowercase.
    ///
    /// Accepts (and strips) a preceding '@' if present.
    pub fn parse(raw: &str) -> Result<Self, HandleError> {
        let raw = raw.strip_prefix('@').unwrap_or(raw);
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
        {
            return Err(HandleError::InvalidCharacters);
        }
        if raw.len() > MAX_HANDLE_LEN {
            return Err(HandleError::TooLong);
        }
        let labels: Vec<&str> = raw.split('.').collect();
        if labels.len() < 2 {
            return Err(HandleError::TooFewLabels);
        }
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(HandleError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(HandleError::LabelTooLong);
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(HandleError::HyphenBoundary);
            }
            if i + 1 == labels.len() && !label.as_bytes()[0].is_ascii_alphabetic() {
                return Err(HandleError::InvalidTld);
            }
        }
        Ok(Self(SmolStr::from(raw.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Handle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Handle> for String {
    fn from(value: Handle) -> Self {
        value.0.to_string()
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for Handle {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}
