//! Error classification for trip accounting.
//!
//! # Responsibilities
//! - Decide whether a failed call counts toward tripping a breaker
//! - Give operation errors a stable identifying name
//!
//! # Design Decisions
//! - An empty matcher list means every error qualifies
//! - Names compare exactly, messages compare as case-insensitive substrings
//! - Classification never alters the error; the caller always gets it back

use std::borrow::Cow;
use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error that can be classified by name and message.
///
/// The message is the error's `Display` output.
pub trait NamedError: fmt::Display {
    /// Identifying name of the error, e.g. `"NetworkError"`.
    fn error_name(&self) -> Cow<'_, str>;
}

impl NamedError for io::Error {
    fn error_name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{:?}", self.kind()))
    }
}

impl<T: NamedError + ?Sized> NamedError for Box<T> {
    fn error_name(&self) -> Cow<'_, str> {
        (**self).error_name()
    }
}

/// A failure reported by a protected dependency.
///
/// Convenience error for callers whose client libraries only surface a kind
/// and a message (HTTP gateways, SDK wrappers).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct DependencyError {
    pub name: String,
    pub message: String,
}

impl DependencyError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new("NetworkError", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new("TimeoutError", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("ValidationError", message)
    }
}

impl NamedError for DependencyError {
    fn error_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }
}

/// One entry of a breaker's expected-error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MatcherRepr", into = "MatcherRepr")]
pub enum ErrorMatcher {
    /// Error name equals the value.
    Named(String),
    /// Error message contains the value, ignoring case.
    MessageContains(String),
    /// Either of the above.
    Pattern(String),
}

impl ErrorMatcher {
    pub fn named(name: impl Into<String>) -> Self {
        ErrorMatcher::Named(name.into())
    }

    pub fn message_contains(needle: impl Into<String>) -> Self {
        ErrorMatcher::MessageContains(needle.into())
    }

    /// The raw text this matcher compares against.
    pub fn text(&self) -> &str {
        match self {
            ErrorMatcher::Named(s) | ErrorMatcher::MessageContains(s) | ErrorMatcher::Pattern(s) => s,
        }
    }

    fn matches(&self, name: &str, message_lower: &str) -> bool {
        match self {
            ErrorMatcher::Named(n) => name == n,
            ErrorMatcher::MessageContains(s) => message_lower.contains(&s.to_lowercase()),
            ErrorMatcher::Pattern(s) => name == s || message_lower.contains(&s.to_lowercase()),
        }
    }
}

impl From<&str> for ErrorMatcher {
    fn from(value: &str) -> Self {
        ErrorMatcher::Pattern(value.to_string())
    }
}

impl From<String> for ErrorMatcher {
    fn from(value: String) -> Self {
        ErrorMatcher::Pattern(value)
    }
}

impl fmt::Display for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMatcher::Named(s) => write!(f, "name={}", s),
            ErrorMatcher::MessageContains(s) => write!(f, "message~{}", s),
            ErrorMatcher::Pattern(s) => f.write_str(s),
        }
    }
}

/// Config representation: a bare string is a `Pattern`, a table picks the kind.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MatcherRepr {
    Plain(String),
    Tagged(TaggedMatcher),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaggedMatcher {
    Named(String),
    MessageContains(String),
}

impl From<MatcherRepr> for ErrorMatcher {
    fn from(repr: MatcherRepr) -> Self {
        match repr {
            MatcherRepr::Plain(s) => ErrorMatcher::Pattern(s),
            MatcherRepr::Tagged(TaggedMatcher::Named(s)) => ErrorMatcher::Named(s),
            MatcherRepr::Tagged(TaggedMatcher::MessageContains(s)) => ErrorMatcher::MessageContains(s),
        }
    }
}

impl From<ErrorMatcher> for MatcherRepr {
    fn from(matcher: ErrorMatcher) -> Self {
        match matcher {
            ErrorMatcher::Pattern(s) => MatcherRepr::Plain(s),
            ErrorMatcher::Named(s) => MatcherRepr::Tagged(TaggedMatcher::Named(s)),
            ErrorMatcher::MessageContains(s) => MatcherRepr::Tagged(TaggedMatcher::MessageContains(s)),
        }
    }
}

/// Return true if `error` counts toward tripping under `expected`.
pub fn is_qualifying<E>(error: &E, expected: &[ErrorMatcher]) -> bool
where
    E: NamedError + ?Sized,
{
    if expected.is_empty() {
        return true;
    }

    let name = error.error_name();
    let message = error.to_string().to_lowercase();
    expected.iter().any(|m| m.matches(&name, &message))
}
