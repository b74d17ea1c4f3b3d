use std::any::Any;
use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::CellId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A callback returned `Err` or the producer rejected explicitly.
    Raised,
    /// A promise was asked to adopt itself, directly or through other promises.
    Cycle,
    /// A value reached a reaction that cannot use it.
    TypeMismatch,
    /// A callback or thenable panicked.
    Panicked,
    /// Every handle that could settle the promise was dropped.
    Abandoned,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Raised => "raised",
            FailureKind::Cycle => "cycle",
            FailureKind::TypeMismatch => "type mismatch",
            FailureKind::Panicked => "panicked",
            FailureKind::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// The reason carried by a rejected promise.
///
/// A failure may wrap the failure that caused it, so a handler that
/// re-raises keeps the original reason reachable through
/// [`std::error::Error::source`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic, Serialize, Deserialize)]
#[error("{message}")]
#[diagnostic(code(pledge::failure))]
pub struct Failure {
    kind: FailureKind,
    message: String,
    #[source]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<Box<Failure>>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(FailureKind::Raised, message)
    }

    pub fn with_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn cycle(cell: CellId) -> Self {
        Self::with_kind(
            FailureKind::Cycle,
            format!("chaining cycle detected for promise {cell}"),
        )
    }

    pub fn type_mismatch(expected: &str, found: impl fmt::Display) -> Self {
        Self::with_kind(
            FailureKind::TypeMismatch,
            format!("expected {expected}, found {found}"),
        )
    }

    pub fn abandoned() -> Self {
        Self::with_kind(
            FailureKind::Abandoned,
            "promise was dropped before it settled",
        )
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            format!("panic while running callback: {msg}")
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            format!("panic while running callback: {msg}")
        } else {
            "panic while running callback".to_string()
        };
        Self::with_kind(FailureKind::Panicked, message)
    }

    pub fn caused_by(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Failure> {
        self.cause.as_deref()
    }

    /// Walks this failure and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &Failure> {
        std::iter::successors(Some(self), |failure| failure.cause())
    }

    /// The innermost cause, or `self` when there is none.
    pub fn root_cause(&self) -> &Failure {
        self.chain().last().unwrap_or(self)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
