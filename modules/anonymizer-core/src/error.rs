//! Typed errors for extraction and feed storage.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Resource family an operation works on, echoed in error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resource {
    User,
    Iot,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("USER"),
            Self::Iot => f.write_str("IOT"),
        }
    }
}

/// One rejected field group with the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub fields: Vec<String>,
    pub message: String,
}

impl FieldViolation {
    pub fn new(fields: &[&str], message: impl Into<String>) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.fields.join(", "), self.message)
    }
}

/// Every violation found while validating one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: FieldViolation) {
        self.0.push(violation);
    }

    /// Record the error of `result` (if any) and hand back its value.
    pub fn check<T>(&mut self, result: Result<T, FieldViolation>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.0.push(violation);
                None
            }
        }
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.0.iter()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Violations> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<FieldViolation> for Violations {
    fn from(violation: FieldViolation) -> Self {
        Self(vec![violation])
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Errors surfaced by the anonymizer domain operations.
#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// Request failed validation; nothing was sent to storage
    #[error("malformed request: {0}")]
    MalformedRequest(Violations),

    /// Query ran but matched nothing
    #[error("no {resource} data matches the request")]
    NotFound { resource: Resource },

    /// Storage rejected or failed the operation
    #[error("{resource} storage failure: {source}")]
    Storage {
        resource: Resource,
        #[source]
        source: sqlx::Error,
    },
}

impl AnonymizerError {
    /// Adapter for `map_err` on sqlx results.
    pub fn storage(resource: Resource) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Storage { resource, source }
    }

    /// Like [`storage`](Self::storage), logging the failing statement first.
    pub fn storage_at(resource: Resource, query: &str) -> impl FnOnce(sqlx::Error) -> Self + '_ {
        move |source| {
            tracing::warn!(error = %source, resource = %resource, query, "Storage operation failed");
            Self::Storage { resource, source }
        }
    }

    /// True when storage refused the write because the primary key already exists.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::Storage {
                source: sqlx::Error::Database(db),
                ..
            } => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<Violations> for AnonymizerError {
    fn from(violations: Violations) -> Self {
        Self::MalformedRequest(violations)
    }
}

/// Result type alias for anonymizer operations.
pub type AnonymizerResult<T> = std::result::Result<T, AnonymizerError>;
