//! Error types for strata.

use thiserror::Error;

/// The main error type for schema definition and query compilation.
///
/// Every failure here is a deterministic function of the inputs; nothing is
/// transient, so nothing is ever retried.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Referenced an entity that was never defined.
    #[error("entity '{0}' is not defined")]
    NotFound(String),

    /// Attempted to define an entity under a name that is already taken.
    #[error("entity '{0}' is already defined")]
    DuplicateEntity(String),

    /// The `extends` option does not reference a previously defined entity.
    #[error("entity '{entity}' extends '{parent}', which is not defined")]
    InvalidParent { entity: String, parent: String },

    /// A referenced field does not exist on the resolved entity.
    #[error("field '{field}' does not exist on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    /// Child/parent primary-key cardinalities disagree during join construction.
    #[error("primary key count mismatch between '{child}' and parent '{parent}'")]
    PrimaryKeyMismatch { child: String, parent: String },

    /// An operation requiring a single-column primary key met more than one.
    #[error("entity '{0}' uses a composite primary key, which is not supported")]
    CompositeKeyUnsupported(String),

    /// An operation requiring a primary key met an entity that declares none.
    #[error("entity '{0}' declares no primary key")]
    MissingPrimaryKey(String),

    /// A relation field is misconfigured for its relation kind.
    #[error("invalid relation on field '{field}' of entity '{entity}': {reason}")]
    InvalidRelation {
        entity: String,
        field: String,
        reason: String,
    },

    /// A persistence operation was requested on an instance in the wrong
    /// lifecycle state (e.g. creating an already-persisted record).
    #[error("invalid operation state: {0}")]
    InvalidOperationState(String),

    /// A query expected to match at most one record matched several.
    #[error("more than one result found")]
    NonUniqueResult,

    /// The storage adapter reported a failure.
    #[error("adapter error: {0}")]
    Adapter(String),
}

impl StrataError {
    /// Create an [`StrataError::UnknownField`] for the given entity/field pair.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an [`StrataError::InvalidRelation`] with a reason.
    pub fn invalid_relation(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRelation {
            entity: entity.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for strata operations.
pub type StrataResult<T> = Result<T, StrataError>;
