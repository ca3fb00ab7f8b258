//! Error types for `keyward-core`.
//!
//! The intent codec never fails; these cover the model conversions that can.

/// Errors from converting or validating API models.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A required field was empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A field was present but out of range or malformed.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Unrecognized subscription tier name.
    #[error("unknown tier: {0}")]
    UnknownTier(String),
}
