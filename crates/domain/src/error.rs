//! Unified error type for the domain layer
//!
//! Errors here mark wiring bugs (bad construction arguments). Callers are
//! expected to fix the call site rather than recover from them.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., non-positive max HP)
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    /// Creates a validation error for invalid construction arguments.
    ///
    /// # Example
    /// ```ignore
    /// if max_hp <= 0 {
    ///     return Err(DomainError::validation("max_hp must be positive"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
