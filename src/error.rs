//! Fatal error types for the public API
//!
//! Only structural defects in the input graph and configuration problems
//! are surfaced as `Err` values. Unsatisfiable constraint sets, solver
//! timeouts, and below-threshold quality are all carried inside result
//! values (`LayoutSolution`, `QualityScore`) so callers can recover.

use thiserror::Error;

/// Malformed input graph. Rejected immediately, never silently repaired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// A node with this id already exists
    #[error("duplicate node id '{id}'")]
    DuplicateId { id: String },

    /// An edge endpoint names a node that does not exist
    #[error("edge {kind} references unknown node '{id}'")]
    UnknownNode { id: String, kind: String },

    /// A constraint participant names a node that does not exist
    #[error("constraint '{constraint}' references unknown node '{id}'")]
    UnknownConstraintNode { id: String, constraint: String },
}

impl StructuralError {
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    pub fn unknown_node(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnknownNode {
            id: id.into(),
            kind: kind.into(),
        }
    }

    pub fn unknown_constraint_node(id: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::UnknownConstraintNode {
            id: id.into(),
            constraint: constraint.into(),
        }
    }
}

/// Invalid engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
