//! Error type shared by the buffer, estimators and agent.

use std::fmt;

/// Errors raised by the causal agent.
///
/// Only `ShapeMismatch`, `InvalidIntervention` and `Tensor` reach callers of
/// [`Agent`](crate::agent::Agent) at call time. `Configuration` is raised once at
/// construction. `InsufficientData` comes from estimators; the agent guards
/// against it before training.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentError {
    /// Training requested without enough buffered data.
    InsufficientData {
        /// Samples available.
        available: usize,
        /// Samples required.
        required: usize,
    },
    /// Invalid configuration value or combination.
    Configuration(String),
    /// A context whose shape disagrees with `dim_in`.
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Shape that was supplied.
        actual: Vec<usize>,
    },
    /// An observed action index outside the candidate grid.
    InvalidIntervention {
        /// Offending flattened index.
        index: usize,
        /// Number of candidate interventions.
        candidates: usize,
    },
    /// Backend tensor data could not be read back.
    Tensor(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::InsufficientData { available, required } => write!(
                f,
                "Insufficient data: {} samples available, {} required",
                available, required
            ),
            AgentError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AgentError::ShapeMismatch { expected, actual } => write!(
                f,
                "Shape mismatch: expected {:?}, got {:?}",
                expected, actual
            ),
            AgentError::InvalidIntervention { index, candidates } => write!(
                f,
                "Invalid intervention {} (grid has {} candidates)",
                index, candidates
            ),
            AgentError::Tensor(msg) => write!(f, "Tensor error: {}", msg),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<burn::tensor::DataError> for AgentError {
    fn from(e: burn::tensor::DataError) -> Self {
        AgentError::Tensor(format!("{:?}", e))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AgentError::InsufficientData { available: 4, required: 5 };
        assert_eq!(
            err.to_string(),
            "Insufficient data: 4 samples available, 5 required"
        );

        let err = AgentError::ShapeMismatch {
            expected: vec![2, 3],
            actual: vec![3, 2],
        };
        assert!(err.to_string().contains("[2, 3]"));

        let err = AgentError::Configuration("batch_size must be positive".into());
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
