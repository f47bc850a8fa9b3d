//! The uncertainty-driven bandit agent and its configuration.
//!
//! - [`Agent`]: owns the experience buffer and the estimator
//! - [`AgentConfig`]: validated, read-only configuration
//! - [`CandidateGrid`]: row-major intervention index space with deterministic argmax

pub mod agent;
pub mod config;
pub mod grid;

pub use agent::{Agent, TrainOutcome};
pub use config::{AgentConfig, EstimatorKind};
pub use grid::CandidateGrid;
