//! # causal_agent: Uncertainty-Driven Intervention Selection
//!
//! A contextual-bandit agent that learns which intervention on a grid of
//! candidates pays off, exploring by picking the intervention whose predicted
//! effect is least certain.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        BanditRunner                            │
//! │                                                                │
//! │   BanditEnvironment ── step ──> previous timestep              │
//! │          ▲                            │                        │
//! │          │ noop / Cell(i)             ▼ observe                │
//! │   ┌──────┴──────────────────────────────────────────┐          │
//! │   │ Agent                                           │          │
//! │   │   ExperienceBuffer (FIFO ring, memsize)         │          │
//! │   │        │ BatchedView                            │          │
//! │   │        ▼                                        │          │
//! │   │   UncertaintyEstimator                          │          │
//! │   │     - McDropoutEstimator  (stochastic passes)   │          │
//! │   │     - DeepEnsembleEstimator (member spread)     │          │
//! │   │        │ mean + variance per grid cell          │          │
//! │   │        ▼                                        │          │
//! │   │   CandidateGrid::argmax (lowest index on ties)  │          │
//! │   └─────────────────────────────────────────────────┘          │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use causal_agent::{Agent, AgentConfig, BanditRunner, EstimatorKind};
//!
//! let config = AgentConfig::new()
//!     .with_dim_in(vec![4, 8])
//!     .with_n_outputs(4)
//!     .with_mc_samples(50);
//!
//! let mut agent = Agent::with_backend::<Autodiff<NdArray>>(
//!     config,
//!     EstimatorKind::McDropout,
//!     &Default::default(),
//! )?;
//! let summary = BanditRunner::default().run(&mut agent, &mut env, &mut logger)?;
//! ```

pub mod agent;
pub mod core;
pub mod environment;
pub mod error;
pub mod estimators;
pub mod metrics;
pub mod runners;

pub use agent::{Agent, AgentConfig, CandidateGrid, EstimatorKind, TrainOutcome};
pub use core::{BatchOrder, BatchedView, Context, ExperienceBuffer, Timestep, TimestepBatch};
pub use environment::{BanditEnvironment, Intervention, SyntheticBanditConfig, SyntheticGridBandit};
pub use error::{AgentError, Result};
pub use estimators::{
    build_estimator, DeepEnsembleEstimator, McDropoutEstimator, UncertaintyEstimate,
    UncertaintyEstimator,
};
pub use metrics::{ConsoleLogger, CsvLogger, MetricsLogger, MultiLogger, RunSnapshot};
pub use runners::{BanditRunner, RunSummary, RunnerConfig};
