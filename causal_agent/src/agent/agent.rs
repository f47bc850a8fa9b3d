//! Uncertainty-driven bandit agent.
//!
//! The agent reacts to three calls from the loop driver:
//!
//! ```text
//! environment ──> observe ──> ExperienceBuffer
//!                                  │
//!                  train  <────────┘ (BatchedView -> estimator.train)
//!                    │
//!                  act    ──> estimator.predict ──> argmax(uncertainty) ──> environment
//! ```
//!
//! Forced exploration (the null intervention for the first part of the
//! horizon) belongs to the driver; see [`BanditRunner`](crate::runners::BanditRunner).

use burn::tensor::backend::AutodiffBackend;

use super::config::{AgentConfig, EstimatorKind};
use super::grid::CandidateGrid;
use crate::core::{BatchOrder, Context, ExperienceBuffer, Timestep};
use crate::estimators::{build_estimator, UncertaintyEstimate, UncertaintyEstimator};
use crate::error::{AgentError, Result};

/// Result of a [`Agent::train`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainOutcome {
    /// Not enough buffered timesteps; nothing was updated.
    Skipped {
        /// Timesteps in the buffer.
        buffered: usize,
        /// Timesteps needed before training runs.
        required: usize,
    },
    /// Training ran; per-epoch, per-batch losses.
    Trained { epoch_losses: Vec<Vec<f32>> },
}

impl TrainOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, TrainOutcome::Skipped { .. })
    }

    /// Number of estimator updates (batches) performed.
    pub fn updates(&self) -> usize {
        match self {
            TrainOutcome::Skipped { .. } => 0,
            TrainOutcome::Trained { epoch_losses } => epoch_losses.iter().map(Vec::len).sum(),
        }
    }

    /// Mean loss over every batch, if training ran.
    pub fn mean_loss(&self) -> Option<f32> {
        match self {
            TrainOutcome::Skipped { .. } => None,
            TrainOutcome::Trained { epoch_losses } => mean(epoch_losses.iter().flatten().copied()),
        }
    }
}

/// Bandit agent choosing interventions by epistemic uncertainty.
pub struct Agent<E: UncertaintyEstimator = Box<dyn UncertaintyEstimator>> {
    config: AgentConfig,
    memory: ExperienceBuffer,
    estimator: E,
    grid: CandidateGrid,
    train_calls: u64,
}

impl Agent {
    /// Build an agent with the estimator selected by `kind` on backend `B`.
    ///
    /// Estimators seed their own RNGs from `config.seed`; the backend's global
    /// RNG is never used.
    pub fn with_backend<B: AutodiffBackend>(
        config: AgentConfig,
        kind: EstimatorKind,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;

        log::debug!(
            "building {} agent: grid {}x{}, memsize {}, batch_size {}",
            kind.name(),
            config.rows(),
            config.cols(),
            config.memsize,
            config.batch_size
        );

        let estimator = build_estimator::<B>(kind, &config, device);
        Agent::new(config, estimator)
    }
}

impl<E: UncertaintyEstimator> Agent<E> {
    /// Create an agent around an existing estimator.
    ///
    /// Fails with `Configuration` if the config is invalid.
    pub fn new(config: AgentConfig, estimator: E) -> Result<Self> {
        config.validate()?;
        let grid = CandidateGrid::new(config.rows(), config.cols());

        Ok(Self {
            memory: ExperienceBuffer::new(config.memsize),
            estimator,
            grid,
            config,
            train_calls: 0,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn memory(&self) -> &ExperienceBuffer {
        &self.memory
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn grid(&self) -> CandidateGrid {
        self.grid
    }

    /// Record a timestep.
    ///
    /// Fails fast on a context of the wrong shape or an action outside the grid.
    pub fn observe(&mut self, timestep: Timestep) -> Result<()> {
        timestep.context().check_shape(&self.config.dim_in)?;
        if let Some(action) = timestep.action() {
            if !self.grid.contains(action) {
                return Err(AgentError::InvalidIntervention {
                    index: action,
                    candidates: self.grid.len(),
                });
            }
        }
        self.memory.append(timestep);
        Ok(())
    }

    /// Train the estimator for `epochs` passes over the buffer.
    ///
    /// Refuses to train until the buffer holds more than `batch_size`
    /// timesteps. Losses are reported, never acted on.
    pub fn train(&mut self, epochs: usize) -> Result<TrainOutcome> {
        let buffered = self.memory.len();
        if buffered <= self.config.batch_size {
            log::info!(
                "agent not training, not enough data ({} buffered, need more than {})",
                buffered,
                self.config.batch_size
            );
            return Ok(TrainOutcome::Skipped {
                buffered,
                required: self.config.batch_size + 1,
            });
        }

        let mut epoch_losses = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let order = if self.config.shuffle {
                BatchOrder::Shuffled {
                    seed: self.config.seed.wrapping_add(self.train_calls),
                }
            } else {
                BatchOrder::Sequential
            };
            self.train_calls += 1;

            log::info!("[{}] starting training ...", epoch);
            let batches = self
                .memory
                .as_batches(self.config.batch_size, order)
                .collect_batches();
            let losses = self.estimator.train(&batches)?;

            match mean(losses.iter().copied()) {
                Some(loss) => log::info!(
                    "[{}] training finished, {} batches, mean loss {:.5}",
                    epoch,
                    losses.len(),
                    loss
                ),
                None => log::info!("[{}] training finished", epoch),
            }
            log::debug!("[{}] {} loss trace: {:?}", epoch, self.estimator.name(), losses);

            epoch_losses.push(losses);
        }

        Ok(TrainOutcome::Trained { epoch_losses })
    }

    /// Mean and uncertainty for every candidate of `context`.
    ///
    /// Fails with `ShapeMismatch` if the estimator answers for a grid other
    /// than the agent's.
    pub fn predict(&self, context: &Context) -> Result<UncertaintyEstimate> {
        context.check_shape(&self.config.dim_in)?;
        let estimate = self.estimator.predict(context)?;
        if estimate.rows() != self.grid.rows() || estimate.cols() != self.grid.cols() {
            return Err(AgentError::ShapeMismatch {
                expected: vec![self.grid.rows(), self.grid.cols()],
                actual: vec![estimate.rows(), estimate.cols()],
            });
        }
        Ok(estimate)
    }

    /// Exploratory action: the intervention with the highest uncertainty.
    pub fn act(&self, timestep: &Timestep) -> Result<usize> {
        let estimate = self.predict(timestep.context())?;
        Ok(self.grid.argmax_index(estimate.uncertainty()))
    }

    /// Greedy action: the intervention with the highest predicted mean.
    pub fn best_action(&self, context: &Context) -> Result<usize> {
        let estimate = self.predict(context)?;
        Ok(self.grid.argmax_index(estimate.mean()))
    }
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, count) = values.fold((0.0f32, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f32)
}
