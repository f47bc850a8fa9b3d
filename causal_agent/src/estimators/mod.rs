//! Epistemic uncertainty estimators.
//!
//! Both variants share one contract so the agent can swap them freely:
//!
//! - [`McDropoutEstimator`]: one network, `mc_samples` stochastic passes with
//!   dropout kept active at inference
//! - [`DeepEnsembleEstimator`]: `ensemble_size` independently initialised
//!   networks, one deterministic pass each
//!
//! Either way `predict` returns one mean and one non-negative variance per
//! grid cell (`rows x n_outputs`, row-major).

pub mod effect_net;
pub mod ensemble;
pub mod mc_dropout;

use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};

use crate::agent::config::{AgentConfig, EstimatorKind};
use crate::core::{Context, TimestepBatch};
use crate::error::{AgentError, Result};

pub use effect_net::{EffectNet, EffectNetConfig, EffectNetOptimizer};
pub use ensemble::DeepEnsembleEstimator;
pub use mc_dropout::McDropoutEstimator;

// ============================================================================
// Estimate
// ============================================================================

/// Per-cell mean and uncertainty from one `predict` call.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertaintyEstimate {
    rows: usize,
    cols: usize,
    mean: Vec<f32>,
    uncertainty: Vec<f32>,
}

impl UncertaintyEstimate {
    /// Build an estimate from row-major grids.
    ///
    /// Fails with `ShapeMismatch` unless both grids hold `rows * cols` values.
    /// Negative uncertainty is clamped to zero.
    pub fn new(rows: usize, cols: usize, mean: Vec<f32>, uncertainty: Vec<f32>) -> Result<Self> {
        let expected = rows * cols;
        if mean.len() != expected || uncertainty.len() != expected {
            return Err(AgentError::ShapeMismatch {
                expected: vec![rows, cols],
                actual: vec![mean.len(), uncertainty.len()],
            });
        }
        let uncertainty = uncertainty.into_iter().map(|u| u.max(0.0)).collect();
        Ok(Self {
            rows,
            cols,
            mean,
            uncertainty,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major per-cell means.
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Row-major per-cell uncertainty (variance), all >= 0.
    pub fn uncertainty(&self) -> &[f32] {
        &self.uncertainty
    }

    pub fn mean_at(&self, row: usize, col: usize) -> f32 {
        self.mean[col + self.cols * row]
    }

    pub fn uncertainty_at(&self, row: usize, col: usize) -> f32 {
        self.uncertainty[col + self.cols * row]
    }

    /// Largest uncertainty in the grid.
    pub fn max_uncertainty(&self) -> f32 {
        self.uncertainty.iter().copied().fold(0.0, f32::max)
    }
}

// ============================================================================
// Estimator Trait
// ============================================================================

/// Capability shared by every uncertainty estimator.
pub trait UncertaintyEstimator {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// One gradient step per batch.
    ///
    /// Returns the per-batch losses. Fails with `InsufficientData` when no
    /// batch holds any timestep.
    fn train(&mut self, batches: &[TimestepBatch]) -> Result<Vec<f32>>;

    /// Mean and uncertainty for every cell of the grid spanned by `context`.
    ///
    /// Never mutates training state. Stochastic variants may return different
    /// values on repeated calls.
    fn predict(&self, context: &Context) -> Result<UncertaintyEstimate>;
}

impl<E: UncertaintyEstimator + ?Sized> UncertaintyEstimator for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn train(&mut self, batches: &[TimestepBatch]) -> Result<Vec<f32>> {
        (**self).train(batches)
    }

    fn predict(&self, context: &Context) -> Result<UncertaintyEstimate> {
        (**self).predict(context)
    }
}

/// Build the estimator selected by `kind`.
pub fn build_estimator<B: AutodiffBackend>(
    kind: EstimatorKind,
    config: &AgentConfig,
    device: &B::Device,
) -> Box<dyn UncertaintyEstimator> {
    match kind {
        EstimatorKind::McDropout => Box::new(McDropoutEstimator::<B>::new(config, device)),
        EstimatorKind::DeepEnsemble => Box::new(DeepEnsembleEstimator::<B>::new(config, device)),
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Tensors for one masked regression step.
///
/// - `inputs`: [n * rows, features], one line per candidate context
/// - `targets`: [n, rows * cols], the observed reward broadcast over the grid
/// - `mask`: [n, rows * cols], which cells the reward supervises
pub(crate) struct TrainingTensors<B: Backend> {
    pub inputs: Tensor<B, 2>,
    pub targets: Tensor<B, 2>,
    pub mask: Tensor<B, 2>,
    pub n: usize,
}

/// Convert a batch into training tensors.
///
/// Supervision per timestep:
/// - `action = Some(i)`: only cell `i` regresses to the reward
/// - `action = None` (null intervention): every cell regresses to the reward
/// - `reward = None`: nothing is supervised
pub(crate) fn training_tensors<B: Backend>(
    batch: &TimestepBatch,
    dim_in: &[usize],
    cols: usize,
    device: &B::Device,
) -> Result<TrainingTensors<B>> {
    let n = batch.len();
    let rows = dim_in[0];
    let features: usize = dim_in[1..].iter().product();
    let cells = rows * cols;

    let mut inputs = Vec::with_capacity(n * rows * features);
    let mut targets = Vec::with_capacity(n * cells);
    let mut mask = Vec::with_capacity(n * cells);

    for timestep in batch.iter() {
        let context = timestep.context();
        context.check_shape(dim_in)?;
        inputs.extend_from_slice(context.data());

        let reward = timestep.reward();
        targets.extend(std::iter::repeat(reward.unwrap_or(0.0)).take(cells));

        match (timestep.action(), reward) {
            (_, None) => mask.extend(std::iter::repeat(0.0).take(cells)),
            (None, Some(_)) => mask.extend(std::iter::repeat(1.0).take(cells)),
            (Some(action), Some(_)) => {
                if action >= cells {
                    return Err(AgentError::InvalidIntervention {
                        index: action,
                        candidates: cells,
                    });
                }
                mask.extend((0..cells).map(|cell| if cell == action { 1.0 } else { 0.0 }));
            }
        }
    }

    Ok(TrainingTensors {
        inputs: Tensor::from_data(TensorData::new(inputs, [n * rows, features]), device),
        targets: Tensor::from_data(TensorData::new(targets, [n, cells]), device),
        mask: Tensor::from_data(TensorData::new(mask, [n, cells]), device),
        n,
    })
}

/// Masked mean squared error between `[n * rows, cols]` predictions and the targets.
pub(crate) fn masked_mse<B: Backend>(
    predictions: Tensor<B, 2>,
    tensors: &TrainingTensors<B>,
) -> Tensor<B, 1> {
    let [_, cells] = tensors.targets.dims();
    let predictions = predictions.reshape([tensors.n, cells]);

    let diff = predictions - tensors.targets.clone();
    let squared = diff.clone() * diff * tensors.mask.clone();
    let supervised = tensors.mask.clone().sum().clamp_min(1.0);
    squared.sum() / supervised
}

/// Candidate contexts as a `[rows, features]` tensor.
pub(crate) fn context_tensor<B: Backend>(
    context: &Context,
    dim_in: &[usize],
    device: &B::Device,
) -> Result<Tensor<B, 2>> {
    context.check_shape(dim_in)?;
    Ok(Tensor::from_data(
        TensorData::new(context.data().to_vec(), [context.rows(), context.features()]),
        device,
    ))
}

/// Mean and population variance across `[rows, cols]` samples.
pub(crate) fn summarize_samples<B: Backend>(
    samples: Vec<Tensor<B, 2>>,
    rows: usize,
    cols: usize,
) -> Result<UncertaintyEstimate> {
    let cells = rows * cols;
    let samples: Vec<Tensor<B, 2>> = samples
        .into_iter()
        .map(|sample| sample.reshape([1, cells]))
        .collect();
    let stacked = Tensor::cat(samples, 0);

    let mean = stacked.clone().mean_dim(0);
    let deviation = stacked - mean.clone();
    let variance = (deviation.clone() * deviation).mean_dim(0).clamp_min(0.0);

    let mean = mean.into_data().to_vec::<f32>()?;
    let variance = variance.into_data().to_vec::<f32>()?;
    UncertaintyEstimate::new(rows, cols, mean, variance)
}

/// Read a scalar loss back to the host.
pub(crate) fn loss_value<B: Backend>(loss: &Tensor<B, 1>) -> Result<f32> {
    let values = loss.clone().into_data().to_vec::<f32>()?;
    values
        .first()
        .copied()
        .ok_or_else(|| AgentError::Tensor("empty loss tensor".into()))
}

/// `InsufficientData` unless some batch holds a timestep.
pub(crate) fn ensure_data(batches: &[TimestepBatch]) -> Result<()> {
    let available: usize = batches.iter().map(|b| b.len()).sum();
    if available == 0 {
        return Err(AgentError::InsufficientData {
            available,
            required: 1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
