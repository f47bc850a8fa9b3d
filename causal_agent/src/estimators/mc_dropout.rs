//! Monte-Carlo dropout estimator.
//!
//! # Dropout stays on at inference
//!
//! Most models switch dropout off when predicting. This one deliberately does
//! not: `predict` runs `mc_samples` forward passes with fresh dropout masks and
//! reads the spread of the outputs as epistemic uncertainty. Running the
//! passes deterministically would collapse the variance to zero and turn the
//! agent's exploration signal off.
//!
//! ```text
//! context ─┬─> pass 1 (mask 1) ─┐
//!          ├─> pass 2 (mask 2) ─┼─> mean, variance per cell
//!          └─> pass S (mask S) ─┘
//! ```
//!
//! Masks for training and prediction come from one estimator-owned `StdRng`
//! seeded with `seed + 1`; weights are drawn from `seed`. A fixed seed and a
//! fixed call sequence reproduce every estimate exactly.

use std::cell::RefCell;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::effect_net::{effect_net_optimizer, EffectNet, EffectNetConfig, EffectNetOptimizer};
use super::{
    context_tensor, ensure_data, loss_value, masked_mse, summarize_samples, training_tensors,
    UncertaintyEstimate, UncertaintyEstimator,
};
use crate::agent::config::AgentConfig;
use crate::core::{Context, TimestepBatch};
use crate::error::Result;

/// Uncertainty from repeated stochastic passes through one network.
pub struct McDropoutEstimator<B: AutodiffBackend> {
    model: EffectNet<B>,
    optimizer: EffectNetOptimizer<B>,
    masks: RefCell<StdRng>,
    dim_in: Vec<usize>,
    n_outputs: usize,
    mc_samples: usize,
    learning_rate: f64,
    device: B::Device,
}

impl<B: AutodiffBackend> McDropoutEstimator<B> {
    pub fn new(config: &AgentConfig, device: &B::Device) -> Self {
        let model = EffectNetConfig::new(config.features(), config.n_outputs)
            .with_hidden(config.hidden_size)
            .with_dropout_rate(config.dropout_rate)
            .with_seed(config.seed)
            .init(device);

        Self {
            model,
            optimizer: effect_net_optimizer(),
            masks: RefCell::new(StdRng::seed_from_u64(config.seed.wrapping_add(1))),
            dim_in: config.dim_in.clone(),
            n_outputs: config.n_outputs,
            mc_samples: config.mc_samples,
            learning_rate: config.learning_rate,
            device: device.clone(),
        }
    }

    pub fn mc_samples(&self) -> usize {
        self.mc_samples
    }

    pub fn model(&self) -> &EffectNet<B> {
        &self.model
    }
}

impl<B: AutodiffBackend> UncertaintyEstimator for McDropoutEstimator<B> {
    fn name(&self) -> &'static str {
        "mc_dropout"
    }

    fn train(&mut self, batches: &[TimestepBatch]) -> Result<Vec<f32>> {
        ensure_data(batches)?;

        let mut losses = Vec::with_capacity(batches.len());
        for batch in batches.iter().filter(|b| !b.is_empty()) {
            let tensors = training_tensors::<B>(batch, &self.dim_in, self.n_outputs, &self.device)?;

            // Standard training regime: dropout on.
            let predictions = self
                .model
                .forward_dropout(tensors.inputs.clone(), self.masks.get_mut());
            let loss = masked_mse(predictions, &tensors);
            losses.push(loss_value(&loss)?);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self
                .optimizer
                .step(self.learning_rate, self.model.clone(), grads);
        }

        Ok(losses)
    }

    fn predict(&self, context: &Context) -> Result<UncertaintyEstimate> {
        let inputs = context_tensor::<B::InnerBackend>(context, &self.dim_in, &self.device)?;
        let model = self.model.valid();
        let mut masks = self.masks.borrow_mut();

        // Dropout active on every pass. This is the estimator; do not disable it.
        let samples = (0..self.mc_samples)
            .map(|_| model.forward_dropout(inputs.clone(), &mut *masks))
            .collect();

        summarize_samples(samples, context.rows(), self.n_outputs)
    }
}
