//! Deep ensemble estimator.
//!
//! Uncertainty is the disagreement between independently initialised members.
//! With `bootstrap` on, every member trains on its own with-replacement
//! resample of each batch, which adds data diversity on top of the different
//! initialisations. Members carry no dropout and predict deterministically.
//!
//! A single-member ensemble has nothing to disagree with: its uncertainty is
//! zero everywhere.

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

/// One ensemble member with its own optimizer state.
struct Member<B: AutodiffBackend> {
    model: EffectNet<B>,
    optimizer: EffectNetOptimizer<B>,
}

/// Uncertainty from disagreement across independently trained networks.
pub struct DeepEnsembleEstimator<B: AutodiffBackend> {
    members: Vec<Member<B>>,
    dim_in: Vec<usize>,
    n_outputs: usize,
    learning_rate: f64,
    bootstrap: bool,
    rng: StdRng,
    device: B::Device,
}

impl<B: AutodiffBackend> DeepEnsembleEstimator<B> {
    pub fn new(config: &AgentConfig, device: &B::Device) -> Self {
        let net_config = EffectNetConfig::new(config.features(), config.n_outputs)
            .with_hidden(config.hidden_size);

        // Member i draws its weights from seed + 1 + i.
        let members = (0..config.ensemble_size as u64)
            .map(|i| Member {
                model: net_config
                    .clone()
                    .with_seed(config.seed.wrapping_add(1 + i))
                    .init(device),
                optimizer: effect_net_optimizer(),
            })
            .collect();

        Self {
            members,
            dim_in: config.dim_in.clone(),
            n_outputs: config.n_outputs,
            learning_rate: config.learning_rate,
            bootstrap: config.bootstrap,
            rng: StdRng::seed_from_u64(config.seed),
            device: device.clone(),
        }
    }

    pub fn ensemble_size(&self) -> usize {
        self.members.len()
    }
}

impl<B: AutodiffBackend> UncertaintyEstimator for DeepEnsembleEstimator<B> {
    fn name(&self) -> &'static str {
        "deep_ensemble"
    }

    /// Every member takes one step per batch; the reported loss is the
    /// member average.
    fn train(&mut self, batches: &[TimestepBatch]) -> Result<Vec<f32>> {
        ensure_data(batches)?;

        let mut losses = Vec::with_capacity(batches.len());
        for batch in batches.iter().filter(|b| !b.is_empty()) {
            let mut batch_loss = 0.0;

            for member in &mut self.members {
                let member_batch = if self.bootstrap {
                    batch.resample(&mut self.rng)
                } else {
                    batch.clone()
                };
                let tensors =
                    training_tensors::<B>(&member_batch, &self.dim_in, self.n_outputs, &self.device)?;

                let predictions = member.model.forward(tensors.inputs.clone());
                let loss = masked_mse(predictions, &tensors);
                batch_loss += loss_value(&loss)?;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &member.model);
                member.model = member
                    .optimizer
                    .step(self.learning_rate, member.model.clone(), grads);
            }

            losses.push(batch_loss / self.members.len() as f32);
        }

        Ok(losses)
    }

    fn predict(&self, context: &Context) -> Result<UncertaintyEstimate> {
        let inputs = context_tensor::<B::InnerBackend>(context, &self.dim_in, &self.device)?;

        let samples = self
            .members
            .iter()
            .map(|member| member.model.valid().forward(inputs.clone()))
            .collect();

        summarize_samples(samples, context.rows(), self.n_outputs)
    }
}
