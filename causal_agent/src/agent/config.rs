//! Agent configuration.
//!
//! A plain value validated once at construction and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Which uncertainty estimator the agent uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Single network, repeated stochastic passes with dropout active.
    McDropout,
    /// Independently initialised networks, disagreement across members.
    DeepEnsemble,
}

impl EstimatorKind {
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorKind::McDropout => "mc_dropout",
            EstimatorKind::DeepEnsemble => "deep_ensemble",
        }
    }
}

impl std::str::FromStr for EstimatorKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mc_dropout" | "dropout" => Ok(EstimatorKind::McDropout),
            "deep_ensemble" | "ensemble" => Ok(EstimatorKind::DeepEnsemble),
            other => Err(AgentError::Configuration(format!(
                "unknown estimator '{}'",
                other
            ))),
        }
    }
}

/// Configuration for the causal bandit agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // ========================================================================
    // Shapes
    // ========================================================================
    /// Full context shape. The leading axis enumerates candidate contexts
    /// (rows of the intervention grid); the rest is one candidate's observation.
    pub dim_in: Vec<usize>,

    /// Estimator outputs per candidate context (columns of the grid).
    pub n_outputs: usize,

    // ========================================================================
    // Memory and Training
    // ========================================================================
    /// Experience buffer capacity.
    pub memsize: usize,

    /// Training batch size. Training is skipped until the buffer holds more.
    pub batch_size: usize,

    /// Adam learning rate.
    pub learning_rate: f64,

    /// Width of the default network's hidden layers.
    pub hidden_size: usize,

    /// Shuffle batches (seeded) instead of scanning in temporal order.
    pub shuffle: bool,

    // ========================================================================
    // Estimators
    // ========================================================================
    /// Stochastic forward passes per MC-dropout estimate.
    pub mc_samples: usize,

    /// Number of ensemble members.
    pub ensemble_size: usize,

    /// Dropout probability for the MC-dropout network.
    pub dropout_rate: f64,

    /// Ensemble members train on bootstrap resamples of each batch.
    pub bootstrap: bool,

    // ========================================================================
    // Policy
    // ========================================================================
    /// Fraction of the horizon reserved for null interventions.
    pub do_nothing: f64,

    /// Seed for weight initialization, dropout masks, batch shuffling and
    /// bootstrap resampling.
    pub seed: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dim_in: vec![10, 1, 28, 28],
            n_outputs: 10,

            memsize: 100_000,
            batch_size: 32,
            learning_rate: 1e-3,
            hidden_size: 64,
            shuffle: true,

            mc_samples: 100,
            ensemble_size: 10,
            dropout_rate: 0.5,
            bootstrap: true,

            do_nothing: 0.5,
            seed: 5000,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grid rows (candidate contexts per timestep).
    pub fn rows(&self) -> usize {
        self.dim_in.first().copied().unwrap_or(0)
    }

    /// Grid columns (outputs per candidate).
    pub fn cols(&self) -> usize {
        self.n_outputs
    }

    /// Flattened observation size of one candidate.
    pub fn features(&self) -> usize {
        self.dim_in.iter().skip(1).product()
    }

    /// Total number of candidate interventions.
    pub fn n_interventions(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Reject invalid values and combinations.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(AgentError::Configuration(msg));

        if self.dim_in.len() < 2 {
            return fail(format!(
                "dim_in needs a candidate axis and at least one feature axis, got {:?}",
                self.dim_in
            ));
        }
        if self.dim_in.contains(&0) {
            return fail(format!("dim_in has a zero-sized axis: {:?}", self.dim_in));
        }
        if self.n_outputs == 0 {
            return fail("n_outputs must be positive".into());
        }
        if self.memsize == 0 {
            return fail("memsize must be positive".into());
        }
        if self.batch_size == 0 {
            return fail("batch_size must be positive".into());
        }
        if self.mc_samples == 0 {
            return fail("mc_samples must be positive".into());
        }
        if self.ensemble_size == 0 {
            return fail("ensemble_size must be at least 1".into());
        }
        if self.hidden_size == 0 {
            return fail("hidden_size must be positive".into());
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return fail(format!(
                "dropout_rate must be in [0, 1), got {}",
                self.dropout_rate
            ));
        }
        if !(0.0..=1.0).contains(&self.do_nothing) {
            return fail(format!(
                "do_nothing must be in [0, 1], got {}",
                self.do_nothing
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return fail(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        Ok(())
    }

    // Builder methods

    pub fn with_dim_in(mut self, dim_in: Vec<usize>) -> Self {
        self.dim_in = dim_in;
        self
    }

    pub fn with_n_outputs(mut self, n_outputs: usize) -> Self {
        self.n_outputs = n_outputs;
        self
    }

    pub fn with_memsize(mut self, memsize: usize) -> Self {
        self.memsize = memsize;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_mc_samples(mut self, mc_samples: usize) -> Self {
        self.mc_samples = mc_samples;
        self
    }

    pub fn with_ensemble_size(mut self, ensemble_size: usize) -> Self {
        self.ensemble_size = ensemble_size;
        self
    }

    pub fn with_dropout_rate(mut self, dropout_rate: f64) -> Self {
        self.dropout_rate = dropout_rate;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_do_nothing(mut self, do_nothing: f64) -> Self {
        self.do_nothing = do_nothing;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> AgentConfig {
        AgentConfig::new().with_dim_in(vec![3, 4]).with_n_outputs(5)
    }

    #[test]
    fn test_default_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rows(), 10);
        assert_eq!(config.cols(), 10);
        assert_eq!(config.features(), 784);
        assert_eq!(config.n_interventions(), 100);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let invalid = [
            small().with_batch_size(0),
            small().with_ensemble_size(0),
            small().with_memsize(0),
            small().with_mc_samples(0),
            small().with_hidden_size(0),
            small().with_n_outputs(0),
            small().with_dim_in(vec![4]),
            small().with_dim_in(vec![3, 0]),
            small().with_dropout_rate(1.0),
            small().with_dropout_rate(-0.1),
            small().with_do_nothing(1.5),
            small().with_learning_rate(0.0),
            small().with_learning_rate(f64::NAN),
        ];
        for config in invalid {
            assert!(
                matches!(config.validate(), Err(AgentError::Configuration(_))),
                "accepted {:?}",
                config
            );
        }
    }

    #[test]
    fn test_single_member_ensemble_is_valid() {
        assert!(small().with_ensemble_size(1).validate().is_ok());
    }

    #[test]
    fn test_estimator_kind_from_str() {
        assert_eq!("dropout".parse::<EstimatorKind>().unwrap(), EstimatorKind::McDropout);
        assert_eq!(
            "deep_ensemble".parse::<EstimatorKind>().unwrap(),
            EstimatorKind::DeepEnsemble
        );
        assert!("bayes".parse::<EstimatorKind>().is_err());
    }
}
