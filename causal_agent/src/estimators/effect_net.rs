//! Default function approximator behind the estimators.
//!
//! A small MLP mapping one candidate's flattened observation to one output per
//! grid column:
//!
//! ```text
//! [n, features] -> Dense -> ReLU -> dropout -> Dense -> ReLU -> dropout -> Dense -> [n, n_outputs]
//! ```
//!
//! # Randomness
//!
//! Nothing here touches the backend's global RNG. Weights are drawn from a
//! `StdRng` seeded by [`EffectNetConfig::with_seed`], and dropout masks come
//! from an RNG the caller passes to [`EffectNet::forward_dropout`]. The same
//! seeds give the same network and the same masks regardless of what else
//! the process is doing with the backend.

use burn::module::{Module, Param};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Tensor, TensorData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Adam wrapped for an [`EffectNet`].
pub type EffectNetOptimizer<B> = OptimizerAdaptor<Adam, EffectNet<B>, B>;

// ============================================================================
// Dense Layer
// ============================================================================

/// Fully connected layer with seeded uniform initialization.
///
/// Weights and bias are drawn from `U(-1/sqrt(d_input), 1/sqrt(d_input))`,
/// weights first in row-major `[d_input, d_output]` order, then the bias.
#[derive(Module, Debug)]
pub struct DenseLayer<B: Backend> {
    /// Weight matrix of shape [d_input, d_output]
    pub weight: Param<Tensor<B, 2>>,
    /// Bias of shape [d_output]
    pub bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> DenseLayer<B> {
    pub fn init<R: Rng>(d_input: usize, d_output: usize, rng: &mut R, device: &B::Device) -> Self {
        let bound = 1.0 / (d_input as f32).sqrt();
        let weight: Vec<f32> = (0..d_input * d_output)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let bias: Vec<f32> = (0..d_output).map(|_| rng.gen_range(-bound..bound)).collect();

        Self {
            weight: Param::from_tensor(Tensor::from_data(
                TensorData::new(weight, [d_input, d_output]),
                device,
            )),
            bias: Param::from_tensor(Tensor::from_data(TensorData::new(bias, [d_output]), device)),
        }
    }

    /// `input @ weight + bias` for input of shape [n, d_input].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.weight.val()) + self.bias.val().unsqueeze_dim(0)
    }
}

// ============================================================================
// EffectNet
// ============================================================================

/// Configuration for [`EffectNet`].
#[derive(Debug, Clone)]
pub struct EffectNetConfig {
    /// Flattened observation size of one candidate.
    pub d_input: usize,
    /// Hidden layer width.
    pub d_hidden: usize,
    /// Outputs per candidate.
    pub d_output: usize,
    /// Probability of dropping a hidden unit in [`EffectNet::forward_dropout`].
    pub dropout_rate: f64,
    /// Seed for weight initialization.
    pub seed: u64,
}

impl EffectNetConfig {
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_hidden: 64,
            d_output,
            dropout_rate: 0.0,
            seed: 0,
        }
    }

    pub fn with_hidden(mut self, d_hidden: usize) -> Self {
        self.d_hidden = d_hidden;
        self
    }

    pub fn with_dropout_rate(mut self, dropout_rate: f64) -> Self {
        self.dropout_rate = dropout_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Initialize the network. Same config, same weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> EffectNet<B> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        EffectNet {
            input: DenseLayer::init(self.d_input, self.d_hidden, &mut rng, device),
            hidden: DenseLayer::init(self.d_hidden, self.d_hidden, &mut rng, device),
            head: DenseLayer::init(self.d_hidden, self.d_output, &mut rng, device),
            dropout_rate: self.dropout_rate,
        }
    }
}

/// MLP with caller-controlled dropout.
#[derive(Module, Debug)]
pub struct EffectNet<B: Backend> {
    input: DenseLayer<B>,
    hidden: DenseLayer<B>,
    head: DenseLayer<B>,
    dropout_rate: f64,
}

impl<B: Backend> EffectNet<B> {
    /// Deterministic forward pass, no units dropped.
    ///
    /// # Arguments
    /// * `x` - Tensor of shape [n, d_input]
    ///
    /// # Returns
    /// Tensor of shape [n, d_output]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.input.forward(x));
        let x = relu(self.hidden.forward(x));
        self.head.forward(x)
    }

    /// Forward pass dropping hidden units with probability `dropout_rate`.
    ///
    /// Masks are drawn from `rng`, one Bernoulli draw per hidden unit in
    /// row-major order, first layer before second.
    pub fn forward_dropout<R: Rng>(&self, x: Tensor<B, 2>, rng: &mut R) -> Tensor<B, 2> {
        let x = self.dropout(relu(self.input.forward(x)), rng);
        let x = self.dropout(relu(self.hidden.forward(x)), rng);
        self.head.forward(x)
    }

    pub fn dropout_rate(&self) -> f64 {
        self.dropout_rate
    }

    /// Inverted dropout: kept units are scaled by 1 / (1 - p).
    fn dropout<R: Rng>(&self, x: Tensor<B, 2>, rng: &mut R) -> Tensor<B, 2> {
        if self.dropout_rate <= 0.0 {
            return x;
        }
        let keep = 1.0 - self.dropout_rate;
        let scale = (1.0 / keep) as f32;
        let [n, d] = x.dims();
        let mask: Vec<f32> = (0..n * d)
            .map(|_| if rng.gen_bool(keep) { scale } else { 0.0 })
            .collect();
        let mask = Tensor::from_data(TensorData::new(mask, [n, d]), &x.device());
        x * mask
    }
}

/// Create the optimizer used by every estimator.
pub fn effect_net_optimizer<B: AutodiffBackend>() -> EffectNetOptimizer<B> {
    AdamConfig::new().with_epsilon(1e-5).init()
}
