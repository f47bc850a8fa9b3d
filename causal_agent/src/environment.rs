//! Environment boundary for the bandit loop.
//!
//! The agent never talks to an environment directly; the loop driver does.
//! This module defines what the driver needs from one, plus a small seeded
//! synthetic environment used by tests and the demo.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::{Context, Timestep};

/// Intervention applied to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intervention {
    /// Null intervention: observe without acting.
    Noop,
    /// Intervene on a flattened grid cell.
    Cell(usize),
}

impl Intervention {
    /// Flattened index, `None` for the null intervention.
    pub fn index(&self) -> Option<usize> {
        match self {
            Intervention::Noop => None,
            Intervention::Cell(index) => Some(*index),
        }
    }
}

/// A bandit environment stepping one timestep at a time.
pub trait BanditEnvironment {
    /// Start a new run and return its first timestep.
    fn reset(&mut self) -> Timestep;

    /// Apply `intervention` to the current timestep.
    ///
    /// Returns `(previous, next)`: the current context now carrying the
    /// applied action and its reward, and the fresh timestep to act on.
    fn step(&mut self, intervention: Intervention) -> (Timestep, Timestep);

    /// The distinguished null intervention.
    fn noop(&self) -> Intervention {
        Intervention::Noop
    }

    /// Number of timesteps in a run.
    fn horizon(&self) -> usize;

    /// Shape of every context this environment produces.
    fn context_shape(&self) -> Vec<usize>;

    /// Best achievable expected reward for `timestep`, when known.
    fn optimal_reward(&self, _timestep: &Timestep) -> Option<f32> {
        None
    }
}

// ============================================================================
// Synthetic Grid Bandit
// ============================================================================

/// Configuration for [`SyntheticGridBandit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticBanditConfig {
    /// Candidate contexts per timestep (grid rows).
    pub rows: usize,
    /// Interventions per candidate (grid columns).
    pub cols: usize,
    /// Observation size of one candidate.
    pub features: usize,
    /// Timesteps per run.
    pub horizon: usize,
    /// Amplitude of uniform reward noise.
    pub noise: f32,
    pub seed: u64,
}

impl Default for SyntheticBanditConfig {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 4,
            features: 8,
            horizon: 200,
            noise: 0.05,
            seed: 5000,
        }
    }
}

impl SyntheticBanditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_features(mut self, features: usize) -> Self {
        self.features = features;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Context shape, `[rows, features]`.
    pub fn context_shape(&self) -> Vec<usize> {
        vec![self.rows, self.features]
    }
}

/// Seeded linear bandit over a `rows x cols` grid.
///
/// Each column has hidden weights drawn once. Every step draws fresh uniform
/// contexts; intervening on `(row, col)` pays the mean of
/// `w[col][f] * context[row][f]` plus noise. The null intervention pays the
/// average over all cells.
pub struct SyntheticGridBandit {
    config: SyntheticBanditConfig,
    weights: Vec<f32>,
    rng: StdRng,
    current: Timestep,
}

impl SyntheticGridBandit {
    pub fn new(config: SyntheticBanditConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let weights = (0..config.cols * config.features)
            .map(|_| rng.gen_range(-1.0f32..1.0))
            .collect();
        let current = Timestep::initial(0, Context::zeros(config.context_shape()), false);

        Self {
            config,
            weights,
            rng,
            current,
        }
    }

    pub fn config(&self) -> &SyntheticBanditConfig {
        &self.config
    }

    /// Noise-free reward for intervening on `(row, col)` in `context`.
    pub fn expected_reward(&self, context: &Context, row: usize, col: usize) -> f32 {
        let features = self.config.features;
        let weights = &self.weights[col * features..(col + 1) * features];
        let dot: f32 = context
            .row(row)
            .iter()
            .zip(weights)
            .map(|(x, w)| x * w)
            .sum();
        dot / features as f32
    }

    /// Noise-free reward of the null intervention.
    pub fn expected_noop_reward(&self, context: &Context) -> f32 {
        let cells = self.config.rows * self.config.cols;
        let total: f32 = (0..self.config.rows)
            .flat_map(|row| (0..self.config.cols).map(move |col| (row, col)))
            .map(|(row, col)| self.expected_reward(context, row, col))
            .sum();
        total / cells as f32
    }

    fn draw_timestep(&mut self, id: u64) -> Timestep {
        let shape = self.config.context_shape();
        let len: usize = shape.iter().product();
        let data = (0..len).map(|_| self.rng.gen::<f32>()).collect();
        let context = Context::new(data, shape.clone()).unwrap_or_else(|_| Context::zeros(shape));
        Timestep::initial(id, context, id as usize >= self.config.horizon)
    }
}

impl BanditEnvironment for SyntheticGridBandit {
    fn reset(&mut self) -> Timestep {
        self.rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        self.current = self.draw_timestep(0);
        self.current.clone()
    }

    fn step(&mut self, intervention: Intervention) -> (Timestep, Timestep) {
        let context = self.current.context().clone();
        // Out-of-range cells apply, and are recorded as, the last cell.
        let cells = self.config.rows * self.config.cols;
        let action = intervention.index().map(|index| index.min(cells.saturating_sub(1)));
        let expected = match action {
            None => self.expected_noop_reward(&context),
            Some(index) => {
                let (row, col) = (index / self.config.cols, index % self.config.cols);
                self.expected_reward(&context, row, col)
            }
        };
        let noise = if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..self.config.noise)
        } else {
            0.0
        };

        let id = self.current.id();
        let previous = Timestep::new(
            id,
            context,
            action,
            Some(expected + noise),
            self.current.done(),
        );

        self.current = self.draw_timestep(id + 1);
        (previous, self.current.clone())
    }

    fn horizon(&self) -> usize {
        self.config.horizon
    }

    fn context_shape(&self) -> Vec<usize> {
        self.config.context_shape()
    }

    fn optimal_reward(&self, timestep: &Timestep) -> Option<f32> {
        let context = timestep.context();
        (0..self.config.rows)
            .flat_map(|row| (0..self.config.cols).map(move |col| (row, col)))
            .map(|(row, col)| self.expected_reward(context, row, col))
            .fold(None, |best: Option<f32>, r| Some(best.map_or(r, |b| b.max(r))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> SyntheticGridBandit {
        SyntheticGridBandit::new(
            SyntheticBanditConfig::new()
                .with_grid(2, 3)
                .with_features(4)
                .with_horizon(5)
                .with_noise(0.0),
        )
    }

    #[test]
    fn test_reset_shape_and_id() {
        let mut env = env();
        let first = env.reset();
        assert_eq!(first.id(), 0);
        assert_eq!(first.context().shape(), &[2, 4]);
        assert!(first.action().is_none());
        assert!(!first.done());
    }

    #[test]
    fn test_step_fills_previous() {
        let mut env = env();
        let first = env.reset();
        let (previous, next) = env.step(Intervention::Cell(4));

        assert_eq!(previous.id(), first.id());
        assert_eq!(previous.context(), first.context());
        assert_eq!(previous.action(), Some(4));
        let expected = env.expected_reward(first.context(), 1, 1);
        assert_eq!(previous.reward(), Some(expected));
        assert_eq!(next.id(), 1);
    }

    #[test]
    fn test_out_of_range_cell_records_applied_cell() {
        let mut env = env();
        let first = env.reset();
        let (previous, _) = env.step(Intervention::Cell(99));

        assert_eq!(previous.action(), Some(5));
        let expected = env.expected_reward(first.context(), 1, 2);
        assert_eq!(previous.reward(), Some(expected));
    }

    #[test]
    fn test_noop_records_null_action() {
        let mut env = env();
        let first = env.reset();
        let (previous, _) = env.step(env.noop());
        assert_eq!(previous.action(), None);
        assert_eq!(previous.reward(), Some(env.expected_noop_reward(first.context())));
    }

    #[test]
    fn test_done_at_horizon() {
        let mut env = env();
        let mut timestep = env.reset();
        let mut steps = 0;
        while !timestep.done() {
            let (_, next) = env.step(Intervention::Noop);
            timestep = next;
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert_eq!(timestep.id(), 5);
    }

    #[test]
    fn test_reset_is_deterministic() {
        let mut a = env();
        let mut b = env();
        assert_eq!(a.reset(), b.reset());
        assert_eq!(a.step(Intervention::Cell(1)), b.step(Intervention::Cell(1)));

        // A second reset replays the same run.
        let first = a.reset();
        assert_eq!(first, b.reset());
    }

    #[test]
    fn test_optimal_reward_dominates_cells() {
        let mut env = env();
        let timestep = env.reset();
        let best = env.optimal_reward(&timestep).unwrap();
        for row in 0..2 {
            for col in 0..3 {
                assert!(env.expected_reward(timestep.context(), row, col) <= best);
            }
        }
        assert!(env.expected_noop_reward(timestep.context()) <= best);
    }
}
