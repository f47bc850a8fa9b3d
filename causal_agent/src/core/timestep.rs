//! Interaction records produced by the environment.
//!
//! - `Context`: shaped observation data a timestep carries
//! - `Timestep`: one immutable interaction (context, applied action, reward)
//! - `TimestepBatch`: a batch of timesteps handed to estimators

use crate::error::{AgentError, Result};

/// Shaped `f32` observation data.
///
/// Stored row-major. The leading axis enumerates candidate contexts (one row
/// of the intervention grid each); the remaining axes are the observation for
/// that candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Context {
    /// Create a context, checking that `data` fills `shape` exactly.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(AgentError::ShapeMismatch {
                expected: shape,
                actual: vec![data.len()],
            });
        }
        Ok(Self { shape, data })
    }

    /// Context filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of candidate rows (leading axis).
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Flattened feature count per row.
    pub fn features(&self) -> usize {
        self.shape[1..].iter().product()
    }

    /// Feature slice of one candidate row.
    pub fn row(&self, row: usize) -> &[f32] {
        let features = self.features();
        &self.data[row * features..(row + 1) * features]
    }

    /// Fail with `ShapeMismatch` unless the shape equals `expected`.
    pub fn check_shape(&self, expected: &[usize]) -> Result<()> {
        if self.shape != expected {
            return Err(AgentError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: self.shape.clone(),
            });
        }
        Ok(())
    }
}

/// One interaction with the environment.
///
/// Fields are read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestep {
    id: u64,
    context: Context,
    action: Option<usize>,
    reward: Option<f32>,
    done: bool,
}

impl Timestep {
    /// Create a timestep.
    ///
    /// `action` is the flattened intervention applied in this context, `None`
    /// for the null intervention or when nothing has been applied yet.
    pub fn new(
        id: u64,
        context: Context,
        action: Option<usize>,
        reward: Option<f32>,
        done: bool,
    ) -> Self {
        Self {
            id,
            context,
            action,
            reward,
            done,
        }
    }

    /// A fresh timestep with no action or reward yet.
    pub fn initial(id: u64, context: Context, done: bool) -> Self {
        Self::new(id, context, None, None, done)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn action(&self) -> Option<usize> {
        self.action
    }

    pub fn reward(&self) -> Option<f32> {
        self.reward
    }

    pub fn done(&self) -> bool {
        self.done
    }
}

/// A batch of timesteps for one gradient step.
#[derive(Debug, Clone, Default)]
pub struct TimestepBatch {
    timesteps: Vec<Timestep>,
}

impl TimestepBatch {
    pub fn new(timesteps: Vec<Timestep>) -> Self {
        Self { timesteps }
    }

    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    pub fn timesteps(&self) -> &[Timestep] {
        &self.timesteps
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timestep> {
        self.timesteps.iter()
    }

    /// Draw `len()` timesteps with replacement.
    pub fn resample<R: rand::Rng>(&self, rng: &mut R) -> Self {
        if self.timesteps.is_empty() {
            return Self::default();
        }
        let n = self.timesteps.len();
        let timesteps = (0..n)
            .map(|_| self.timesteps[rng.gen_range(0..n)].clone())
            .collect();
        Self { timesteps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_context_rejects_wrong_length() {
        let err = Context::new(vec![0.0; 5], vec![2, 3]).unwrap_err();
        assert!(matches!(err, AgentError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_context_rows_and_features() {
        let ctx = Context::new((0..12).map(|i| i as f32).collect(), vec![2, 2, 3]).unwrap();
        assert_eq!(ctx.rows(), 2);
        assert_eq!(ctx.features(), 6);
        assert_eq!(ctx.row(1), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_check_shape() {
        let ctx = Context::zeros(vec![2, 3]);
        assert!(ctx.check_shape(&[2, 3]).is_ok());
        assert!(ctx.check_shape(&[3, 2]).is_err());
    }

    #[test]
    fn test_resample_keeps_length() {
        let batch = TimestepBatch::new(
            (0..6)
                .map(|i| Timestep::initial(i, Context::zeros(vec![1, 1]), false))
                .collect(),
        );
        let mut rng = StdRng::seed_from_u64(7);
        let resampled = batch.resample(&mut rng);
        assert_eq!(resampled.len(), 6);
        assert!(resampled.iter().all(|t| t.id() < 6));
    }
}
