//! Tests for the uncertainty estimators.
//!
//! These tests verify:
//! - Estimate construction and clamping
//! - Training tensor layout and masking
//! - Non-negative uncertainty for both variants
//! - Zero uncertainty for a single-member ensemble
//! - Training errors and parameter updates
//! - Seeded dropout masks
//! - Property-based: uncertainty is non-negative for arbitrary contexts

use super::*;
use burn::backend::{Autodiff, NdArray};

use crate::core::Timestep;

type B = Autodiff<NdArray<f32>>;

// ============================================================================
// Helpers
// ============================================================================

fn config() -> AgentConfig {
    AgentConfig::new()
        .with_dim_in(vec![3, 4])
        .with_n_outputs(2)
        .with_hidden_size(16)
        .with_mc_samples(8)
        .with_ensemble_size(3)
        .with_batch_size(4)
        .with_learning_rate(1e-2)
        .with_seed(17)
}

fn context(seed: f32) -> Context {
    let data = (0..12).map(|i| ((i as f32) * 0.37 + seed).sin()).collect();
    Context::new(data, vec![3, 4]).unwrap()
}

fn timestep(id: u64, action: Option<usize>, reward: Option<f32>) -> Timestep {
    Timestep::new(id, context(id as f32), action, reward, false)
}

fn batch(n: u64) -> TimestepBatch {
    TimestepBatch::new(
        (0..n)
            .map(|id| timestep(id, Some((id as usize) % 6), Some(1.0 + id as f32)))
            .collect(),
    )
}

// ============================================================================
// UncertaintyEstimate
// ============================================================================

#[test]
fn test_estimate_rejects_wrong_lengths() {
    let err = UncertaintyEstimate::new(2, 2, vec![0.0; 4], vec![0.0; 3]).unwrap_err();
    assert!(matches!(err, AgentError::ShapeMismatch { .. }));
}

#[test]
fn test_estimate_clamps_negative_uncertainty() {
    let estimate = UncertaintyEstimate::new(1, 3, vec![0.0; 3], vec![-1e-7, 0.5, 0.0]).unwrap();
    assert_eq!(estimate.uncertainty(), &[0.0, 0.5, 0.0]);
    assert_eq!(estimate.max_uncertainty(), 0.5);
}

#[test]
fn test_estimate_row_major_accessors() {
    let estimate =
        UncertaintyEstimate::new(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], vec![0.0; 6]).unwrap();
    assert_eq!(estimate.mean_at(1, 0), 3.0);
    assert_eq!(estimate.mean_at(0, 2), 2.0);
}

// ============================================================================
// Training Tensors
// ============================================================================

#[test]
fn test_training_tensor_masks() {
    let device = Default::default();
    let batch = TimestepBatch::new(vec![
        timestep(0, Some(4), Some(2.0)),
        timestep(1, None, Some(-1.0)),
        timestep(2, Some(1), None),
    ]);

    let tensors = training_tensors::<NdArray<f32>>(&batch, &[3, 4], 2, &device).unwrap();
    assert_eq!(tensors.inputs.dims(), [9, 4]);
    assert_eq!(tensors.targets.dims(), [3, 6]);

    let mask = tensors.mask.into_data().to_vec::<f32>().unwrap();
    assert_eq!(&mask[0..6], &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    assert_eq!(&mask[6..12], &[1.0; 6]);
    assert_eq!(&mask[12..18], &[0.0; 6]);

    let targets = tensors.targets.into_data().to_vec::<f32>().unwrap();
    assert_eq!(targets[4], 2.0);
    assert_eq!(targets[6], -1.0);
}

#[test]
fn test_training_tensors_reject_out_of_grid_action() {
    let device = Default::default();
    let batch = TimestepBatch::new(vec![timestep(0, Some(6), Some(1.0))]);

    let result = training_tensors::<NdArray<f32>>(&batch, &[3, 4], 2, &device);
    assert!(matches!(
        result,
        Err(AgentError::InvalidIntervention { index: 6, candidates: 6 })
    ));
}

#[test]
fn test_training_tensors_reject_wrong_shape() {
    let device = Default::default();
    let bad = Timestep::new(0, Context::zeros(vec![4, 3]), Some(0), Some(1.0), false);
    let batch = TimestepBatch::new(vec![bad]);

    let result = training_tensors::<NdArray<f32>>(&batch, &[3, 4], 2, &device);
    assert!(matches!(result, Err(AgentError::ShapeMismatch { .. })));
}

#[test]
fn test_masked_mse_ignores_unsupervised_cells() {
    let device = Default::default();
    let batch = TimestepBatch::new(vec![timestep(0, Some(0), Some(1.0))]);
    let tensors = training_tensors::<NdArray<f32>>(&batch, &[3, 4], 2, &device).unwrap();

    // Only cell 0 is supervised; predicting 3.0 there gives (3 - 1)^2 = 4.
    let mut values = vec![100.0f32; 6];
    values[0] = 3.0;
    let predictions = Tensor::from_data(TensorData::new(values, [3, 2]), &device);

    let loss = loss_value(&masked_mse(predictions, &tensors)).unwrap();
    assert!((loss - 4.0).abs() < 1e-5);
}

#[test]
fn test_summarize_population_variance() {
    let device = Default::default();
    let a = Tensor::<NdArray<f32>, 2>::from_data(TensorData::new(vec![1.0, 2.0], [1, 2]), &device);
    let b = Tensor::<NdArray<f32>, 2>::from_data(TensorData::new(vec![3.0, 2.0], [1, 2]), &device);

    let estimate = summarize_samples(vec![a, b], 1, 2).unwrap();
    assert_eq!(estimate.mean(), &[2.0, 2.0]);
    assert_eq!(estimate.uncertainty(), &[1.0, 0.0]);
}

// ============================================================================
// MC Dropout
// ============================================================================

#[test]
fn test_mc_dropout_shape_and_non_negative() {
    let device = Default::default();
    let estimator = McDropoutEstimator::<B>::new(&config(), &device);

    for seed in 0..5 {
        let estimate = estimator.predict(&context(seed as f32)).unwrap();
        assert_eq!(estimate.rows(), 3);
        assert_eq!(estimate.cols(), 2);
        assert_eq!(estimate.uncertainty().len(), 6);
        assert!(estimate.uncertainty().iter().all(|&u| u >= 0.0));
    }
}

#[test]
fn test_mc_dropout_has_spread_at_inference() {
    let device = Default::default();
    let estimator =
        McDropoutEstimator::<B>::new(&config().with_mc_samples(32).with_dropout_rate(0.5), &device);

    let estimate = estimator.predict(&context(0.3)).unwrap();
    assert!(estimate.max_uncertainty() > 0.0);
}

#[test]
fn test_mc_dropout_zero_rate_has_no_spread() {
    let device = Default::default();
    let estimator = McDropoutEstimator::<B>::new(&config().with_dropout_rate(0.0), &device);

    let estimate = estimator.predict(&context(0.3)).unwrap();
    assert!(estimate.uncertainty().iter().all(|&u| u.abs() < 1e-10));
}

#[test]
fn test_mc_dropout_train_returns_loss_per_batch() {
    let device = Default::default();
    let mut estimator = McDropoutEstimator::<B>::new(&config(), &device);

    let losses = estimator.train(&[batch(4), batch(3)]).unwrap();
    assert_eq!(losses.len(), 2);
    assert!(losses.iter().all(|l| l.is_finite() && *l >= 0.0));
}

#[test]
fn test_mc_dropout_training_updates_parameters() {
    let device = Default::default();
    let mut estimator = McDropoutEstimator::<B>::new(&config(), &device);
    let inputs = context_tensor::<B>(&context(0.0), &[3, 4], &device).unwrap();

    let deterministic = |estimator: &McDropoutEstimator<B>| {
        estimator
            .model()
            .forward(inputs.clone())
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    };

    let before = deterministic(&estimator);
    let losses = estimator.train(&[batch(5)]).unwrap();
    let after = deterministic(&estimator);

    assert_eq!(losses.len(), 1);
    assert_ne!(before, after);
}

#[test]
fn test_mc_dropout_same_seed_same_estimate() {
    let device = Default::default();
    let a = McDropoutEstimator::<B>::new(&config(), &device);
    let b = McDropoutEstimator::<B>::new(&config(), &device);

    // Same seed, same call sequence: identical masks.
    assert_eq!(a.predict(&context(0.2)).unwrap(), b.predict(&context(0.2)).unwrap());
    assert_eq!(a.predict(&context(0.9)).unwrap(), b.predict(&context(0.9)).unwrap());
}

#[test]
fn test_mc_dropout_rejects_empty_training() {
    let device = Default::default();
    let mut estimator = McDropoutEstimator::<B>::new(&config(), &device);

    assert!(matches!(
        estimator.train(&[]),
        Err(AgentError::InsufficientData { available: 0, .. })
    ));
    assert!(matches!(
        estimator.train(&[TimestepBatch::default()]),
        Err(AgentError::InsufficientData { .. })
    ));
}

#[test]
fn test_predict_rejects_wrong_shape() {
    let device = Default::default();
    let estimator = McDropoutEstimator::<B>::new(&config(), &device);

    let result = estimator.predict(&Context::zeros(vec![2, 4]));
    assert!(matches!(result, Err(AgentError::ShapeMismatch { .. })));
}

// ============================================================================
// Deep Ensemble
// ============================================================================

#[test]
fn test_ensemble_shape_and_non_negative() {
    let device = Default::default();
    let mut estimator = DeepEnsembleEstimator::<B>::new(&config(), &device);
    estimator.train(&[batch(4)]).unwrap();

    for seed in 0..5 {
        let estimate = estimator.predict(&context(seed as f32)).unwrap();
        assert_eq!(estimate.mean().len(), 6);
        assert!(estimate.uncertainty().iter().all(|&u| u >= 0.0));
    }
}

#[test]
fn test_single_member_ensemble_has_zero_uncertainty() {
    let device = Default::default();
    let mut estimator = DeepEnsembleEstimator::<B>::new(&config().with_ensemble_size(1), &device);

    for seed in 0..3 {
        let estimate = estimator.predict(&context(seed as f32)).unwrap();
        assert!(estimate.uncertainty().iter().all(|&u| u == 0.0));
    }

    estimator.train(&[batch(4), batch(4)]).unwrap();
    let estimate = estimator.predict(&context(1.5)).unwrap();
    assert!(estimate.uncertainty().iter().all(|&u| u == 0.0));
}

#[test]
fn test_ensemble_predict_is_deterministic() {
    let device = Default::default();
    let estimator = DeepEnsembleEstimator::<B>::new(&config(), &device);

    let a = estimator.predict(&context(0.7)).unwrap();
    let b = estimator.predict(&context(0.7)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_ensemble_training_updates_parameters() {
    let device = Default::default();
    let mut estimator =
        DeepEnsembleEstimator::<B>::new(&config().with_ensemble_size(2).with_bootstrap(false), &device);

    let before = estimator.predict(&context(0.0)).unwrap();
    let losses = estimator.train(&[batch(4)]).unwrap();
    let after = estimator.predict(&context(0.0)).unwrap();

    assert_eq!(losses.len(), 1);
    assert_ne!(before.mean(), after.mean());
}

#[test]
fn test_build_estimator_selects_variant() {
    let device = Default::default();
    let dropout = build_estimator::<B>(EstimatorKind::McDropout, &config(), &device);
    let ensemble = build_estimator::<B>(EstimatorKind::DeepEnsemble, &config(), &device);

    assert_eq!(dropout.name(), "mc_dropout");
    assert_eq!(ensemble.name(), "deep_ensemble");

    let a = dropout.predict(&context(0.1)).unwrap();
    let b = ensemble.predict(&context(0.1)).unwrap();
    assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
}

// ============================================================================
// Property-Based Tests with Proptest
// ============================================================================

mod proptest_uncertainty {
    use super::*;
    use proptest::prelude::*;

    fn context_values() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-10.0f32..10.0, 12)
    }

    /// A correctly shaped batch with arbitrary contexts, actions and rewards.
    fn any_batch() -> impl Strategy<Value = TimestepBatch> {
        prop::collection::vec(
            (context_values(), prop::option::of(0usize..6), prop::option::of(-5.0f32..5.0)),
            1..6,
        )
        .prop_map(|rows| {
            TimestepBatch::new(
                rows.into_iter()
                    .enumerate()
                    .map(|(id, (values, action, reward))| {
                        let context = Context::new(values, vec![3, 4]).unwrap();
                        Timestep::new(id as u64, context, action, reward, false)
                    })
                    .collect(),
            )
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: MC-dropout uncertainty is non-negative everywhere.
        #[test]
        fn test_mc_dropout_uncertainty_non_negative(
            values in context_values(),
            batch in any_batch(),
            seed in any::<u64>(),
        ) {
            let device = Default::default();
            let mut estimator = McDropoutEstimator::<B>::new(&config().with_seed(seed), &device);
            estimator.train(&[batch]).unwrap();

            let estimate = estimator.predict(&Context::new(values, vec![3, 4]).unwrap()).unwrap();
            prop_assert_eq!(estimate.uncertainty().len(), 6);
            prop_assert!(estimate.uncertainty().iter().all(|&u| u >= 0.0));
        }

        /// Property: ensemble uncertainty is non-negative everywhere.
        #[test]
        fn test_ensemble_uncertainty_non_negative(
            values in context_values(),
            batch in any_batch(),
            seed in any::<u64>(),
        ) {
            let device = Default::default();
            let mut estimator = DeepEnsembleEstimator::<B>::new(&config().with_seed(seed), &device);
            estimator.train(&[batch]).unwrap();

            let estimate = estimator.predict(&Context::new(values, vec![3, 4]).unwrap()).unwrap();
            prop_assert_eq!(estimate.uncertainty().len(), 6);
            prop_assert!(estimate.uncertainty().iter().all(|&u| u >= 0.0));
        }
    }
}
