//! Classification metrics.
use crate::error::{PermutationError, PermutationResult};
use ndarray::{Array2, ArrayBase, Data, Ix1};
use serde::{Deserialize, Serialize};

/// Evaluation statistics.
#[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    count: usize,
    correct: usize,
}

impl Stats {
    /// Counts the predictions equal to `targets`.
    ///
    /// **Errors**
    /// - The lengths are not equal.
    pub fn from_predictions<S1, S2, T>(
        predictions: &ArrayBase<S1, Ix1>,
        targets: &ArrayBase<S2, Ix1>,
    ) -> PermutationResult<Self>
    where
        S1: Data<Elem = usize>,
        S2: Data<Elem = T>,
        T: Copy + Into<usize>,
    {
        check_len(predictions.len(), targets.len())?;
        let correct = predictions
            .iter()
            .zip(targets.iter())
            .filter(|(p, t)| **p == (**t).into())
            .count();
        Ok(Self {
            count: predictions.len(),
            correct,
        })
    }
    /// The number of samples.
    pub fn count(&self) -> usize {
        self.count
    }
    /// The number of correct predictions.
    pub fn correct(&self) -> usize {
        self.correct
    }
    /// The fraction of correct predictions, or 0 without samples.
    pub fn accuracy(&self) -> f32 {
        if self.count > 0 {
            self.correct as f32 / self.count as f32
        } else {
            0.
        }
    }
}

fn check_len(a: usize, b: usize) -> PermutationResult<()> {
    if a != b {
        return Err(PermutationError::shape_mismatch(format!(
            "prediction count {a} != target count {b}"
        )));
    }
    Ok(())
}

/// The fraction of `predictions` equal to `classes`.
///
/// **Errors**
/// - The lengths are not equal.
pub fn accuracy<S1, S2, T>(
    predictions: &ArrayBase<S1, Ix1>,
    classes: &ArrayBase<S2, Ix1>,
) -> PermutationResult<f32>
where
    S1: Data<Elem = usize>,
    S2: Data<Elem = T>,
    T: Copy + Into<usize>,
{
    Stats::from_predictions(predictions, classes).map(|stats| stats.accuracy())
}

/// The fraction of positions where two sets of predictions agree.
///
/// **Errors**
/// - The lengths are not equal.
pub fn agreement<S1, S2>(a: &ArrayBase<S1, Ix1>, b: &ArrayBase<S2, Ix1>) -> PermutationResult<f32>
where
    S1: Data<Elem = usize>,
    S2: Data<Elem = usize>,
{
    accuracy(a, b)
}

/// Computes the confusion matrix, `[n_classes, n_classes]`.
///
/// Element `[t, p]` counts the samples of class `t` predicted as `p`.
///
/// **Errors**
/// - The lengths are not equal.
/// - A prediction or class is >= `n_classes`.
pub fn confusion_matrix<S1, S2, T>(
    predictions: &ArrayBase<S1, Ix1>,
    classes: &ArrayBase<S2, Ix1>,
    n_classes: usize,
) -> PermutationResult<Array2<usize>>
where
    S1: Data<Elem = usize>,
    S2: Data<Elem = T>,
    T: Copy + Into<usize>,
{
    check_len(predictions.len(), classes.len())?;
    let mut matrix = Array2::zeros([n_classes, n_classes]);
    for (&p, &t) in predictions.iter().zip(classes.iter()) {
        let t = t.into();
        if p >= n_classes || t >= n_classes {
            return Err(PermutationError::invalid_argument(format!(
                "class pair ({t}, {p}) out of range for {n_classes} classes"
            )));
        }
        matrix[[t, p]] += 1;
    }
    Ok(matrix)
}
