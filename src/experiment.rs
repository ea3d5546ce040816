//! The permutation experiment.
//!
//! For each swap count, a permutation is generated from a seeded rng and applied to the inputs. The network is evaluated on the permuted inputs as is, and again after [realigning](TwoLayerDense::realign_first_layer()) its first layer. The realigned network makes the same predictions on the permuted inputs as the original network on the original inputs.
use crate::{
    image::permute_features,
    metrics::{agreement, Stats},
    network::{predict_classes, TwoLayerDense},
    permutation::generate_permutation,
    result::Result,
};
use anyhow::{ensure, Context};
use ndarray::{s, ArrayBase, Data, Ix1, Ix2};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Instant};

/// Experiment configuration.
///
/// Missing fields take their default values.
///
/// ```json
/// {
///   "seed": 0,
///   "swap_counts": [0, 10, 100, 1000, 10000],
///   "hidden": 128,
///   "test_samples": 1000
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Seeds the permutation of each trial.
    pub seed: u64,
    /// The number of random swaps of each trial.
    pub swap_counts: Vec<usize>,
    /// Width of the hidden layer of a network initialized for the experiment.
    pub hidden: usize,
    /// Limits the number of evaluated samples.
    pub test_samples: Option<usize>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            swap_counts: vec![0, 10, 100, 1_000, 10_000],
            hidden: 128,
            test_samples: None,
        }
    }
}

impl ExperimentConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// **Errors**
    /// - The file could not be read.
    /// - The JSON is invalid.
    /// - See [`.validate()`](Self::validate()).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).with_context(|| format!("Reading {path:?}"))?;
        let config: Self =
            serde_json::from_str(&contents).with_context(|| format!("Parsing {path:?}"))?;
        config.validate()?;
        Ok(config)
    }
    /// Checks the configuration.
    ///
    /// **Errors**
    /// - `hidden` is 0.
    /// - `swap_counts` is empty.
    /// - `test_samples` is 0.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.hidden > 0, "hidden must be positive");
        ensure!(!self.swap_counts.is_empty(), "swap_counts must not be empty");
        ensure!(
            self.test_samples != Some(0),
            "test_samples must be positive"
        );
        Ok(())
    }
}

/// Loads network parameters from a JSON file, as written by serializing a [`TwoLayerDense`].
///
/// **Errors**
/// - The file could not be read.
/// - The JSON is invalid or the parameter shapes are inconsistent.
pub fn load_network(path: impl AsRef<Path>) -> Result<TwoLayerDense> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).with_context(|| format!("Reading {path:?}"))?;
    let network: TwoLayerDense =
        serde_json::from_str(&contents).with_context(|| format!("Parsing {path:?}"))?;
    tracing::debug!(
        inputs = network.inputs(),
        hidden = network.hidden(),
        outputs = network.outputs(),
        "loaded network"
    );
    Ok(network)
}

/// The result of one swap count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// The number of random swaps.
    pub swap_count: usize,
    /// The number of pixels moved by the permutation.
    pub displaced: usize,
    /// Accuracy on permuted inputs, without realignment.
    pub permuted: Stats,
    /// Accuracy on permuted inputs, after realignment.
    pub realigned: Stats,
    /// Fraction of predictions on permuted inputs equal to the baseline predictions.
    pub permuted_agreement: f32,
    /// Fraction of realigned predictions equal to the baseline predictions.
    pub realigned_agreement: f32,
    /// Largest absolute difference between realigned and baseline logits.
    pub max_logit_error: f32,
}

/// The experiment results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Accuracy on the original inputs.
    pub baseline: Stats,
    /// One trial per swap count.
    pub trials: Vec<Trial>,
}

/// Runs the experiment.
///
/// - `network`: evaluated on, and realigned for, each permutation. It is not modified.
/// - `inputs`: flattened images, `[N, network.inputs()]`.
/// - `classes`: the true classes, `[N]`.
///
/// **Errors**
/// - The configuration is invalid.
/// - The inputs or classes have the wrong shape.
pub fn run<S1, S2>(
    config: &ExperimentConfig,
    network: &TwoLayerDense,
    inputs: &ArrayBase<S1, Ix2>,
    classes: &ArrayBase<S2, Ix1>,
) -> Result<Report>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = u8>,
{
    config.validate()?;
    ensure!(
        inputs.nrows() == classes.len(),
        "input count {} != class count {}",
        inputs.nrows(),
        classes.len()
    );
    let n = config
        .test_samples
        .map_or(inputs.nrows(), |n| n.min(inputs.nrows()));
    let inputs = inputs.slice(s![..n, ..]);
    let classes = classes.slice(s![..n]);
    let logits = network.forward(&inputs)?;
    let predictions = predict_classes(&logits);
    let baseline = Stats::from_predictions(&predictions, &classes)?;
    tracing::info!(
        samples = n,
        accuracy = baseline.accuracy(),
        "baseline"
    );
    let mut trials = Vec::with_capacity(config.swap_counts.len());
    for &swap_count in config.swap_counts.iter() {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let permutation = generate_permutation(network.inputs(), swap_count, &mut rng)?;
        let permuted_inputs = permute_features(&inputs, &permutation)?;
        let permuted_predictions = network.predict(&permuted_inputs)?;
        let realigned = network.realign_first_layer(&permutation)?;
        let realigned_logits = realigned.forward(&permuted_inputs)?;
        let realigned_predictions = predict_classes(&realigned_logits);
        let max_logit_error = realigned_logits
            .iter()
            .zip(logits.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0f32, f32::max);
        let trial = Trial {
            swap_count,
            displaced: permutation.displaced(),
            permuted: Stats::from_predictions(&permuted_predictions, &classes)?,
            realigned: Stats::from_predictions(&realigned_predictions, &classes)?,
            permuted_agreement: agreement(&permuted_predictions, &predictions)?,
            realigned_agreement: agreement(&realigned_predictions, &predictions)?,
            max_logit_error,
        };
        tracing::info!(
            swap_count,
            displaced = trial.displaced,
            permuted_accuracy = trial.permuted.accuracy(),
            realigned_accuracy = trial.realigned.accuracy(),
            max_logit_error,
            elapsed = ?start.elapsed(),
            "trial"
        );
        trials.push(trial);
    }
    Ok(Report { baseline, trials })
}
