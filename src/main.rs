use anyhow::{ensure, Context};
use clap::Parser;
use ndarray::Axis;
use permutation_invariance::{
    dataset::{
        mnist::{Mnist, MnistKind},
        scale_images,
    },
    experiment::{self, ExperimentConfig},
    network::TwoLayerDense,
    permutation::MNIST_PIXELS,
    result::Result,
};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Evaluates a dense network on MNIST images with scrambled pixels, before and after realigning its first layer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Options {
    /// Folder containing the "mnist" or "fashion-mnist" folder.
    #[arg(long)]
    data: Option<PathBuf>,
    /// Use FashionMNIST.
    #[arg(long)]
    fashion: bool,
    /// JSON network parameters. If not specified, a network is initialized with the configured seed and hidden width.
    #[arg(long)]
    weights: Option<PathBuf>,
    /// JSON experiment configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Overrides the swap counts.
    #[arg(long, num_args = 1..)]
    swaps: Vec<usize>,
    /// Overrides the hidden width.
    #[arg(long)]
    hidden: Option<usize>,
    /// Overrides the number of test samples.
    #[arg(long)]
    test_samples: Option<usize>,
    /// Prints the report as JSON.
    #[arg(long)]
    json: bool,
}

impl Options {
    fn experiment_config(&self) -> Result<ExperimentConfig> {
        let mut config = if let Some(path) = self.config.as_ref() {
            ExperimentConfig::from_json_file(path)?
        } else {
            ExperimentConfig::default()
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if !self.swaps.is_empty() {
            config.swap_counts = self.swaps.clone();
        }
        if let Some(hidden) = self.hidden {
            config.hidden = hidden;
        }
        if self.test_samples.is_some() {
            config.test_samples = self.test_samples;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let options = Options::parse();
    let config = options.experiment_config()?;

    let kind = if options.fashion {
        MnistKind::Fashion
    } else {
        MnistKind::Digits
    };
    let mut builder = Mnist::builder().kind(kind);
    if let Some(path) = options.data.as_deref() {
        builder = builder.path(path);
    }
    let mnist = builder.build().context("Loading mnist")?;
    let (images, classes) = mnist.test();
    let n = images.len_of(Axis(0));
    let inputs = scale_images(&images).into_shape([n, MNIST_PIXELS])?;

    let network = if let Some(path) = options.weights.as_ref() {
        let network = experiment::load_network(path)?;
        ensure!(
            network.inputs() == MNIST_PIXELS && network.outputs() == 10,
            "{path:?}: expected {MNIST_PIXELS} inputs and 10 outputs, found {} and {}",
            network.inputs(),
            network.outputs()
        );
        tracing::info!(path = %path.display(), hidden = network.hidden(), "loaded weights");
        network
    } else {
        // Untrained, so the baseline accuracy is near chance.
        let mut rng = StdRng::seed_from_u64(config.seed);
        tracing::info!(hidden = config.hidden, "initialized weights");
        TwoLayerDense::glorot_uniform(MNIST_PIXELS, config.hidden, 10, &mut rng)?
    };

    let report = experiment::run(&config, &network, &inputs, &classes)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "baseline accuracy: {:.4} ({} samples)",
            report.baseline.accuracy(),
            report.baseline.count()
        );
        println!(
            "{:>8} {:>9} {:>10} {:>10} {:>10} {:>12}",
            "swaps", "displaced", "permuted", "realigned", "agreement", "logit error"
        );
        for trial in report.trials.iter() {
            println!(
                "{:>8} {:>9} {:>10.4} {:>10.4} {:>10.4} {:>12.3e}",
                trial.swap_count,
                trial.displaced,
                trial.permuted.accuracy(),
                trial.realigned.accuracy(),
                trial.realigned_agreement,
                trial.max_logit_error
            );
        }
    }
    Ok(())
}
