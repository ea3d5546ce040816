/*!
# permutation_invariance

Pixel permutation experiments for dense neural networks.

A fully connected network does not know which of its inputs are neighboring pixels. Scrambling the pixels of every image with a fixed [`Permutation`](permutation::Permutation) destroys the accuracy of a trained network, but reordering the rows of its first kernel with the same permutation restores it exactly, without retraining.

- [`permutation`]: generating permutations from random pairwise swaps.
- [`image`]: applying a permutation to images or flattened features.
- [`network`]: a two layer dense network and first layer realignment.
- [`metrics`]: accuracy, agreement, and confusion matrices.
- [`dataset`]: MNIST and FashionMNIST.
- [`experiment`]: evaluating a network over several swap counts.

```
# use permutation_invariance::{
#     image::permute_features,
#     network::TwoLayerDense,
#     permutation::{generate_permutation, MNIST_PIXELS},
# };
# use approx::assert_abs_diff_eq;
# use ndarray::Array;
# use rand::{rngs::StdRng, Rng, SeedableRng};
# fn main() -> permutation_invariance::result::Result<()> {
let mut rng = StdRng::seed_from_u64(0);
let network = TwoLayerDense::glorot_uniform(MNIST_PIXELS, 32, 10, &mut rng)?;
let images = Array::from_shape_fn([8, MNIST_PIXELS], |_| rng.gen_range(0f32..1.));
let permutation = generate_permutation(MNIST_PIXELS, 1_000, &mut rng)?;
let permuted = permute_features(&images, &permutation)?;
let realigned = network.realign_first_layer(&permutation)?;
assert_abs_diff_eq!(
    realigned.pre_activations(&permuted)?,
    network.pre_activations(&images)?,
    epsilon = 1e-5
);
# Ok(())
# }
```
*/

#![warn(missing_docs)]

/// Errors.
pub mod error;

/// Results.
pub mod result {
    pub use anyhow::{Error, Result};
}

pub mod dataset;
pub mod experiment;
pub mod image;
pub mod metrics;
pub mod network;
pub mod permutation;
