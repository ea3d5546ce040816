use approx::assert_abs_diff_eq;
use ndarray::{Array, Array2, Array3};
use permutation_invariance::{
    image::{apply_permutation, permute_features},
    network::{realign_first_layer, TwoLayerDense},
    permutation::{generate_permutation, Permutation, MNIST_PIXELS},
    result::Result,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_images(rng: &mut StdRng, n: usize) -> Array3<f32> {
    Array::from_shape_fn([n, 28, 28], |_| f32::from(rng.gen::<u8>()) / 255.)
}

fn flatten(images: Array3<f32>) -> Result<Array2<f32>> {
    let n = images.dim().0;
    Ok(images.into_shape([n, MNIST_PIXELS])?)
}

#[test]
fn pre_activations_are_invariant() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let network = TwoLayerDense::glorot_uniform(MNIST_PIXELS, 64, 10, &mut rng)?;
    let images = random_images(&mut rng, 16);
    for swap_count in [0, 1, 100, 10_000] {
        let permutation = generate_permutation(MNIST_PIXELS, swap_count, &mut rng)?;
        let permuted = flatten(apply_permutation(&images, &permutation)?)?;
        let realigned = network.realign_first_layer(&permutation)?;
        assert_abs_diff_eq!(
            realigned.pre_activations(&permuted)?,
            network.pre_activations(&flatten(images.clone())?)?,
            epsilon = 1e-5
        );
    }
    Ok(())
}

#[test]
fn shuffled_predictions_are_recovered() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let network = TwoLayerDense::glorot_uniform(MNIST_PIXELS, 32, 10, &mut rng)?;
    let inputs = flatten(random_images(&mut rng, 32))?;
    let permutation = Permutation::shuffled(MNIST_PIXELS, &mut rng)?;
    let permuted = permute_features(&inputs, &permutation)?;
    let realigned = network.realign_first_layer(&permutation)?;
    assert_abs_diff_eq!(
        realigned.forward(&permuted)?,
        network.forward(&inputs)?,
        epsilon = 1e-4
    );
    assert_eq!(realigned.predict(&permuted)?, network.predict(&inputs)?);
    Ok(())
}

#[test]
fn positional_weights_are_invariant() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let weights = TwoLayerDense::glorot_uniform(MNIST_PIXELS, 16, 10, &mut rng)?.into_arrays();
    let permutation = generate_permutation(MNIST_PIXELS, 500, &mut rng)?;
    let realigned = realign_first_layer(&weights, &permutation)?;
    let original = TwoLayerDense::try_from(weights)?;
    let realigned = TwoLayerDense::try_from(realigned)?;
    let inputs = flatten(random_images(&mut rng, 4))?;
    let permuted = permute_features(&inputs, &permutation)?;
    assert_abs_diff_eq!(
        realigned.pre_activations(&permuted)?,
        original.pre_activations(&inputs)?,
        epsilon = 1e-5
    );
    Ok(())
}

#[test]
fn permute_then_inverse_is_exact() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(9);
    let images = Array::from_shape_fn([10, 28, 28], |_| rng.gen::<u8>());
    let permutation = generate_permutation(MNIST_PIXELS, 2_000, &mut rng)?;
    let permuted = apply_permutation(&images, &permutation)?;
    let restored = apply_permutation(&permuted, &permutation.inverse())?;
    assert_eq!(restored, images);
    Ok(())
}

#[test]
fn mismatched_shapes_are_rejected() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(1);
    let network = TwoLayerDense::glorot_uniform(MNIST_PIXELS, 8, 10, &mut rng)?;
    let permutation = generate_permutation(27 * 27, 10, &mut rng)?;
    let images = random_images(&mut rng, 2);
    assert!(apply_permutation(&images, &permutation)
        .unwrap_err()
        .is_shape_mismatch());
    assert!(network
        .realign_first_layer(&permutation)
        .unwrap_err()
        .is_shape_mismatch());
    let mut weights = network.into_arrays();
    weights.truncate(2);
    let permutation = generate_permutation(MNIST_PIXELS, 10, &mut rng)?;
    assert!(realign_first_layer(&weights, &permutation)
        .unwrap_err()
        .is_shape_mismatch());
    Ok(())
}
