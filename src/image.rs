//! Applying a [`Permutation`] to images.
use crate::{
    error::{PermutationError, PermutationResult},
    permutation::Permutation,
};
use ndarray::{Array, Array2, ArrayBase, Axis, Data, Dimension, Ix2};
use rayon::prelude::*;

/// Permutes the pixels of each `[H, W]` image in `images`.
///
/// The last two axes are the image plane, any leading axes are batch (and channel) axes. Each plane is flattened to `H * W` pixels, output pixel `i` takes input pixel `permutation[i]`, and the result is reshaped back. The output has the same shape and dimensionality as the input:
/// - `[H, W]`: a single image is returned as a single image.
/// - `[N, H, W]`: a batch of `N` images.
/// - `[N, C, H, W]`: each channel plane is permuted independently.
///
/// The input is never modified, it may be a view in any memory layout. The output is in standard layout.
///
/// **Errors**
/// - `images` has fewer than 2 axes.
/// - `permutation.len()` != `H * W`.
///
/// ```
/// # use permutation_invariance::{image::apply_permutation, permutation::Permutation};
/// # use ndarray::array;
/// let image = array![[1, 2], [3, 4]];
/// let permutation = Permutation::from_indices(vec![2, 0, 3, 1])?;
/// assert_eq!(apply_permutation(&image, &permutation)?, array![[3, 1], [4, 2]]);
/// # Ok::<(), permutation_invariance::error::PermutationError>(())
/// ```
pub fn apply_permutation<A, S, D>(
    images: &ArrayBase<S, D>,
    permutation: &Permutation,
) -> PermutationResult<Array<A, D>>
where
    A: Clone + Send + Sync,
    S: Data<Elem = A>,
    D: Dimension,
{
    let shape = images.shape();
    let ndim = shape.len();
    if ndim < 2 {
        return Err(PermutationError::shape_mismatch(format!(
            "expected images with at least 2 axes, found shape {shape:?}"
        )));
    }
    let plane = shape[ndim - 2] * shape[ndim - 1];
    if plane != permutation.len() {
        return Err(PermutationError::shape_mismatch(format!(
            "permutation length {} != image size {} x {}",
            permutation.len(),
            shape[ndim - 2],
            shape[ndim - 1]
        )));
    }
    let planes = images.len() / plane;
    let images = images.as_standard_layout();
    let flat = images.view().into_shape((planes, plane))?;
    let output = permute_rows(flat, permutation);
    Ok(Array::from_shape_vec(images.raw_dim(), output)?)
}

/// Permutes the columns of `features`, a `[N, D]` batch of flattened rows.
///
/// Output element `[n, i]` is input element `[n, permutation[i]]`. For images flattened to `H * W` this is equivalent to [`apply_permutation()`].
///
/// **Errors**
/// - `D` != `permutation.len()`.
pub fn permute_features<A, S>(
    features: &ArrayBase<S, Ix2>,
    permutation: &Permutation,
) -> PermutationResult<Array2<A>>
where
    A: Clone + Send + Sync,
    S: Data<Elem = A>,
{
    let (rows, cols) = features.dim();
    if cols != permutation.len() {
        return Err(PermutationError::shape_mismatch(format!(
            "permutation length {} != feature count {cols}",
            permutation.len()
        )));
    }
    let output = permute_rows(features.view(), permutation);
    Ok(Array::from_shape_vec([rows, cols], output)?)
}

fn permute_rows<A>(rows: ndarray::ArrayView2<A>, permutation: &Permutation) -> Vec<A>
where
    A: Clone + Send + Sync,
{
    let indices = permutation.as_slice();
    rows.axis_iter(Axis(0))
        .into_par_iter()
        .flat_map_iter(|row| indices.iter().map(move |&p| row[p].clone()))
        .collect()
}
