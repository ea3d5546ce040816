//! Pixel index permutations.
//!
//! A [`Permutation`] is built by composing random pairwise swaps on the identity with [`generate_permutation()`]. The pairs come from a [`SwapSource`], which is implemented for every [`Rng`] and for [`ReplaySwaps`], so experiments are reproducible given a seed or a recorded list of swaps.
use crate::error::{PermutationError, PermutationResult};
use rand::{seq::index::sample, seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Index};

/// Number of pixels in a flattened 28 x 28 image.
pub const MNIST_PIXELS: usize = 28 * 28;

/// A bijection on `0 .. len`.
///
/// Applying the permutation to a sequence `x` produces `y` with `y[i] = x[self[i]]`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    /// The identity permutation `[0, 1, .., size - 1]`.
    ///
    /// **Errors**
    /// - `size` is 0.
    pub fn identity(size: usize) -> PermutationResult<Self> {
        if size == 0 {
            return Err(PermutationError::invalid_argument(
                "permutation size must be positive",
            ));
        }
        Ok(Self {
            indices: (0..size).collect(),
        })
    }
    /// Constructs a permutation from `indices`.
    ///
    /// **Errors**
    /// - `indices` is empty.
    /// - `indices` is not a rearrangement of `0 .. indices.len()`.
    pub fn from_indices(indices: Vec<usize>) -> PermutationResult<Self> {
        if indices.is_empty() {
            return Err(PermutationError::invalid_argument(
                "permutation size must be positive",
            ));
        }
        let mut seen = vec![false; indices.len()];
        for &index in indices.iter() {
            match seen.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                Some(_) => {
                    return Err(PermutationError::invalid_argument(format!(
                        "index {index} appears more than once"
                    )))
                }
                None => {
                    return Err(PermutationError::invalid_argument(format!(
                        "index {index} is out of range for a permutation of length {}",
                        indices.len()
                    )))
                }
            }
        }
        Ok(Self { indices })
    }
    /// A uniformly random permutation of `0 .. size`.
    ///
    /// **Errors**
    /// - `size` is 0.
    pub fn shuffled<R: Rng + ?Sized>(size: usize, rng: &mut R) -> PermutationResult<Self> {
        let mut permutation = Self::identity(size)?;
        permutation.indices.shuffle(rng);
        Ok(permutation)
    }
    /// The length.
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    /// Always false, permutations have at least one element.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
    /// The indices as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }
    /// Converts into the index vector.
    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }
    /// Whether every index maps to itself.
    pub fn is_identity(&self) -> bool {
        self.displaced() == 0
    }
    /// The number of positions `i` with `self[i] != i`.
    pub fn displaced(&self) -> usize {
        self.indices
            .iter()
            .enumerate()
            .filter(|(i, p)| i != *p)
            .count()
    }
    /// The inverse permutation.
    ///
    /// Applying `self` and then the inverse restores the original order.
    pub fn inverse(&self) -> Self {
        let mut indices = vec![0; self.len()];
        for (i, &p) in self.indices.iter().enumerate() {
            indices[p] = i;
        }
        Self { indices }
    }
    /// Composes `self` with `other`.
    ///
    /// Applying the result is equivalent to applying `self` and then `other`.
    ///
    /// **Errors**
    /// - The lengths are not equal.
    pub fn then(&self, other: &Self) -> PermutationResult<Self> {
        let indices = other.apply(&self.indices)?;
        Ok(Self { indices })
    }
    /// Reorders `input` so that output position `i` takes `input[self[i]]`.
    ///
    /// **Errors**
    /// - `input.len()` != `self.len()`.
    pub fn apply<T: Clone>(&self, input: &[T]) -> PermutationResult<Vec<T>> {
        if input.len() != self.len() {
            return Err(PermutationError::shape_mismatch(format!(
                "input length {} != permutation length {}",
                input.len(),
                self.len()
            )));
        }
        Ok(self.indices.iter().map(|&p| input[p].clone()).collect())
    }
}

impl Index<usize> for Permutation {
    type Output = usize;
    fn index(&self, index: usize) -> &usize {
        &self.indices[index]
    }
}

impl AsRef<[usize]> for Permutation {
    fn as_ref(&self) -> &[usize] {
        self.as_slice()
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = PermutationError;
    fn try_from(indices: Vec<usize>) -> PermutationResult<Self> {
        Self::from_indices(indices)
    }
}

impl From<Permutation> for Vec<usize> {
    fn from(permutation: Permutation) -> Self {
        permutation.indices
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Permutation").field(&self.indices).finish()
    }
}

/// A source of index pairs for [`generate_permutation()`].
pub trait SwapSource {
    /// Returns two distinct indices in `0 .. len`.
    ///
    /// **Errors**
    /// - `len` < 2.
    /// - The source cannot produce a valid pair.
    fn sample_pair(&mut self, len: usize) -> PermutationResult<(usize, usize)>;
}

impl<R: Rng + ?Sized> SwapSource for R {
    fn sample_pair(&mut self, len: usize) -> PermutationResult<(usize, usize)> {
        if len < 2 {
            return Err(PermutationError::invalid_argument(format!(
                "cannot draw two distinct indices from {len} element(s)"
            )));
        }
        let pair = sample(self, len, 2);
        Ok((pair.index(0), pair.index(1)))
    }
}

/// Replays recorded swap pairs in order.
///
/// Each pair is checked against the permutation length, and fails when exhausted.
///
/// ```
/// # use permutation_invariance::permutation::{generate_permutation, ReplaySwaps};
/// let permutation = generate_permutation(4, 1, &mut ReplaySwaps::new([(0, 1)]))?;
/// assert_eq!(permutation.as_slice(), &[1, 0, 2, 3]);
/// # Ok::<(), permutation_invariance::error::PermutationError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ReplaySwaps<I> {
    pairs: I,
}

impl<I: Iterator<Item = (usize, usize)>> ReplaySwaps<I> {
    /// Constructs a new [`ReplaySwaps`] from `pairs`.
    pub fn new(pairs: impl IntoIterator<Item = (usize, usize), IntoIter = I>) -> Self {
        Self {
            pairs: pairs.into_iter(),
        }
    }
}

impl<I: Iterator<Item = (usize, usize)>> SwapSource for ReplaySwaps<I> {
    fn sample_pair(&mut self, len: usize) -> PermutationResult<(usize, usize)> {
        let (a, b) = self
            .pairs
            .next()
            .ok_or_else(|| PermutationError::invalid_argument("swap replay exhausted"))?;
        if a == b || a >= len || b >= len {
            return Err(PermutationError::invalid_argument(format!(
                "swap ({a}, {b}) is not a pair of distinct indices below {len}"
            )));
        }
        Ok((a, b))
    }
}

/// Generates a permutation of `0 .. size` by applying `swap_count` random transpositions to the identity.
///
/// Each iteration draws two distinct indices from `source` and exchanges the values at those positions. With `swap_count` = 0 the identity is returned and `source` is not used.
///
/// **Errors**
/// - `size` is 0.
/// - `size` is 1 and `swap_count` > 0.
/// - `source` fails to produce a pair.
pub fn generate_permutation<S: SwapSource + ?Sized>(
    size: usize,
    swap_count: usize,
    source: &mut S,
) -> PermutationResult<Permutation> {
    let mut permutation = Permutation::identity(size)?;
    for _ in 0..swap_count {
        let (a, b) = source.sample_pair(size)?;
        permutation.indices.swap(a, b);
    }
    Ok(permutation)
}
