//! A two layer dense network and first layer realignment.
//!
//! [`TwoLayerDense`] holds the parameters of `dense(D -> H) -> relu -> dense(H -> C)`. [`TwoLayerDense::realign_first_layer()`] reorders the rows of the first kernel so that a network trained on unpermuted inputs computes the same function on inputs permuted with the same [`Permutation`].
use crate::{
    error::{PermutationError, PermutationResult},
    permutation::Permutation,
};
use ndarray::{Array, Array1, Array2, ArrayBase, ArrayD, Axis, Data, Ix1, Ix2};
use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Parameters of a network with two dense layers.
///
/// Equivalent to the positional layout `[first_kernel, first_bias, second_kernel, second_bias]`, which can be converted with [`TryFrom`] and [`.into_arrays()`](Self::into_arrays()).
///
/// Deserialization checks the shapes like [`TwoLayerDense::new()`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TwoLayerDense {
    first_kernel: Array2<f32>,
    first_bias: Array1<f32>,
    second_kernel: Array2<f32>,
    second_bias: Array1<f32>,
}

impl TwoLayerDense {
    /// Constructs a new [`TwoLayerDense`].
    ///
    /// # Shapes
    /// - `first_kernel`: `[inputs, hidden]`
    /// - `first_bias`: `[hidden]`
    /// - `second_kernel`: `[hidden, outputs]`
    /// - `second_bias`: `[outputs]`
    ///
    /// **Errors**
    /// - The shapes are inconsistent.
    pub fn new(
        first_kernel: Array2<f32>,
        first_bias: Array1<f32>,
        second_kernel: Array2<f32>,
        second_bias: Array1<f32>,
    ) -> PermutationResult<Self> {
        let (_, hidden) = first_kernel.dim();
        let (second_inputs, outputs) = second_kernel.dim();
        if first_bias.len() != hidden {
            return Err(PermutationError::shape_mismatch(format!(
                "first bias length {} != first kernel columns {hidden}",
                first_bias.len()
            )));
        }
        if second_inputs != hidden {
            return Err(PermutationError::shape_mismatch(format!(
                "second kernel rows {second_inputs} != first kernel columns {hidden}"
            )));
        }
        if second_bias.len() != outputs {
            return Err(PermutationError::shape_mismatch(format!(
                "second bias length {} != second kernel columns {outputs}",
                second_bias.len()
            )));
        }
        Ok(Self {
            first_kernel,
            first_bias,
            second_kernel,
            second_bias,
        })
    }
    /// Initializes kernels with the Glorot (Xavier) uniform distribution and biases with zeros.
    ///
    /// **Errors**
    /// - Any of the dimensions is 0.
    pub fn glorot_uniform<R: Rng + ?Sized>(
        inputs: usize,
        hidden: usize,
        outputs: usize,
        rng: &mut R,
    ) -> PermutationResult<Self> {
        if inputs == 0 || hidden == 0 || outputs == 0 {
            return Err(PermutationError::invalid_argument(format!(
                "dense dimensions must be positive, found {inputs} -> {hidden} -> {outputs}"
            )));
        }
        fn kernel<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Array2<f32> {
            let limit = (6. / (inputs + outputs) as f32).sqrt();
            let distr = Uniform::new_inclusive(-limit, limit);
            Array::from_shape_fn([inputs, outputs], |_| distr.sample(rng))
        }
        Self::new(
            kernel(inputs, hidden, rng),
            Array::zeros(hidden),
            kernel(hidden, outputs, rng),
            Array::zeros(outputs),
        )
    }
    /// The number of input features.
    pub fn inputs(&self) -> usize {
        self.first_kernel.nrows()
    }
    /// The width of the hidden layer.
    pub fn hidden(&self) -> usize {
        self.first_kernel.ncols()
    }
    /// The number of outputs (classes).
    pub fn outputs(&self) -> usize {
        self.second_kernel.ncols()
    }
    /// The first kernel, `[inputs, hidden]`.
    pub fn first_kernel(&self) -> &Array2<f32> {
        &self.first_kernel
    }
    /// The first bias, `[hidden]`.
    pub fn first_bias(&self) -> &Array1<f32> {
        &self.first_bias
    }
    /// The second kernel, `[hidden, outputs]`.
    pub fn second_kernel(&self) -> &Array2<f32> {
        &self.second_kernel
    }
    /// The second bias, `[outputs]`.
    pub fn second_bias(&self) -> &Array1<f32> {
        &self.second_bias
    }
    /// Converts into the positional layout `[first_kernel, first_bias, second_kernel, second_bias]`.
    pub fn into_arrays(self) -> Vec<ArrayD<f32>> {
        vec![
            self.first_kernel.into_dyn(),
            self.first_bias.into_dyn(),
            self.second_kernel.into_dyn(),
            self.second_bias.into_dyn(),
        ]
    }
    /// Returns a new network with the rows of the first kernel reordered by `permutation`.
    ///
    /// Row `i` of the new first kernel is row `permutation[i]` of the current one, the remaining parameters are copied unchanged. If `x'` is `x` permuted by `permutation`, then `realigned.pre_activations(x') == self.pre_activations(x)`: each hidden unit sums the same products of pixels and weights in a different order.
    ///
    /// `self` is not modified.
    ///
    /// **Errors**
    /// - `permutation.len()` != [`.inputs()`](Self::inputs()).
    pub fn realign_first_layer(&self, permutation: &Permutation) -> PermutationResult<Self> {
        if permutation.len() != self.inputs() {
            return Err(PermutationError::shape_mismatch(format!(
                "permutation length {} != first kernel rows {}",
                permutation.len(),
                self.inputs()
            )));
        }
        Ok(Self {
            first_kernel: self.first_kernel.select(Axis(0), permutation.as_slice()),
            ..self.clone()
        })
    }
    fn check_inputs<S: Data<Elem = f32>>(&self, input: &ArrayBase<S, Ix2>) -> PermutationResult<()> {
        if input.ncols() != self.inputs() {
            return Err(PermutationError::shape_mismatch(format!(
                "input features {} != network inputs {}",
                input.ncols(),
                self.inputs()
            )));
        }
        Ok(())
    }
    /// Computes the hidden layer before the activation, `input . first_kernel + first_bias`.
    ///
    /// `input` is `[batch_size, inputs]`, the output is `[batch_size, hidden]`.
    ///
    /// **Errors**
    /// - The input has the wrong number of features.
    pub fn pre_activations<S: Data<Elem = f32>>(
        &self,
        input: &ArrayBase<S, Ix2>,
    ) -> PermutationResult<Array2<f32>> {
        self.check_inputs(input)?;
        Ok(input.dot(&self.first_kernel) + &self.first_bias)
    }
    /// Computes the logits, `[batch_size, outputs]`.
    ///
    /// **Errors**
    /// - The input has the wrong number of features.
    pub fn forward<S: Data<Elem = f32>>(
        &self,
        input: &ArrayBase<S, Ix2>,
    ) -> PermutationResult<Array2<f32>> {
        let mut hidden = self.pre_activations(input)?;
        hidden.mapv_inplace(|x| x.max(0.));
        Ok(hidden.dot(&self.second_kernel) + &self.second_bias)
    }
    /// Predicts the class of each row, the index of the largest logit.
    ///
    /// **Errors**
    /// - The input has the wrong number of features.
    pub fn predict<S: Data<Elem = f32>>(
        &self,
        input: &ArrayBase<S, Ix2>,
    ) -> PermutationResult<Array1<usize>> {
        let logits = self.forward(input)?;
        Ok(predict_classes(&logits))
    }
}

#[derive(Deserialize)]
struct TwoLayerDenseRepr {
    first_kernel: Array2<f32>,
    first_bias: Array1<f32>,
    second_kernel: Array2<f32>,
    second_bias: Array1<f32>,
}

impl<'de> Deserialize<'de> for TwoLayerDense {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = TwoLayerDenseRepr::deserialize(deserializer)?;
        Self::new(
            repr.first_kernel,
            repr.first_bias,
            repr.second_kernel,
            repr.second_bias,
        )
        .map_err(serde::de::Error::custom)
    }
}

/// The index of the largest logit of each row of `logits`, `[batch_size, outputs]`.
pub(crate) fn predict_classes<S: Data<Elem = f32>>(logits: &ArrayBase<S, Ix2>) -> Array1<usize> {
    logits.map_axis(Axis(1), |row| argmax(&row))
}

fn argmax<S: Data<Elem = f32>>(row: &ArrayBase<S, Ix1>) -> usize {
    let mut best = 0;
    for (i, x) in row.iter().enumerate() {
        if *x > row[best] {
            best = i;
        }
    }
    best
}

impl TryFrom<Vec<ArrayD<f32>>> for TwoLayerDense {
    type Error = PermutationError;
    /// Converts from the positional layout `[first_kernel, first_bias, second_kernel, second_bias]`.
    ///
    /// **Errors**
    /// - There are not exactly four arrays.
    /// - The kernels are not 2 dimensional, or the biases are not 1 dimensional.
    /// - The shapes are inconsistent, see [`TwoLayerDense::new()`].
    fn try_from(arrays: Vec<ArrayD<f32>>) -> PermutationResult<Self> {
        let n = arrays.len();
        let [first_kernel, first_bias, second_kernel, second_bias]: [ArrayD<f32>; 4] = arrays
            .try_into()
            .map_err(|_| {
                PermutationError::shape_mismatch(format!(
                    "expected 4 arrays (kernel, bias, kernel, bias), found {n}"
                ))
            })?;
        fn kernel(array: ArrayD<f32>, name: &str) -> PermutationResult<Array2<f32>> {
            let shape = array.shape().to_vec();
            array.into_dimensionality().map_err(|_| {
                PermutationError::shape_mismatch(format!("{name} must be 2 dimensional, found {shape:?}"))
            })
        }
        fn bias(array: ArrayD<f32>, name: &str) -> PermutationResult<Array1<f32>> {
            let shape = array.shape().to_vec();
            array.into_dimensionality().map_err(|_| {
                PermutationError::shape_mismatch(format!("{name} must be 1 dimensional, found {shape:?}"))
            })
        }
        Self::new(
            kernel(first_kernel, "first kernel")?,
            bias(first_bias, "first bias")?,
            kernel(second_kernel, "second kernel")?,
            bias(second_bias, "second bias")?,
        )
    }
}

/// Realigns the first kernel of positional weights `[first_kernel, first_bias, second_kernel, second_bias]`.
///
/// Returns new arrays, see [`TwoLayerDense::realign_first_layer()`]. `weights` is not modified.
///
/// **Errors**
/// - `weights` does not have the layout of a [`TwoLayerDense`].
/// - The first kernel has a row count != `permutation.len()`.
pub fn realign_first_layer(
    weights: &[ArrayD<f32>],
    permutation: &Permutation,
) -> PermutationResult<Vec<ArrayD<f32>>> {
    let network = TwoLayerDense::try_from(weights.to_vec())?;
    Ok(network.realign_first_layer(permutation)?.into_arrays())
}
