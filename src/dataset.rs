//! Datasets.
use ndarray::{Array, ArrayBase, Data, Dimension};

/// MNIST and FashionMNIST.
#[cfg(feature = "mnist")]
pub mod mnist;

/// Scales `u8` pixels into `[0, 1]`.
pub fn scale_images<S, D>(images: &ArrayBase<S, D>) -> Array<f32, D>
where
    S: Data<Elem = u8>,
    D: Dimension,
{
    images.mapv(|x| f32::from(x) / 255.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scale() {
        let images = array![[0u8, 51], [255, 102]];
        assert_eq!(scale_images(&images), array![[0f32, 0.2], [1., 0.4]]);
    }
}
