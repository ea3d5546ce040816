use crate::result::Result;
use anyhow::{bail, ensure, Context};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use ndarray::{s, ArcArray, ArcArray1, ArrayView1, ArrayView4, Ix4};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

/// The kind of Mnist.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MnistKind {
    /// [MNIST](<http://yann.lecun.com/exdb/mnist/>)
    Digits,
    /// [FashionMNIST](<https://github.com/zalandoresearch/fashion-mnist>)
    Fashion,
}

impl MnistKind {
    /// The name of the folder containing the files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Digits => "mnist",
            Self::Fashion => "fashion-mnist",
        }
    }
    /// The names of the 10 classes.
    pub fn class_names(&self) -> [&'static str; 10] {
        match self {
            Self::Digits => ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
            Self::Fashion => [
                "T-shirt/top",
                "Trouser",
                "Pullover",
                "Dress",
                "Coat",
                "Sandal",
                "Shirt",
                "Sneaker",
                "Bag",
                "Ankle boot",
            ],
        }
    }
}

/// Mnist builder.
pub mod builders {
    use super::{Mnist, MnistKind, Result};
    use std::path::Path;

    /// Mnist builder.
    #[derive(Debug)]
    pub struct MnistBuilder<'a> {
        pub(super) path: Option<&'a Path>,
        pub(super) kind: MnistKind,
    }

    impl Default for MnistBuilder<'_> {
        fn default() -> Self {
            Self {
                path: None,
                kind: MnistKind::Digits,
            }
        }
    }

    impl MnistBuilder<'_> {
        /// The path to load the dataset from.
        ///
        /// The files are loaded from the "mnist" or "fashion-mnist" folder in `path`. If not specified, uses the OS specific "Downloads" directory or the "Temp" directory.
        pub fn path(self, path: &Path) -> MnistBuilder {
            MnistBuilder {
                path: Some(path),
                kind: self.kind,
            }
        }
        /// The kind of Mnist to use. Defaults to [`MnistKind::Digits`] (ie the original MNIST dataset).
        pub fn kind(self, kind: MnistKind) -> Self {
            Self { kind, ..self }
        }
        /// Builds the dataset.
        ///
        /// **Errors**
        /// - The files were not found.
        /// - Decompressing / loading the data failed.
        /// - The headers or lengths are invalid.
        pub fn build(&self) -> Result<Mnist> {
            Mnist::build(self)
        }
    }
}
use builders::MnistBuilder;

const IMAGE_MAGIC: i32 = 2_051;
const LABEL_MAGIC: i32 = 2_049;
const SIDE: usize = 28;

/// The MNIST dataset.
///
/// Files are not downloaded. The folder should contain the 4 IDX files, either gzip compressed with a ".gz" extension or uncompressed:
/// - train-images-idx3-ubyte
/// - train-labels-idx1-ubyte
/// - t10k-images-idx3-ubyte
/// - t10k-labels-idx1-ubyte
#[derive(Clone)]
pub struct Mnist {
    kind: MnistKind,
    images: ArcArray<u8, Ix4>,
    classes: ArcArray1<u8>,
    train_len: usize,
}

impl Mnist {
    /// Returns an [`MnistBuilder`] used to specify options.
    /*
    ```no_run
    # use permutation_invariance::{
    #    result::Result,
    #    dataset::mnist::{Mnist, MnistKind},
    # };
    # use std::path::Path;
    # fn main() -> Result<()> {
        let mnist = Mnist::builder()
            .path(Path::new("data"))
            .kind(MnistKind::Fashion)
            .build()?;
        # Ok(())
    # }
    */
    pub fn builder() -> MnistBuilder<'static> {
        MnistBuilder::default()
    }
    fn build(builder: &MnistBuilder) -> Result<Self> {
        let mnist_path = builder
            .path
            .map(Path::to_owned)
            .unwrap_or_else(|| dirs::download_dir().unwrap_or_else(std::env::temp_dir))
            .join(builder.kind.name());
        tracing::debug!(path = %mnist_path.display(), kind = ?builder.kind, "loading mnist");
        let (train_images, train_n) = read_idx(&mnist_path, "train-images-idx3-ubyte", true)?;
        let (train_labels, train_labels_n) =
            read_idx(&mnist_path, "train-labels-idx1-ubyte", false)?;
        let (test_images, test_n) = read_idx(&mnist_path, "t10k-images-idx3-ubyte", true)?;
        let (test_labels, test_labels_n) = read_idx(&mnist_path, "t10k-labels-idx1-ubyte", false)?;
        ensure!(
            train_n == train_labels_n,
            "train images {train_n} != train labels {train_labels_n}"
        );
        ensure!(
            test_n == test_labels_n,
            "test images {test_n} != test labels {test_labels_n}"
        );
        let n = train_n + test_n;
        let mut images = train_images;
        images.extend(test_images);
        let mut labels = train_labels;
        labels.extend(test_labels);
        if let Some(label) = labels.iter().find(|x| **x > 9) {
            bail!("Invalid class {label}!");
        }
        let images = ArcArray::from_shape_vec([n, 1, SIDE, SIDE], images)?;
        let classes = ArcArray::from_shape_vec([n], labels)?;
        tracing::debug!(train = train_n, test = test_n, "loaded mnist");
        Ok(Self {
            kind: builder.kind,
            images,
            classes,
            train_len: train_n,
        })
    }
    /// The kind.
    pub fn kind(&self) -> MnistKind {
        self.kind
    }
    /// The images, train followed by test.
    ///
    /// Shape = \[N, 1, 28, 28\], N = 70_000 for the full dataset.
    pub fn images(&self) -> &ArcArray<u8, Ix4> {
        &self.images
    }
    /// The classes.
    ///
    /// Shape = \[N\].
    ///
    /// The classes range from 0 to 9 inclusive.
    pub fn classes(&self) -> &ArcArray1<u8> {
        &self.classes
    }
    /// The training images and classes.
    pub fn train(&self) -> (ArrayView4<u8>, ArrayView1<u8>) {
        (
            self.images.slice(s![..self.train_len, .., .., ..]),
            self.classes.slice(s![..self.train_len]),
        )
    }
    /// The test images and classes.
    pub fn test(&self) -> (ArrayView4<u8>, ArrayView1<u8>) {
        (
            self.images.slice(s![self.train_len.., .., .., ..]),
            self.classes.slice(s![self.train_len..]),
        )
    }
}

fn open_idx(dir: &Path, name: &str) -> Result<Box<dyn Read>> {
    let gz_path = dir.join(name).with_extension("gz");
    if gz_path.exists() {
        let file = File::open(&gz_path).with_context(|| format!("Opening {gz_path:?}"))?;
        return Ok(Box::new(GzDecoder::new(BufReader::new(file))));
    }
    let path: PathBuf = dir.join(name);
    let file = File::open(&path).with_context(|| format!("Opening {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Reads an IDX file, returning the data and the number of items.
fn read_idx(dir: &Path, name: &str, image: bool) -> Result<(Vec<u8>, usize)> {
    let mut reader = open_idx(dir, name)?;
    let magic = if image { IMAGE_MAGIC } else { LABEL_MAGIC };
    let found = reader.read_i32::<BigEndian>()?;
    ensure!(found == magic, "{name}: magic number {found} != {magic}");
    let n = reader.read_i32::<BigEndian>()?;
    ensure!(n >= 0, "{name}: negative item count {n}");
    let n = n as usize;
    let item_len = if image {
        for _ in 0..2 {
            let side = reader.read_i32::<BigEndian>()?;
            ensure!(side == SIDE as i32, "{name}: image side {side} != {SIDE}");
        }
        SIDE * SIDE
    } else {
        1
    };
    let len = n
        .checked_mul(item_len)
        .with_context(|| format!("{name}: item count {n} is too large"))?;
    // The header is untrusted, read at most one byte past the expected length.
    let mut data = Vec::new();
    reader.take(len as u64 + 1).read_to_end(&mut data)?;
    ensure!(
        data.len() == len,
        "{name}: expected {len} bytes, found {}",
        data.len()
    );
    Ok((data, n))
}
