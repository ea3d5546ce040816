#![cfg(feature = "mnist")]

use byteorder::{BigEndian, WriteBytesExt};
use flate2::{write::GzEncoder, Compression};
use permutation_invariance::{
    dataset::mnist::{Mnist, MnistKind},
    result::Result,
};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

fn idx_bytes(magic: i32, n: usize, image: bool, data: &[u8]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes.write_i32::<BigEndian>(magic)?;
    bytes.write_i32::<BigEndian>(n as i32)?;
    if image {
        bytes.write_i32::<BigEndian>(28)?;
        bytes.write_i32::<BigEndian>(28)?;
    }
    bytes.extend_from_slice(data);
    Ok(bytes)
}

fn write_file(dir: &Path, name: &str, bytes: &[u8], gz: bool) -> Result<()> {
    if gz {
        let file = File::create(dir.join(name).with_extension("gz"))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?;
    } else {
        fs::write(dir.join(name), bytes)?;
    }
    Ok(())
}

fn write_dataset(dir: &Path, train: usize, test: usize, gz: bool) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (prefix, n, offset) in [("train", train, 0), ("t10k", test, train)] {
        let images: Vec<u8> = (0..n)
            .flat_map(|i| std::iter::repeat((offset + i) as u8).take(28 * 28))
            .collect();
        let labels: Vec<u8> = (0..n).map(|i| ((offset + i) % 10) as u8).collect();
        write_file(
            dir,
            &format!("{prefix}-images-idx3-ubyte"),
            &idx_bytes(2_051, n, true, &images)?,
            gz,
        )?;
        write_file(
            dir,
            &format!("{prefix}-labels-idx1-ubyte"),
            &idx_bytes(2_049, n, false, &labels)?,
            gz,
        )?;
    }
    Ok(())
}

#[test]
fn load_gz() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_dataset(&dir.path().join("mnist"), 6, 3, true)?;
    let mnist = Mnist::builder().path(dir.path()).build()?;
    assert_eq!(mnist.kind(), MnistKind::Digits);
    assert_eq!(mnist.images().shape(), &[9, 1, 28, 28]);
    assert_eq!(mnist.classes().len(), 9);
    let (train_images, train_classes) = mnist.train();
    assert_eq!(train_images.shape(), &[6, 1, 28, 28]);
    assert_eq!(train_classes.to_vec(), vec![0, 1, 2, 3, 4, 5]);
    let (test_images, test_classes) = mnist.test();
    assert_eq!(test_images.shape(), &[3, 1, 28, 28]);
    assert!(test_images
        .outer_iter()
        .zip(6u8..)
        .all(|(image, i)| image.iter().all(|x| *x == i)));
    assert_eq!(test_classes.to_vec(), vec![6, 7, 8]);
    Ok(())
}

#[test]
fn load_uncompressed_fashion() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_dataset(&dir.path().join("fashion-mnist"), 2, 2, false)?;
    let mnist = Mnist::builder()
        .path(dir.path())
        .kind(MnistKind::Fashion)
        .build()?;
    assert_eq!(mnist.kind(), MnistKind::Fashion);
    assert_eq!(mnist.images().shape(), &[4, 1, 28, 28]);
    assert_eq!(MnistKind::Fashion.class_names()[9], "Ankle boot");
    Ok(())
}

#[test]
fn missing_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(Mnist::builder().path(dir.path()).build().is_err());
    Ok(())
}

#[test]
fn bad_magic() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mnist_dir = dir.path().join("mnist");
    write_dataset(&mnist_dir, 2, 1, true)?;
    write_file(
        &mnist_dir,
        "t10k-labels-idx1-ubyte",
        &idx_bytes(2_051, 1, false, &[0])?,
        true,
    )?;
    assert!(Mnist::builder().path(dir.path()).build().is_err());
    Ok(())
}

#[test]
fn truncated_images() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mnist_dir = dir.path().join("mnist");
    write_dataset(&mnist_dir, 2, 1, false)?;
    write_file(
        &mnist_dir,
        "train-images-idx3-ubyte",
        &idx_bytes(2_051, 2, true, &[0; 28 * 28])?,
        false,
    )?;
    assert!(Mnist::builder().path(dir.path()).build().is_err());
    Ok(())
}

#[test]
fn invalid_class() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mnist_dir = dir.path().join("mnist");
    write_dataset(&mnist_dir, 1, 1, false)?;
    write_file(
        &mnist_dir,
        "t10k-labels-idx1-ubyte",
        &idx_bytes(2_049, 1, false, &[10])?,
        false,
    )?;
    assert!(Mnist::builder().path(dir.path()).build().is_err());
    Ok(())
}

#[test]
fn oversized_count() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mnist_dir = dir.path().join("mnist");
    write_dataset(&mnist_dir, 2, 1, false)?;
    write_file(
        &mnist_dir,
        "train-images-idx3-ubyte",
        &idx_bytes(2_051, i32::MAX as usize, true, &[0; 28 * 28])?,
        false,
    )?;
    let error = match Mnist::builder().path(dir.path()).build() {
        Ok(_) => panic!("loaded an oversized count"),
        Err(error) => error,
    };
    assert!(error.to_string().contains("found 784"), "{error}");
    Ok(())
}
