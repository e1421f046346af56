//! Per-point label arrays in `.npy` files, the format the segmentation
//! tooling reads and writes. Any one-dimensional integer or boolean array is
//! accepted. Labels are written as `int64`.

use std::path::Path;

use ndarray::Array1;
use ndarray_npy::{ReadNpyError, ReadableElement, read_npy, write_npy};

use crate::error::{Result, SceneError};

type Attempt = std::result::Result<Result<Vec<u32>>, ReadNpyError>;

pub(crate) fn signed_label(label: i64) -> Result<u32> {
    if label < 0 {
        return Err(SceneError::NegativeLabel(label));
    }
    u32::try_from(label).map_err(|_| SceneError::LabelOutOfRange(label as u64))
}

fn unsigned_label(label: u64) -> Result<u32> {
    u32::try_from(label).map_err(|_| SceneError::LabelOutOfRange(label))
}

fn signed<T: ReadableElement + Into<i64>>(path: &Path) -> Attempt {
    let array: Array1<T> = read_npy(path)?;
    Ok(array.into_iter().map(|l| signed_label(l.into())).collect())
}

fn unsigned<T: ReadableElement + Into<u64>>(path: &Path) -> Attempt {
    let array: Array1<T> = read_npy(path)?;
    Ok(array.into_iter().map(|l| unsigned_label(l.into())).collect())
}

fn flags(path: &Path) -> Attempt {
    let array: Array1<bool> = read_npy(path)?;
    Ok(Ok(array.into_iter().map(u32::from).collect()))
}

const READERS: [fn(&Path) -> Attempt; 9] = [
    signed::<i64>,
    signed::<i32>,
    signed::<i16>,
    signed::<i8>,
    unsigned::<u64>,
    unsigned::<u32>,
    unsigned::<u16>,
    unsigned::<u8>,
    flags,
];

/// Reads a label array, trying each supported dtype in turn.
pub fn read_labels(path: &Path) -> Result<Vec<u32>> {
    std::fs::metadata(path)?;
    for reader in READERS {
        match reader(path) {
            Ok(labels) => return labels,
            Err(ReadNpyError::WrongDescriptor(_)) => continue,
            Err(err) => return Err(SceneError::Npy(err.to_string())),
        }
    }
    Err(SceneError::Npy(format!(
        "{} does not hold integer or boolean labels",
        path.display()
    )))
}

pub fn write_labels(path: &Path, labels: &[u32]) -> Result<()> {
    let array: Array1<i64> = labels.iter().map(|&l| i64::from(l)).collect();
    write_npy(path, &array)?;
    Ok(())
}
