use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("File IO error: {0}")]
    File(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed PLY: {0}")]
    Ply(String),

    #[error("Malformed NPY: {0}")]
    Npy(String),

    #[error("Failed to write NPY: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("Coordinate count {positions} does not match color count {colors}")]
    ColorCount { positions: usize, colors: usize },

    #[error("Mask length {mask} does not match number of points in the geometry ({points})")]
    MaskLength { mask: usize, points: usize },

    #[error("Mask labels must be non-negative, found {0}")]
    NegativeLabel(i64),

    #[error("Mask label {0} is out of range")]
    LabelOutOfRange(u64),

    #[error("Triangle references vertex {index} but the geometry has {count} vertices")]
    TriangleIndex { index: u32, count: usize },
}
