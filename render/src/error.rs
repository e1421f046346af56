use scene::SceneError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("mask_mode must be 'outline' or 'full', got '{0}'")]
    MaskMode(String),

    #[error("The mask did not select any points.")]
    EmptySelection,

    #[error("Invalid camera placement: {0}")]
    Placement(String),

    #[error("No free cell in the occupancy grid at the requested height")]
    NoFreeSpace,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),
}
