mod click;
mod cloud;
mod error;
mod mask;
mod nearest;
pub mod npy;
pub mod ply;

pub use click::{Click, ClickSet};
pub use cloud::{Bounds, DEFAULT_FILL, PointCloud, centroid};
pub use error::{Result, SceneError};
pub use mask::{Mask, ObjectMask};
pub use nearest::{NearestIndex, filter_outliers};
pub use ply::{ColorNaming, PlyFormat};
