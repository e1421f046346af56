pub mod camera;
pub mod highlight;
pub mod occupancy;
pub mod placement;
pub mod raster;

mod config;
mod error;
mod views;

pub use config::ViewConfig;
pub use error::{RenderError, Result};
pub use highlight::MaskMode;
pub use views::{Framing, SCENE_FILE, ViewRequest, ViewSet, render_views, view_file_name};
