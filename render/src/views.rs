use std::fs;
use std::path::{Path, PathBuf};

use scene::{ColorNaming, Mask, PlyFormat, PointCloud};
use tracing::{debug, info};

use crate::camera::{CameraPose, Projection};
use crate::config::ViewConfig;
use crate::error::{RenderError, Result};
use crate::highlight::{MARKER_COLOR, MaskMode, apply_mask_mode, camera_markers};
use crate::placement::{Placement, default_height, object_center_and_radius, place_cameras};
use crate::raster::{Geometry, Rasterizer};

pub const SCENE_FILE: &str = "scene_with_camera_markers.ply";

/// How cameras are arranged for a view set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Framing {
    /// Ring around the selected object, looking at it.
    Orbit { distance_factor: f32, count: usize },
    /// Ring near the scene center, looking away from it. The number of views
    /// follows from the field of view and the overlap between neighbours.
    Outward { overlap_ratio: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    pub obj_id: u32,
    pub mode: MaskMode,
    pub framing: Framing,
    /// Camera height. Defaults to a fixed offset above the lowest point.
    pub height: Option<f32>,
    /// Overrides the configured vertical field of view for orbit views.
    pub vertical_fov_deg: Option<f32>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ViewSet {
    pub image_paths: Vec<PathBuf>,
    pub scene_path: PathBuf,
    pub cameras: Vec<CameraPose>,
}

pub fn view_file_name(idx: usize) -> String {
    format!("view_{idx:03}.png")
}

/// Renders one object of `mask` from a ring of cameras.
///
/// Writes the highlighted scene together with camera markers as a PLY file
/// and one PNG per camera into `request.output_dir`.
pub fn render_views(cloud: &PointCloud, mask: &Mask, request: &ViewRequest, config: &ViewConfig) -> Result<ViewSet> {
    mask.ensure_len(cloud.len())?;
    let object = mask.object(request.obj_id);
    let positions = cloud.positions();

    let highlight = apply_mask_mode(&object, positions, cloud.colors(), request.mode, config.highlight)?;
    let height = request.height.unwrap_or_else(|| default_height(positions));

    let (placement, bounding_radius, vertical_fov_deg) = match request.framing {
        Framing::Orbit { distance_factor, count } => {
            let (center, bounding_radius) = object_center_and_radius(&object, positions)?;
            let placement = Placement::Orbit {
                center,
                bounding_radius,
                distance_factor,
                count,
                height,
            };
            let fov = request.vertical_fov_deg.unwrap_or(config.vertical_fov_deg);
            (placement, bounding_radius, fov)
        }
        Framing::Outward { overlap_ratio } => {
            let scene_center = cloud
                .centroid()
                .ok_or_else(|| RenderError::Placement("the point cloud is empty".into()))?;
            let placement = Placement::Outward {
                scene_center,
                bounding_radius: config.outward_radius,
                distance_factor: config.outward_distance_factor,
                vertical_fov_deg: config.outward_fov_deg,
                aspect: config.aspect(),
                overlap_ratio,
                height,
            };
            (placement, config.outward_radius, config.outward_fov_deg)
        }
    };
    let cameras = place_cameras(&placement)?;
    info!(
        "Rendering {} views of object {} ({} mode) into {}",
        cameras.len(),
        request.obj_id,
        request.mode,
        request.output_dir.display()
    );

    fs::create_dir_all(&request.output_dir)?;

    let mut exported = PointCloud::new(positions.to_vec(), highlight.colors.clone())?;
    if let Some(outline) = &highlight.outline {
        exported.append_points(&outline.sample(config.outline_samples), outline.color);
    }
    let eyes: Vec<_> = cameras.iter().map(|c| c.eye).collect();
    exported.append_points(
        &camera_markers(&eyes, bounding_radius, config.marker_points),
        MARKER_COLOR,
    );
    let scene_path = request.output_dir.join(SCENE_FILE);
    exported.save_ply(&scene_path, PlyFormat::BinaryLittleEndian, ColorNaming::Standard)?;
    debug!("Saved scene with camera markers to {}", scene_path.display());

    let rasterizer = Rasterizer::new(config);
    let projection = Projection {
        vertical_fov_deg,
        aspect: config.aspect(),
        near: config.near,
        far: config.far,
    };
    let geometry = Geometry {
        positions,
        colors: &highlight.colors,
        triangles: cloud.triangles(),
        outline: highlight.outline.as_ref(),
    };

    let mut image_paths = Vec::with_capacity(cameras.len());
    for (idx, pose) in cameras.iter().enumerate() {
        let path = request.output_dir.join(view_file_name(idx));
        save_view(&rasterizer, &geometry, pose, &projection, &path)?;
        debug!("Saved view {idx} to {}", path.display());
        image_paths.push(path);
    }

    Ok(ViewSet {
        image_paths,
        scene_path,
        cameras,
    })
}

fn save_view(
    rasterizer: &Rasterizer,
    geometry: &Geometry<'_>,
    pose: &CameraPose,
    projection: &Projection,
    path: &Path,
) -> Result<()> {
    rasterizer.render(geometry, pose, projection).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use scene::SceneError;

    use super::*;

    fn small_config() -> ViewConfig {
        ViewConfig {
            width: 32,
            height: 24,
            marker_points: 10,
            ..ViewConfig::default()
        }
    }

    fn grid_cloud() -> (PointCloud, Mask) {
        let mut positions = Vec::new();
        let mut labels = Vec::new();
        for x in 0..6 {
            for y in 0..6 {
                positions.push(Vec3::new(x as f32, y as f32, 0.0));
                positions.push(Vec3::new(x as f32, y as f32, 1.0));
                let inside = (2..4).contains(&x) && (2..4).contains(&y);
                labels.push(u32::from(inside));
                labels.push(u32::from(inside));
            }
        }
        (
            PointCloud::with_fill_color(positions, scene::DEFAULT_FILL),
            Mask::from_labels(labels),
        )
    }

    fn request(dir: &Path, mode: MaskMode, framing: Framing) -> ViewRequest {
        ViewRequest {
            obj_id: 1,
            mode,
            framing,
            height: None,
            vertical_fov_deg: None,
            output_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn orbit_views_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let (cloud, mask) = grid_cloud();
        let config = small_config();
        let framing = Framing::Orbit {
            distance_factor: 2.0,
            count: 3,
        };

        let views = render_views(&cloud, &mask, &request(dir.path(), MaskMode::Full, framing), &config).unwrap();

        assert_eq!(views.image_paths.len(), 3);
        assert_eq!(views.image_paths[2], dir.path().join("view_002.png"));
        for path in &views.image_paths {
            let image = image::open(path).unwrap();
            assert_eq!((image.width(), image.height()), (32, 24));
        }
        for pose in &views.cameras {
            assert!((pose.eye.z - 1.5).abs() < 1e-5);
        }

        let exported = PointCloud::load(&views.scene_path).unwrap();
        assert_eq!(exported.len(), cloud.len() + 3 * 10);
        assert_eq!(exported.colors()[2 * (2 * 6 + 2)], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn outline_samples_are_exported() {
        let dir = tempfile::tempdir().unwrap();
        let (cloud, mask) = grid_cloud();
        let framing = Framing::Orbit {
            distance_factor: 2.0,
            count: 2,
        };
        let views =
            render_views(&cloud, &mask, &request(dir.path(), MaskMode::Outline, framing), &small_config()).unwrap();

        let exported = PointCloud::load(&views.scene_path).unwrap();
        let extra = exported.len() - cloud.len() - 2 * 10;
        assert!(extra > 0);
        assert_eq!(extra % 20, 0);
    }

    #[test]
    fn outward_views_need_no_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (cloud, _) = grid_cloud();
        let mask = Mask::zeros(cloud.len());
        let mut req = request(dir.path(), MaskMode::Full, Framing::Outward { overlap_ratio: 0.2 });
        req.height = Some(0.5);

        let views = render_views(&cloud, &mask, &req, &small_config()).unwrap();
        // 90 degree vertical fov at 32x24 covers about 106 degrees horizontally.
        assert_eq!(views.image_paths.len(), 5);
        assert!(views.scene_path.exists());
    }

    #[test]
    fn orbit_requires_selection() {
        let dir = tempfile::tempdir().unwrap();
        let (cloud, _) = grid_cloud();
        let mask = Mask::zeros(cloud.len());
        let framing = Framing::Orbit {
            distance_factor: 2.0,
            count: 4,
        };
        let result = render_views(&cloud, &mask, &request(dir.path(), MaskMode::Full, framing), &small_config());
        assert!(matches!(result, Err(RenderError::EmptySelection)));
    }

    #[test]
    fn mask_length_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let (cloud, _) = grid_cloud();
        let mask = Mask::zeros(3);
        let framing = Framing::Outward { overlap_ratio: 0.2 };
        let result = render_views(&cloud, &mask, &request(dir.path(), MaskMode::Full, framing), &small_config());
        assert!(matches!(result, Err(RenderError::Scene(SceneError::MaskLength { .. }))));
    }
}
