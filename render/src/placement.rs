use std::f32::consts::TAU;

use glam::Vec3;
use scene::{ObjectMask, centroid};
use tracing::debug;

use crate::camera::{CameraPose, horizontal_fov_deg};
use crate::error::{RenderError, Result};

/// Height above the lowest point used when none is requested.
pub const DEFAULT_HEIGHT_OFFSET: f32 = 1.5;

/// Most cameras a single ring may hold.
pub const MAX_VIEWS: usize = 360;

/// Mean of the selected points and the largest distance from it to any of them.
pub fn object_center_and_radius(mask: &ObjectMask, positions: &[Vec3]) -> Result<(Vec3, f32)> {
    let selected: Vec<Vec3> = mask.indices().map(|i| positions[i]).collect();
    let center = centroid(&selected).ok_or(RenderError::EmptySelection)?;
    let radius = selected
        .iter()
        .map(|p| p.distance(center))
        .fold(0.0_f32, f32::max);
    Ok((center, radius))
}

pub fn default_height(positions: &[Vec3]) -> f32 {
    let min_z = positions.iter().map(|p| p.z).fold(f32::INFINITY, f32::min);
    if min_z.is_finite() {
        min_z + DEFAULT_HEIGHT_OFFSET
    } else {
        DEFAULT_HEIGHT_OFFSET
    }
}

/// Number of views needed to cover a full turn with the given overlap between
/// neighbours.
pub fn outward_count(vertical_fov_deg: f32, aspect: f32, overlap_ratio: f32) -> Result<usize> {
    if !(0.0..1.0).contains(&overlap_ratio) {
        return Err(RenderError::Placement(format!(
            "overlap ratio must be in [0, 1), got {overlap_ratio}"
        )));
    }
    let hfov = horizontal_fov_deg(vertical_fov_deg, aspect);
    if hfov.is_nan() || hfov <= 0.0 {
        return Err(RenderError::Placement(format!(
            "field of view must be positive, got {vertical_fov_deg}"
        )));
    }
    let step = hfov * (1.0 - overlap_ratio);
    let count = (360.0 / step).ceil();
    if !(count <= MAX_VIEWS as f32) {
        return Err(RenderError::Placement(format!(
            "overlap {overlap_ratio} needs {count} views, at most {MAX_VIEWS} are allowed"
        )));
    }
    Ok(count as usize)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Cameras on a ring around an object, all looking at its center.
    Orbit {
        center: Vec3,
        bounding_radius: f32,
        distance_factor: f32,
        count: usize,
        height: f32,
    },
    /// Cameras on a ring around the scene center, each looking away from it.
    Outward {
        scene_center: Vec3,
        bounding_radius: f32,
        distance_factor: f32,
        vertical_fov_deg: f32,
        aspect: f32,
        overlap_ratio: f32,
        height: f32,
    },
}

fn ring(center: Vec3, radius: f32, count: usize, height: f32) -> Vec<Vec3> {
    (0..count)
        .map(|i| {
            let angle = TAU * i as f32 / count as f32;
            Vec3::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
                height,
            )
        })
        .collect()
}

pub fn place_cameras(placement: &Placement) -> Result<Vec<CameraPose>> {
    let poses: Vec<CameraPose> = match *placement {
        Placement::Orbit {
            center,
            bounding_radius,
            distance_factor,
            count,
            height,
        } => {
            if count == 0 || count > MAX_VIEWS {
                return Err(RenderError::Placement(format!(
                    "camera count must be between 1 and {MAX_VIEWS}, got {count}"
                )));
            }
            ring(center, bounding_radius * distance_factor, count, height)
                .into_iter()
                .map(|eye| CameraPose::look_at(eye, center))
                .collect()
        }
        Placement::Outward {
            scene_center,
            bounding_radius,
            distance_factor,
            vertical_fov_deg,
            aspect,
            overlap_ratio,
            height,
        } => {
            let count = outward_count(vertical_fov_deg, aspect, overlap_ratio)?;
            let center = Vec3::new(scene_center.x, scene_center.y, height);
            ring(center, bounding_radius * distance_factor, count, height)
                .into_iter()
                .map(|eye| CameraPose::outward(eye, center))
                .collect()
        }
    };
    debug!("Placed {} cameras", poses.len());
    Ok(poses)
}
