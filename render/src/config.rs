use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    /// Width of rendered images in pixels.
    pub width: u32,
    /// Height of rendered images in pixels.
    pub height: u32,
    /// Color behind the geometry.
    pub background: Vec3,
    /// Color of the selected object, or of its outline.
    pub highlight: Vec3,
    /// Vertical field of view in degrees for object-centred views.
    pub vertical_fov_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Side of the square drawn for every point, in pixels.
    pub point_size: u32,
    /// Points sampled along each outline edge when exporting a scene.
    pub outline_samples: usize,
    /// Points sampled on each camera marker sphere.
    pub marker_points: usize,
    /// Ring radius used when cameras face away from the scene.
    pub outward_radius: f32,
    /// Distance factor applied to `outward_radius`.
    pub outward_distance_factor: f32,
    /// Vertical field of view in degrees when cameras face away from the scene.
    pub outward_fov_deg: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background: Vec3::splat(0.8),
            highlight: Vec3::new(1.0, 0.0, 0.0),
            vertical_fov_deg: 60.0,
            near: 0.1,
            far: 1000.0,
            point_size: 2,
            outline_samples: 20,
            marker_points: 500,
            outward_radius: 0.5,
            outward_distance_factor: 0.1,
            outward_fov_deg: 90.0,
        }
    }
}

impl ViewConfig {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
