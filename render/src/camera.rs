use glam::{Mat4, Vec3};

/// Where a camera sits and what it looks at. Up is +Z unless the view
/// direction is vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl CameraPose {
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        Self { eye, target, up: Vec3::Z }
    }

    /// Looks through `eye` directly away from `center`.
    pub fn outward(eye: Vec3, center: Vec3) -> Self {
        Self::look_at(eye, 2.0 * eye - center)
    }

    pub fn direction(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        let dir = self.direction();
        let up = if dir.cross(self.up).length_squared() < 1e-12 {
            Vec3::Y
        } else {
            self.up
        };
        let target = if dir == Vec3::ZERO { self.eye - Vec3::Z } else { self.target };
        Mat4::look_at_rh(self.eye, target, up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub vertical_fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.vertical_fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn horizontal_fov_deg(&self) -> f32 {
        horizontal_fov_deg(self.vertical_fov_deg, self.aspect)
    }
}

/// Pinhole relation between vertical and horizontal field of view.
pub fn horizontal_fov_deg(vertical_fov_deg: f32, aspect: f32) -> f32 {
    let half = (vertical_fov_deg.to_radians() / 2.0).tan() * aspect;
    (2.0 * half.atan()).to_degrees()
}
