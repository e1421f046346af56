use std::fs;
use std::io::BufWriter;
use std::path::Path;
use glam::Vec3;
use tracing::info;
use crate::error::{Result, SceneError};
use crate::mask::ObjectMask;
use crate::ply::{self, ColorNaming, PlyFormat};

/// Color given to points whose source file carries none.
pub const DEFAULT_FILL: Vec3 = Vec3::splat(0.5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Points with a parallel list of RGB colors in `[0, 1]`.
///
/// When `triangles` is set the geometry came from a triangle mesh and the
/// positions are its vertices. The constructor guarantees that there is
/// exactly one color per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
    triangles: Option<Vec<[u32; 3]>>,
}

impl PointCloud {
    pub fn new(positions: Vec<Vec3>, colors: Vec<Vec3>) -> Result<Self> {
        if positions.len() != colors.len() {
            return Err(SceneError::ColorCount {
                positions: positions.len(),
                colors: colors.len(),
            });
        }
        Ok(Self {
            positions,
            colors,
            triangles: None,
        })
    }

    pub fn with_fill_color(positions: Vec<Vec3>, fill: Vec3) -> Self {
        let colors = vec![fill; positions.len()];
        Self {
            positions,
            colors,
            triangles: None,
        }
    }

    pub fn with_triangles(mut self, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let count = self.positions.len();
        if let Some(&index) = triangles.iter().flatten().find(|&&i| i as usize >= count) {
            return Err(SceneError::TriangleIndex { index, count });
        }
        self.triangles = Some(triangles);
        Ok(self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let is_ply = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));
        if !is_ply {
            return Err(SceneError::UnsupportedFormat(path.display().to_string()));
        }

        let bytes = fs::read(path)?;
        let cloud = ply::read(&bytes)?;
        info!(
            "Loaded {} with {} points (mesh: {})",
            path.display(),
            cloud.len(),
            cloud.is_mesh()
        );
        Ok(cloud)
    }

    pub fn save_ply(&self, path: &Path, format: PlyFormat, naming: ColorNaming) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(fs::File::create(path)?);
        ply::write(self, format, naming, &mut out)?;
        Ok(())
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn triangles(&self) -> Option<&[[u32; 3]]> {
        self.triangles.as_deref()
    }

    pub fn set_colors(&mut self, colors: Vec<Vec3>) -> Result<()> {
        if colors.len() != self.positions.len() {
            return Err(SceneError::ColorCount {
                positions: self.positions.len(),
                colors: colors.len(),
            });
        }
        self.colors = colors;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_mesh(&self) -> bool {
        self.triangles.is_some()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.positions)
    }

    pub fn centroid(&self) -> Option<Vec3> {
        centroid(&self.positions)
    }

    /// Lowest and highest z of the geometry.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.bounds().map(|b| (b.min.z, b.max.z))
    }

    pub fn select(&self, mask: &ObjectMask) -> Vec<Vec3> {
        mask.indices().map(|i| self.positions[i]).collect()
    }

    /// Drops the mesh topology, keeping vertices and colors.
    pub fn to_point_cloud(&self) -> PointCloud {
        Self {
            positions: self.positions.clone(),
            colors: self.colors.clone(),
            triangles: None,
        }
    }

    /// Appends points that all share one color. Mesh topology is kept, the new
    /// points are unreferenced by any triangle.
    pub fn append_points(&mut self, positions: &[Vec3], color: Vec3) {
        self.positions.extend_from_slice(positions);
        self.colors.extend(std::iter::repeat_n(color, positions.len()));
    }
}

pub fn centroid(points: &[Vec3]) -> Option<Vec3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::ZERO, |acc, p| acc + *p);
    Some(sum / points.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_color_count_mismatch() {
        let result = PointCloud::new(vec![Vec3::ZERO, Vec3::ONE], vec![Vec3::ONE]);
        assert!(matches!(
            result,
            Err(SceneError::ColorCount { positions: 2, colors: 1 })
        ));
    }

    #[test]
    fn rejects_out_of_range_triangles() {
        let cloud = PointCloud::with_fill_color(vec![Vec3::ZERO, Vec3::X, Vec3::Y], DEFAULT_FILL);
        assert!(cloud.clone().with_triangles(vec![[0, 1, 2]]).is_ok());
        assert!(matches!(
            cloud.with_triangles(vec![[0, 1, 3]]),
            Err(SceneError::TriangleIndex { index: 3, count: 3 })
        ));
    }

    #[test]
    fn bounds_and_centroid() {
        let cloud = PointCloud::with_fill_color(
            vec![Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, -2.0)],
            DEFAULT_FILL,
        );
        let bounds = cloud.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 4.0, 2.0));
        assert_eq!(cloud.centroid().unwrap(), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(cloud.height_range(), Some((-2.0, 2.0)));
        assert!(PointCloud::default().bounds().is_none());
    }

    #[test]
    fn append_keeps_colors_parallel() {
        let mut cloud = PointCloud::with_fill_color(vec![Vec3::ZERO], DEFAULT_FILL);
        cloud.append_points(&[Vec3::X, Vec3::Y], Vec3::Y);
        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud.colors().len(), 3);
        assert_eq!(cloud.colors()[2], Vec3::Y);
    }

    #[test]
    fn load_rejects_other_extensions() {
        let result = PointCloud::load(Path::new("scan.obj"));
        assert!(matches!(result, Err(SceneError::UnsupportedFormat(_))));
    }
}
