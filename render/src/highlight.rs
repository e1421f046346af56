use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use parry3d::math::Vector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene::ObjectMask;
use tracing::warn;

use crate::error::{RenderError, Result};

pub const MARKER_COLOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskMode {
    #[default]
    Outline,
    Full,
}

impl FromStr for MaskMode {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "outline" => Ok(Self::Outline),
            "full" => Ok(Self::Full),
            other => Err(RenderError::MaskMode(other.to_string())),
        }
    }
}

impl fmt::Display for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outline => f.write_str("outline"),
            Self::Full => f.write_str("full"),
        }
    }
}

/// Line segments drawn around a selected object.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub points: Vec<Vec3>,
    pub lines: Vec<[u32; 2]>,
    pub color: Vec3,
}

impl Outline {
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        self.lines
            .iter()
            .map(|[a, b]| (self.points[*a as usize], self.points[*b as usize]))
    }

    /// `per_line` evenly spaced points on every segment, endpoints included.
    pub fn sample(&self, per_line: usize) -> Vec<Vec3> {
        let mut samples = Vec::with_capacity(self.lines.len() * per_line);
        for (start, end) in self.segments() {
            for i in 0..per_line {
                let t = if per_line > 1 {
                    i as f32 / (per_line - 1) as f32
                } else {
                    0.0
                };
                samples.push(start.lerp(end, t));
            }
        }
        samples
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub colors: Vec<Vec3>,
    pub outline: Option<Outline>,
}

/// Recolors the selection in full mode, or computes an outline of it.
pub fn apply_mask_mode(
    mask: &ObjectMask,
    positions: &[Vec3],
    colors: &[Vec3],
    mode: MaskMode,
    highlight: Vec3,
) -> Result<Highlight> {
    let mut colors = colors.to_vec();
    match mode {
        MaskMode::Full => {
            for i in mask.indices() {
                colors[i] = highlight;
            }
            Ok(Highlight {
                colors,
                outline: None,
            })
        }
        MaskMode::Outline => {
            if !mask.any() {
                return Err(RenderError::EmptySelection);
            }
            let selected: Vec<Vec3> = mask.indices().map(|i| positions[i]).collect();
            Ok(Highlight {
                colors,
                outline: Some(convex_outline(&selected, highlight)),
            })
        }
    }
}

/// Edges of the convex hull of `points`. Inputs too small or too flat for a
/// hull are joined as a polyline instead.
pub fn convex_outline(points: &[Vec3], color: Vec3) -> Outline {
    let polyline = || Outline {
        points: points.to_vec(),
        lines: (1..points.len() as u32).map(|i| [i - 1, i]).collect(),
        color,
    };
    if points.len() < 4 {
        return polyline();
    }

    let input: Vec<Vector> = points.iter().map(|p| Vector::new(p.x, p.y, p.z)).collect();
    let (vertices, triangles) = match parry3d::transformation::try_convex_hull(&input) {
        Ok(hull) => hull,
        Err(err) => {
            warn!("Convex hull failed ({err:?}), outlining with a polyline");
            return polyline();
        }
    };
    if triangles.is_empty() {
        return polyline();
    }

    let mut edges = BTreeSet::new();
    for [a, b, c] in triangles {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            edges.insert([u.min(v), u.max(v)]);
        }
    }
    Outline {
        points: vertices.iter().map(|p| Vec3::new(p.x, p.y, p.z)).collect(),
        lines: edges.into_iter().collect(),
        color,
    }
}

/// Green points sampled on a small sphere around every camera.
pub fn camera_markers(cameras: &[Vec3], bounding_radius: f32, per_camera: usize) -> Vec<Vec3> {
    let radius = if bounding_radius > 0.0 {
        bounding_radius * 0.1
    } else {
        0.1
    };
    let mut rng = StdRng::seed_from_u64(0);
    let mut markers = Vec::with_capacity(cameras.len() * per_camera);
    for eye in cameras {
        for _ in 0..per_camera {
            let z: f32 = rng.random_range(-1.0..=1.0);
            let phi: f32 = rng.random_range(0.0..std::f32::consts::TAU);
            let ring = (1.0 - z * z).max(0.0).sqrt();
            markers.push(*eye + radius * Vec3::new(ring * phi.cos(), ring * phi.sin(), z));
        }
    }
    markers
}

/// Distinct color for an object label. Background stays grey.
pub fn label_color(label: u32) -> Vec3 {
    const PALETTE: [[f32; 3]; 10] = [
        [0.90, 0.10, 0.10],
        [0.10, 0.60, 0.90],
        [0.20, 0.80, 0.20],
        [0.95, 0.70, 0.10],
        [0.60, 0.30, 0.80],
        [0.10, 0.80, 0.70],
        [0.95, 0.40, 0.60],
        [0.50, 0.50, 0.10],
        [0.30, 0.30, 0.90],
        [0.90, 0.50, 0.20],
    ];
    if label == 0 {
        return scene::DEFAULT_FILL;
    }
    Vec3::from_array(PALETTE[(label as usize - 1) % PALETTE.len()])
}
