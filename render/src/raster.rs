//! Unlit software rasterizer for point clouds, meshes and outlines.
//!
//! Geometry is projected with a right-handed look-at view and an OpenGL style
//! perspective, so depth in normalized device coordinates grows away from the
//! camera. Every primitive is depth tested against a per-pixel buffer.

use glam::{Mat4, Vec3};
use image::{Rgb, RgbImage};
use scene::ply::quantize;

use crate::camera::{CameraPose, Projection};
use crate::config::ViewConfig;
use crate::highlight::Outline;

/// What gets drawn into a view.
#[derive(Debug, Clone, Copy)]
pub struct Geometry<'a> {
    pub positions: &'a [Vec3],
    pub colors: &'a [Vec3],
    /// Drawn instead of the bare points when present.
    pub triangles: Option<&'a [[u32; 3]]>,
    pub outline: Option<&'a Outline>,
}

#[derive(Debug, Clone, Copy)]
struct ScreenPoint {
    x: f32,
    y: f32,
    depth: f32,
}

struct Frame {
    width: usize,
    height: usize,
    color: Vec<Vec3>,
    depth: Vec<f32>,
}

impl Frame {
    fn new(width: u32, height: u32, background: Vec3) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self {
            width,
            height,
            color: vec![background; width * height],
            depth: vec![f32::INFINITY; width * height],
        }
    }

    fn plot(&mut self, x: i64, y: i64, depth: f32, color: Vec3) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = y as usize * self.width + x as usize;
        if depth < self.depth[i] {
            self.depth[i] = depth;
            self.color[i] = color;
        }
    }

    fn splat(&mut self, p: ScreenPoint, size: u32, color: Vec3) {
        let half = size.max(1) as f32 / 2.0;
        let (x0, x1) = ((p.x - half).floor() as i64, (p.x + half).ceil() as i64 - 1);
        let (y0, y1) = ((p.y - half).floor() as i64, (p.y + half).ceil() as i64 - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.plot(x, y, p.depth, color);
            }
        }
    }

    fn fill_triangle(&mut self, v: [ScreenPoint; 3], c: [Vec3; 3]) {
        let edge = |a: ScreenPoint, b: ScreenPoint, x: f32, y: f32| {
            (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
        };
        let area = edge(v[0], v[1], v[2].x, v[2].y);
        if area.abs() < f32::EPSILON {
            return;
        }

        let min_x = v.iter().map(|p| p.x).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
        let min_y = v.iter().map(|p| p.y).fold(f32::INFINITY, f32::min).floor().max(0.0) as usize;
        let max_x = v.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max).ceil();
        let max_y = v.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max).ceil();
        let max_x = (max_x.max(0.0) as usize).min(self.width);
        let max_y = (max_y.max(0.0) as usize).min(self.height);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(v[1], v[2], px, py) / area;
                let w1 = edge(v[2], v[0], px, py) / area;
                let w2 = edge(v[0], v[1], px, py) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * v[0].depth + w1 * v[1].depth + w2 * v[2].depth;
                let color = w0 * c[0] + w1 * c[1] + w2 * c[2];
                self.plot(x as i64, y as i64, depth, color);
            }
        }
    }

    fn into_image(self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let c = self.color[y as usize * self.width + x as usize];
            Rgb([quantize(c.x), quantize(c.y), quantize(c.z)])
        })
    }
}

#[derive(Debug, Clone)]
pub struct Rasterizer {
    width: u32,
    height: u32,
    background: Vec3,
    point_size: u32,
}

impl Rasterizer {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            background: config.background,
            point_size: config.point_size,
        }
    }

    fn project(&self, view_proj: &Mat4, p: Vec3) -> Option<ScreenPoint> {
        let clip = *view_proj * p.extend(1.0);
        if clip.w <= 0.0 || clip.z < -clip.w || clip.z > clip.w {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc.y) * 0.5 * self.height as f32,
            depth: ndc.z,
        })
    }

    pub fn render(&self, geometry: &Geometry<'_>, pose: &CameraPose, projection: &Projection) -> RgbImage {
        let view_proj = projection.matrix() * pose.view_matrix();
        let mut frame = Frame::new(self.width, self.height, self.background);

        let screen: Vec<Option<ScreenPoint>> = geometry
            .positions
            .iter()
            .map(|p| self.project(&view_proj, *p))
            .collect();

        match geometry.triangles {
            Some(triangles) => {
                for tri in triangles {
                    let [a, b, c] = tri.map(|i| i as usize);
                    let (Some(pa), Some(pb), Some(pc)) = (screen[a], screen[b], screen[c]) else {
                        continue;
                    };
                    let colors = [geometry.colors[a], geometry.colors[b], geometry.colors[c]];
                    frame.fill_triangle([pa, pb, pc], colors);
                }
            }
            None => {
                for (p, color) in screen.iter().zip(geometry.colors) {
                    if let Some(p) = p {
                        frame.splat(*p, self.point_size, *color);
                    }
                }
            }
        }

        if let Some(outline) = geometry.outline {
            for (start, end) in outline.segments() {
                self.draw_segment(&mut frame, &view_proj, start, end, outline.color);
            }
        }

        frame.into_image()
    }

    fn draw_segment(&self, frame: &mut Frame, view_proj: &Mat4, start: Vec3, end: Vec3, color: Vec3) {
        let steps = match (self.project(view_proj, start), self.project(view_proj, end)) {
            (Some(a), Some(b)) => (b.x - a.x).abs().max((b.y - a.y).abs()).ceil() as usize,
            _ => 64,
        }
        .clamp(1, 4096);
        for i in 0..=steps {
            let p = start.lerp(end, i as f32 / steps as f32);
            if let Some(sp) = self.project(view_proj, p) {
                frame.splat(sp, 1, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Rasterizer, CameraPose, Projection) {
        let config = ViewConfig {
            width: 64,
            height: 48,
            ..ViewConfig::default()
        };
        let pose = CameraPose::look_at(Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO);
        let projection = Projection {
            vertical_fov_deg: 60.0,
            aspect: config.aspect(),
            near: config.near,
            far: config.far,
        };
        (Rasterizer::new(&config), pose, projection)
    }

    fn geometry<'a>(positions: &'a [Vec3], colors: &'a [Vec3]) -> Geometry<'a> {
        Geometry {
            positions,
            colors,
            triangles: None,
            outline: None,
        }
    }

    #[test]
    fn point_lands_in_center() {
        let (raster, pose, projection) = setup();
        let positions = [Vec3::ZERO];
        let colors = [Vec3::new(1.0, 0.0, 0.0)];
        let image = raster.render(&geometry(&positions, &colors), &pose, &projection);

        assert_eq!(image.dimensions(), (64, 48));
        assert_eq!(image.get_pixel(32, 24), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(0, 0), &Rgb([204, 204, 204]));
    }

    #[test]
    fn nearer_point_wins() {
        let (raster, pose, projection) = setup();
        let positions = [Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, 0.0)];
        let colors = [Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)];
        let image = raster.render(&geometry(&positions, &colors), &pose, &projection);
        assert_eq!(image.get_pixel(32, 24), &Rgb([0, 255, 0]));
    }

    #[test]
    fn points_behind_camera_are_skipped() {
        let (raster, pose, projection) = setup();
        let positions = [Vec3::new(0.0, -10.0, 0.0)];
        let colors = [Vec3::ONE];
        let image = raster.render(&geometry(&positions, &colors), &pose, &projection);
        assert!(image.pixels().all(|p| *p == Rgb([204, 204, 204])));
    }

    #[test]
    fn triangles_are_filled() {
        let (raster, pose, projection) = setup();
        let positions = [
            Vec3::new(-2.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, -2.0),
            Vec3::new(0.0, 0.0, 2.0),
        ];
        let colors = [Vec3::new(0.0, 0.0, 1.0); 3];
        let triangles = [[0, 1, 2]];
        let mesh = Geometry {
            triangles: Some(&triangles),
            ..geometry(&positions, &colors)
        };
        let image = raster.render(&mesh, &pose, &projection);
        assert_eq!(image.get_pixel(32, 24), &Rgb([0, 0, 255]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([204, 204, 204]));
    }

    #[test]
    fn outline_is_drawn_over_empty_scene() {
        let (raster, pose, projection) = setup();
        let outline = Outline {
            points: vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
            lines: vec![[0, 1]],
            color: Vec3::new(1.0, 0.0, 0.0),
        };
        let scene = Geometry {
            outline: Some(&outline),
            ..geometry(&[], &[])
        };
        let image = raster.render(&scene, &pose, &projection);
        let red = image.pixels().filter(|p| **p == Rgb([255, 0, 0])).count();
        assert!(red >= 10);
    }
}
