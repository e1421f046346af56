use std::fmt;
use ball_tree::BallTree;
use glam::Vec3;
use tracing::debug;

/// Nearest-neighbour lookup over the points of a cloud, answering with point indices.
pub struct NearestIndex {
    tree: Option<BallTree<[f64; 3], usize>>,
    len: usize,
}

impl fmt::Debug for NearestIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearestIndex").field("len", &self.len).finish()
    }
}

fn to_tree_point(p: Vec3) -> [f64; 3] {
    [p.x as f64, p.y as f64, p.z as f64]
}

impl NearestIndex {
    pub fn new(positions: &[Vec3]) -> Self {
        let tree = (!positions.is_empty()).then(|| {
            let points: Vec<[f64; 3]> = positions.iter().map(|p| to_tree_point(*p)).collect();
            let indices: Vec<usize> = (0..points.len()).collect();
            BallTree::new(points, indices)
        });
        Self {
            tree,
            len: positions.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of and distance to the closest point.
    pub fn nearest(&self, point: Vec3) -> Option<(usize, f32)> {
        let tree = self.tree.as_ref()?;
        let mut query = tree.query();
        let nearest = query
            .nn(&to_tree_point(point))
            .next()
            .map(|(_, distance, &index)| (index, distance as f32));
        nearest
    }

    /// Mean distance from a point of the cloud to its `k` nearest other points.
    fn mean_neighbour_distance(&self, point: Vec3, k: usize) -> f32 {
        let Some(tree) = self.tree.as_ref() else {
            return 0.0;
        };
        let mut query = tree.query();
        let (sum, count) = query
            .nn(&to_tree_point(point))
            .skip(1)
            .take(k)
            .fold((0.0f64, 0usize), |(sum, count), (_, d, _)| (sum + d, count + 1));
        if count == 0 { 0.0 } else { (sum / count as f64) as f32 }
    }
}

/// Drops points whose mean distance to their `k` nearest neighbours exceeds
/// the cloud-wide mean of that measure by more than `std_ratio` standard deviations.
pub fn filter_outliers(positions: &[Vec3], k: usize, std_ratio: f32) -> Vec<Vec3> {
    if positions.len() <= 1 {
        return positions.to_vec();
    }

    let index = NearestIndex::new(positions);
    let spacing: Vec<f32> = positions
        .iter()
        .map(|p| index.mean_neighbour_distance(*p, k))
        .collect();

    let n = spacing.len() as f32;
    let mean = spacing.iter().sum::<f32>() / n;
    let variance = spacing.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
    let threshold = mean + std_ratio * variance.sqrt();

    let kept: Vec<Vec3> = positions
        .iter()
        .zip(&spacing)
        .filter(|(_, s)| **s <= threshold)
        .map(|(p, _)| *p)
        .collect();
    debug!(
        "Outlier filter kept {} of {} points (threshold {threshold:.4})",
        kept.len(),
        positions.len()
    );

    if kept.is_empty() { positions.to_vec() } else { kept }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<Vec3> {
        let mut points = Vec::new();
        for x in 0..n {
            for y in 0..n {
                points.push(Vec3::new(x as f32, y as f32, 0.0));
            }
        }
        points
    }

    #[test]
    fn nearest_returns_index_of_closest_point() {
        let points = vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 1.0)];
        let index = NearestIndex::new(&points);
        let (i, d) = index.nearest(Vec3::new(4.0, 0.5, 0.0)).unwrap();
        assert_eq!(i, 1);
        assert!((d - (1.0f32 + 0.25).sqrt()).abs() < 1e-5);
    }

    #[test]
    fn empty_index_has_no_answer() {
        let index = NearestIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index.nearest(Vec3::ONE).is_none());
    }

    #[test]
    fn far_away_point_is_filtered() {
        let mut points = grid(6);
        points.push(Vec3::new(500.0, 500.0, 500.0));
        let kept = filter_outliers(&points, 10, 3.0);
        assert_eq!(kept.len(), 36);
        assert!(kept.iter().all(|p| p.x < 100.0));
    }

    #[test]
    fn uniform_cloud_is_untouched() {
        let points = grid(5);
        assert_eq!(filter_outliers(&points, 10, 3.0).len(), points.len());
    }
}
