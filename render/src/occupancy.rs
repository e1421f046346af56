use glam::Vec3;
use scene::Bounds;
use tracing::debug;

use crate::error::{RenderError, Result};

/// Cells per side of the grid used to look for free camera positions.
pub const GRID_SIZE: usize = 1024;

/// Inclusive row and column bounds of a rectangle in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Rect {
    pub fn rows(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn cols(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn area(&self) -> usize {
        self.rows() * self.cols()
    }
}

/// Boolean grid where `true` marks a free cell. Rows run along x and columns
/// along y.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    rows: usize,
    cols: usize,
    free: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(rows: usize, cols: usize, free: bool) -> Self {
        Self {
            rows,
            cols,
            free: vec![free; rows * cols],
        }
    }

    pub fn from_rows(rows: &[Vec<bool>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let free = rows
            .iter()
            .flat_map(|row| (0..cols).map(move |c| row.get(c).copied().unwrap_or(false)))
            .collect();
        Self {
            rows: rows.len(),
            cols,
            free,
        }
    }

    /// Marks every cell holding a point within half a cell of `height` as
    /// occupied. Cell size is the bounding box extent divided by `size`.
    pub fn rasterize(positions: &[Vec3], bounds: &Bounds, height: f32, size: usize) -> Self {
        let mut grid = Self::new(size, size, true);
        if size == 0 {
            return grid;
        }
        let cell = bounds.extent() / size as f32;
        let (z_low, z_high) = (height - cell.z / 2.0, height + cell.z / 2.0);

        let index = |value: f32, min: f32, step: f32| -> usize {
            if step <= 0.0 {
                return 0;
            }
            (((value - min) / step) as usize).min(size - 1)
        };

        let mut occupied = 0;
        for p in positions.iter().filter(|p| p.z >= z_low && p.z <= z_high) {
            let row = index(p.x, bounds.min.x, cell.x);
            let col = index(p.y, bounds.min.y, cell.y);
            grid.set(row, col, false);
            occupied += 1;
        }
        debug!("Rasterized {occupied} points into a {size}x{size} occupancy grid");
        grid
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_free(&self, row: usize, col: usize) -> bool {
        self.free[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, free: bool) {
        self.free[row * self.cols + col] = free;
    }
}

/// Largest rectangle made only of free cells, or `None` when no cell is free.
///
/// Rows are scanned from the bottom up. For every row a histogram holds the
/// number of consecutive free cells starting at that row and extending down,
/// and the largest rectangle under the histogram is found with a monotonic
/// stack. Ties keep the first rectangle found.
pub fn largest_free_rectangle(grid: &OccupancyGrid) -> Option<Rect> {
    let (rows, cols) = (grid.rows(), grid.cols());
    let mut heights = vec![0usize; cols];
    let mut stack: Vec<usize> = Vec::with_capacity(cols + 1);
    let mut best: Option<(usize, Rect)> = None;

    for row in (0..rows).rev() {
        for (col, height) in heights.iter_mut().enumerate() {
            *height = if grid.is_free(row, col) { *height + 1 } else { 0 };
        }

        stack.clear();
        for col in 0..=cols {
            while let Some(&last) = stack.last() {
                if col < cols && heights[last] <= heights[col] {
                    break;
                }
                stack.pop();
                let height = heights[last];
                let left = stack.last().map_or(0, |&s| s + 1);
                let width = col - left;
                let area = height * width;
                if area > best.map_or(0, |(a, _)| a) {
                    best = Some((
                        area,
                        Rect {
                            top: row,
                            bottom: row + height - 1,
                            left,
                            right: col - 1,
                        },
                    ));
                }
            }
            stack.push(col);
        }
    }

    best.map(|(_, rect)| rect)
}

/// Point above the center of the largest free area of the horizontal slice of
/// the cloud at `height`.
pub fn find_position(positions: &[Vec3], height: f32) -> Result<Vec3> {
    let bounds = Bounds::from_points(positions).ok_or(RenderError::NoFreeSpace)?;
    let grid = OccupancyGrid::rasterize(positions, &bounds, height, GRID_SIZE);
    let rect = largest_free_rectangle(&grid).ok_or(RenderError::NoFreeSpace)?;
    debug!("Largest free rectangle {rect:?} with area {}", rect.area());

    let cell = bounds.extent() / GRID_SIZE as f32;
    let x = bounds.min.x + (rect.top + rect.bottom + 1) as f32 / 2.0 * cell.x;
    let y = bounds.min.y + (rect.left + rect.right + 1) as f32 / 2.0 * cell.y;
    Ok(Vec3::new(x, y, height))
}
