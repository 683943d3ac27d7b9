//! Rectangular, row-major grid of depth cells built per batch.

use glam::DVec2;

use crate::point::Bounds;
use crate::stats::DepthStats;

/// A point binned into a cell. `point_index` indexes the batch's depth array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRef {
    pub point_index: usize,
    pub filtered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Cell {
    cleared: bool,
    avg: f64,
    std: f64,
    depths: Vec<DepthRef>,
}

impl Cell {
    pub fn count(&self) -> usize {
        self.depths.len()
    }

    pub fn is_occupied(&self) -> bool {
        !self.depths.is_empty()
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Occupied and not cleared: the cell's statistics may be read.
    pub fn is_live(&self) -> bool {
        self.is_occupied() && !self.cleared
    }

    pub fn avg(&self) -> f64 {
        self.avg
    }

    pub fn std(&self) -> f64 {
        self.std
    }

    pub fn depths(&self) -> &[DepthRef] {
        &self.depths
    }

    pub(crate) fn depths_mut(&mut self) -> &mut [DepthRef] {
        &mut self.depths
    }

    pub(crate) fn push(&mut self, point_index: usize) {
        self.depths.push(DepthRef {
            point_index,
            filtered: false,
        });
    }

    pub fn survivor_count(&self) -> usize {
        self.depths.iter().filter(|depth| !depth.filtered).count()
    }

    /// Recomputes `avg`/`std` from unfiltered depths. A cell with no
    /// survivors is marked cleared and keeps its stale statistics.
    pub(crate) fn refresh_stats(&mut self, depths: &[f64]) {
        let survivors = self
            .depths
            .iter()
            .filter(|depth| !depth.filtered)
            .map(|depth| depths[depth.point_index]);
        match DepthStats::from_values(survivors) {
            Some(stats) => {
                self.avg = stats.mean;
                self.std = stats.std;
            }
            None => {
                self.cleared = true;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_stats(&mut self, avg: f64, std: f64) {
        self.avg = avg;
        self.std = std;
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    height: usize,
    width: usize,
    cell_size: f64,
    bounds: Bounds,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(height: usize, width: usize, cell_size: f64, bounds: Bounds) -> Self {
        Self {
            height,
            width,
            cell_size,
            bounds,
            cells: vec![Cell::default(); height * width],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells.get(self.index(row, col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let idx = self.index(row, col);
        self.cells.get_mut(idx)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Row/column of the cell containing `position`, clamped to the grid so
    /// a point on the maximum edge never lands out of range.
    pub fn bin(&self, position: DVec2) -> (usize, usize) {
        let offset = (position - self.bounds.min) / self.cell_size;
        let col = clamp_bin(offset.x, self.width);
        let row = clamp_bin(offset.y, self.height);
        (row, col)
    }

    pub fn insert(&mut self, position: DVec2, point_index: usize) -> (usize, usize) {
        let (row, col) = self.bin(position);
        let idx = self.index(row, col);
        self.cells[idx].push(point_index);
        (row, col)
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_occupied()).count()
    }

    /// `(row, col)` of every cell emptied by the filter, row-major.
    pub fn cleared_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_cleared())
            .map(move |(idx, _)| (idx / width, idx % width))
    }

    /// Point indices flagged by the filter, in row-major cell order.
    pub fn filtered_points(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .flat_map(|cell| cell.depths.iter())
            .filter(|depth| depth.filtered)
            .map(|depth| depth.point_index)
    }
}

fn clamp_bin(offset: f64, len: usize) -> usize {
    let max = len.saturating_sub(1);
    if offset.is_nan() || offset <= 0.0 {
        return 0;
    }
    let bin = offset.floor();
    if bin >= max as f64 {
        max
    } else {
        bin as usize
    }
}
