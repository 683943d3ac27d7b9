//! Composite average and noise estimate over a cell's 3x3 neighborhood.

use crate::grid::Grid;

/// Slope (depth change per cell diagonal) above which a neighborhood is not flat.
pub const FLAT_SLOPE_LIMIT: f64 = 1.0;

/// Empirical correction applied to both noise estimators.
pub const NOISE_SCALE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborhoodEstimate {
    pub composite_avg: f64,
    pub composite_std: f64,
    /// Live cells that contributed, center included.
    pub contributing: usize,
    pub flat: bool,
}

/// Estimates the local reference depth and noise for cell `(row, col)`.
///
/// Only live cells (occupied, not cleared) contribute. Returns `None` when the
/// center is not live or nothing contributes.
pub fn estimate_neighborhood(
    grid: &Grid,
    row: usize,
    col: usize,
    dx: f64,
) -> Option<NeighborhoodEstimate> {
    let center = grid.cell(row, col).filter(|cell| cell.is_live())?;
    let center_avg = center.avg();

    let mut sum_avg = 0.0;
    let mut sum_std = 0.0;
    let mut sum_avg_sq = 0.0;
    let mut sum_count = 0usize;
    let mut flat = true;

    for (r, c) in window(grid, row, col) {
        let Some(cell) = grid.cell(r, c).filter(|cell| cell.is_live()) else {
            continue;
        };
        sum_avg += cell.avg();
        sum_std += cell.std();
        sum_avg_sq += cell.avg() * cell.avg();
        sum_count += 1;

        if flat && (r, c) != (row, col) {
            let slope = (center_avg - cell.avg()).abs() / dx;
            if slope > FLAT_SLOPE_LIMIT {
                flat = false;
            }
        }
    }

    if sum_count == 0 {
        return None;
    }

    let n = sum_count as f64;
    let composite_avg = sum_avg / n;
    let composite_std = if flat || sum_count < 2 {
        (sum_std / n) * NOISE_SCALE
    } else {
        let variance = (sum_avg_sq - n * composite_avg * composite_avg) / (n - 1.0);
        variance.max(0.0).sqrt() * NOISE_SCALE
    };

    Some(NeighborhoodEstimate {
        composite_avg,
        composite_std,
        contributing: sum_count,
        flat,
    })
}

/// In-bounds cells of the 3x3 window around `(row, col)`, row-major.
fn window(grid: &Grid, row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
    let rows = row.saturating_sub(1)..=(row + 1).min(grid.height().saturating_sub(1));
    let cols = col.saturating_sub(1)..=(col + 1).min(grid.width().saturating_sub(1));
    rows.flat_map(move |r| cols.clone().map(move |c| (r, c)))
}
