//! Sigma-threshold outlier test over a populated grid.
//!
//! The pass visits cells once in row-major order and mutates them in place,
//! so a cell recomputed early in the pass feeds the neighborhood estimate of
//! every cell visited after it.

use serde::{Deserialize, Serialize};

use crate::grid::{DepthRef, Grid};
use crate::neighborhood::{estimate_neighborhood, NeighborhoodEstimate};

pub const DEFAULT_SIGMA_MULT: f64 = 2.0;
pub const MIN_SIGMA_MULT: f64 = 1.0;
pub const MAX_SIGMA_MULT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub sigma_mult: f64,
    pub deep_only: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sigma_mult: DEFAULT_SIGMA_MULT,
            deep_only: false,
        }
    }
}

impl FilterConfig {
    pub fn new(sigma_mult: f64, deep_only: bool) -> Self {
        Self {
            sigma_mult,
            deep_only,
        }
        .normalized()
    }

    /// Replaces a sigma multiplier outside `[1, 10]` with the default.
    pub fn normalized(self) -> Self {
        let sigma_mult = if (MIN_SIGMA_MULT..=MAX_SIGMA_MULT).contains(&self.sigma_mult) {
            self.sigma_mult
        } else {
            tracing::debug!(
                "sigma multiplier {} out of range, using {}",
                self.sigma_mult,
                DEFAULT_SIGMA_MULT
            );
            DEFAULT_SIGMA_MULT
        };
        Self { sigma_mult, ..self }
    }

    /// Whether `depth` is an outlier against `avg` at `threshold`.
    pub fn is_outlier(&self, depth: f64, avg: f64, threshold: f64) -> bool {
        if self.deep_only {
            depth - avg >= threshold
        } else {
            (depth - avg).abs() >= threshold
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or already cleared.
    NotLive,
    /// No live cell in the neighborhood.
    NoNeighbors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    Untouched,
    Filtered { flagged: usize },
    Cleared { flagged: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub cells_visited: usize,
    pub cells_skipped: usize,
    pub cells_recomputed: usize,
    pub cells_cleared: usize,
    pub points_flagged: usize,
}

impl PassReport {
    pub fn merge(&mut self, other: PassReport) {
        self.cells_visited += other.cells_visited;
        self.cells_skipped += other.cells_skipped;
        self.cells_recomputed += other.cells_recomputed;
        self.cells_cleared += other.cells_cleared;
        self.points_flagged += other.points_flagged;
    }

    fn record(&mut self, outcome: CellOutcome) {
        match outcome {
            CellOutcome::Skipped(SkipReason::NotLive) => return,
            CellOutcome::Skipped(_) => self.cells_skipped += 1,
            CellOutcome::Untouched => {}
            CellOutcome::Filtered { flagged } => {
                self.cells_recomputed += 1;
                self.points_flagged += flagged;
            }
            CellOutcome::Cleared { flagged } => {
                self.cells_recomputed += 1;
                self.cells_cleared += 1;
                self.points_flagged += flagged;
            }
        }
        self.cells_visited += 1;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutlierFilter {
    config: FilterConfig,
}

impl OutlierFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    pub fn config(&self) -> FilterConfig {
        self.config
    }

    /// One row-major pass over the grid. `depths` is indexed by each
    /// `DepthRef::point_index`; `dx` is the cell diagonal in meters.
    pub fn run(&self, grid: &mut Grid, depths: &[f64], dx: f64) -> PassReport {
        let mut report = PassReport::default();
        for row in 0..grid.height() {
            for col in 0..grid.width() {
                report.record(self.filter_cell(grid, depths, dx, row, col));
            }
        }
        report
    }

    pub fn filter_cell(
        &self,
        grid: &mut Grid,
        depths: &[f64],
        dx: f64,
        row: usize,
        col: usize,
    ) -> CellOutcome {
        if !grid.cell(row, col).is_some_and(|cell| cell.is_live()) {
            return CellOutcome::Skipped(SkipReason::NotLive);
        }
        let Some(estimate) = estimate_neighborhood(grid, row, col, dx) else {
            return CellOutcome::Skipped(SkipReason::NoNeighbors);
        };
        let Some(cell) = grid.cell_mut(row, col) else {
            return CellOutcome::Skipped(SkipReason::NotLive);
        };

        let flagged = self.flag_depths(cell.depths_mut(), depths, &estimate);
        if flagged == 0 {
            return CellOutcome::Untouched;
        }
        cell.refresh_stats(depths);
        if cell.is_cleared() {
            CellOutcome::Cleared { flagged }
        } else {
            CellOutcome::Filtered { flagged }
        }
    }

    fn flag_depths(
        &self,
        refs: &mut [DepthRef],
        depths: &[f64],
        estimate: &NeighborhoodEstimate,
    ) -> usize {
        let threshold = self.config.sigma_mult * estimate.composite_std;
        let mut flagged = 0;
        for depth_ref in refs.iter_mut().filter(|depth_ref| !depth_ref.filtered) {
            let depth = depths[depth_ref.point_index];
            if self
                .config
                .is_outlier(depth, estimate.composite_avg, threshold)
            {
                depth_ref.filtered = true;
                flagged += 1;
            }
        }
        flagged
    }
}
