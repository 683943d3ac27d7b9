use std::fmt;

use glam::DVec2;

use crate::geodesy::Geodesy;
use crate::grid::Grid;
use crate::parallel::for_each_mut;
use crate::point::{Bounds, Point};

/// Largest grid edge, in cells, before the cell size is doubled.
pub const MAX_GRID_DIM: usize = 5000;

/// Angular footprint of a vertical beam spanning one degree (radians).
const ONE_DEGREE_FOOTPRINT: f64 = 0.017453736;
/// Cells are four footprints wide.
const FOOTPRINT_CELLS: f64 = 4.0;
/// Meters per degree of latitude used to convert the footprint to degrees.
const METERS_PER_DEGREE: f64 = 111_120.0;

#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    EmptyBatch,
    NonFiniteBounds,
    InvalidCellSize(f64),
    InvalidCellSpacing(f64),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::EmptyBatch => write!(f, "batch has no points"),
            GridError::NonFiniteBounds => write!(f, "batch bounds are not finite"),
            GridError::InvalidCellSize(size) => write!(f, "invalid grid cell size {size}"),
            GridError::InvalidCellSpacing(dx) => write!(f, "invalid grid cell diagonal {dx} m"),
        }
    }
}

impl std::error::Error for GridError {}

/// Cell size and extent chosen for a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cell_size: f64,
    pub height: usize,
    pub width: usize,
}

impl GridLayout {
    /// Sizes the grid over `bounds`, doubling `cell_size` until neither edge
    /// exceeds [`MAX_GRID_DIM`].
    pub fn fit(bounds: &Bounds, cell_size: f64) -> Result<Self, GridError> {
        if !bounds.is_finite() {
            return Err(GridError::NonFiniteBounds);
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        let size = bounds.size();
        let mut cell_size = cell_size;
        let mut height = (size.y / cell_size).round() + 1.0;
        let mut width = (size.x / cell_size).round() + 1.0;
        while height > MAX_GRID_DIM as f64 || width > MAX_GRID_DIM as f64 {
            cell_size *= 2.0;
            height = (size.y / cell_size).round() + 1.0;
            width = (size.x / cell_size).round() + 1.0;
        }
        Ok(Self {
            cell_size,
            height: height as usize,
            width: width as usize,
        })
    }
}

/// Initial cell size in degrees for a batch whose mean depth is `avg_depth`
/// meters.
pub fn footprint_cell_size(avg_depth: f64) -> f64 {
    avg_depth * ONE_DEGREE_FOOTPRINT * FOOTPRINT_CELLS / METERS_PER_DEGREE
}

/// A populated grid plus the diagonal length of one cell in meters, the unit
/// for slope comparisons in the filter.
#[derive(Debug, Clone)]
pub struct BinnedBatch {
    pub grid: Grid,
    pub dx: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GridBuilder {
    cell_size: Option<f64>,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed starting cell size instead of the depth footprint.
    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    pub fn build(
        &self,
        points: &[Point],
        bounds: Bounds,
        avg_depth: f64,
        geodesy: &dyn Geodesy,
    ) -> Result<BinnedBatch, GridError> {
        if points.is_empty() {
            return Err(GridError::EmptyBatch);
        }
        let initial = self
            .cell_size
            .unwrap_or_else(|| footprint_cell_size(avg_depth));
        let layout = GridLayout::fit(&bounds, initial)?;

        let center = bounds.center();
        let dx = geodesy.inverse(center, center + DVec2::splat(layout.cell_size));
        if !dx.is_finite() || dx <= 0.0 {
            return Err(GridError::InvalidCellSpacing(dx));
        }

        let mut grid = Grid::new(layout.height, layout.width, layout.cell_size, bounds);
        for (idx, point) in points.iter().enumerate() {
            grid.insert(point.position, idx);
        }

        let depths: Vec<f64> = points.iter().map(|point| point.depth).collect();
        for_each_mut(grid.cells_mut(), |cell| {
            if cell.is_occupied() {
                cell.refresh_stats(&depths);
            }
        });

        tracing::debug!(
            "grid {}x{} cell {:.3e} deg, dx {:.2} m, {} occupied cells",
            layout.height,
            layout.width,
            layout.cell_size,
            dx,
            grid.occupied_cells()
        );
        Ok(BinnedBatch { grid, dx })
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::{footprint_cell_size, GridBuilder, GridError, GridLayout, MAX_GRID_DIM};
    use crate::geodesy::{Planar, Wgs84};
    use crate::point::{Bounds, Point, SoundingId};

    fn point(x: f64, y: f64, depth: f64, beam: usize) -> Point {
        Point::new(DVec2::new(x, y), depth, SoundingId { ping: 0, beam })
    }

    #[test]
    fn footprint_scales_with_depth() {
        let shallow = footprint_cell_size(50.0);
        let deep = footprint_cell_size(100.0);
        assert!((deep - 2.0 * shallow).abs() < 1.0e-15);
        // 100 m of water gives roughly a 7 m cell.
        assert!((deep * 111_120.0 - 6.98).abs() < 0.01);
    }

    #[test]
    fn layout_rounds_extent() {
        let bounds = Bounds::new(DVec2::ZERO, DVec2::new(2.6, 2.4));
        let layout = GridLayout::fit(&bounds, 1.0).unwrap();
        assert_eq!(layout.width, 4);
        assert_eq!(layout.height, 3);
        assert_eq!(layout.cell_size, 1.0);
    }

    #[test]
    fn layout_dimension_loop_terminates_within_limit() {
        let cases = [
            (DVec2::new(1.0e6, 1.0), 1.0e-3),
            (DVec2::new(3.0, 9.0e9), 1.0e-9),
            (DVec2::new(5000.0, 5000.0), 1.0),
            (DVec2::new(0.0, 0.0), 1.0e-300),
            (DVec2::new(360.0, 180.0), f64::MIN_POSITIVE),
        ];
        for (size, cell) in cases {
            let bounds = Bounds::new(DVec2::ZERO, size);
            let layout = GridLayout::fit(&bounds, cell).unwrap();
            assert!(layout.height <= MAX_GRID_DIM, "{size:?} {cell}");
            assert!(layout.width <= MAX_GRID_DIM, "{size:?} {cell}");
            assert!(layout.height >= 1 && layout.width >= 1);
        }
    }

    #[test]
    fn layout_rejects_bad_cell_size() {
        let bounds = Bounds::new(DVec2::ZERO, DVec2::ONE);
        assert_eq!(
            GridLayout::fit(&bounds, 0.0),
            Err(GridError::InvalidCellSize(0.0))
        );
        assert!(GridLayout::fit(&bounds, -1.0).is_err());
        let open = Bounds::new(DVec2::ZERO, DVec2::new(f64::INFINITY, 1.0));
        assert_eq!(GridLayout::fit(&open, 1.0), Err(GridError::NonFiniteBounds));
    }

    #[test]
    fn build_bins_points_and_computes_raw_stats() {
        let points = vec![
            point(0.0, 0.0, 10.0, 0),
            point(0.2, 0.3, 14.0, 1),
            point(2.0, 2.0, 30.0, 2),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        let binned = GridBuilder::new()
            .with_cell_size(1.0)
            .build(&points, bounds, 0.0, &Planar)
            .unwrap();
        let grid = &binned.grid;
        assert_eq!((grid.height(), grid.width()), (3, 3));
        assert!((binned.dx - 2.0_f64.sqrt()).abs() < 1.0e-12);

        let first = grid.cell(0, 0).unwrap();
        assert_eq!(first.count(), 2);
        assert!((first.avg() - 12.0).abs() < 1.0e-12);
        assert!((first.std() - 8.0_f64.sqrt()).abs() < 1.0e-12);

        // The point on the maximum corner lands in the last cell.
        let last = grid.cell(2, 2).unwrap();
        assert_eq!(last.count(), 1);
        assert_eq!(last.std(), 0.0);
        assert_eq!(grid.occupied_cells(), 2);
    }

    #[test]
    fn build_uses_depth_footprint_on_the_ellipsoid() {
        let points = vec![
            point(-70.0, 41.0, 100.0, 0),
            point(-69.999, 41.001, 101.0, 1),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        let binned = GridBuilder::new()
            .build(&points, bounds, 100.5, &Wgs84)
            .unwrap();
        let cell = binned.grid.cell_size();
        assert!((cell - footprint_cell_size(100.5)).abs() < 1.0e-15);
        // One cell diagonal is several meters at this latitude.
        assert!(binned.dx > 5.0 && binned.dx < 12.0, "dx {}", binned.dx);
    }

    #[test]
    fn build_rejects_empty_batch() {
        let bounds = Bounds::new(DVec2::ZERO, DVec2::ONE);
        let err = GridBuilder::new()
            .build(&[], bounds, 10.0, &Planar)
            .unwrap_err();
        assert_eq!(err, GridError::EmptyBatch);
    }
}
