mod batch;
mod filter;
mod geodesy;
mod grid;
mod grid_builder;
mod neighborhood;
mod parallel;
mod pipeline;
mod point;
mod progress;
mod source;
mod stats;
mod survey;

pub use batch::{project_beam, Batch, BatchPolicy, Batcher, DEFAULT_MAX_GAP_M, DEFAULT_PAGE_SIZE};
pub use filter::{
    CellOutcome, FilterConfig, OutlierFilter, PassReport, SkipReason, DEFAULT_SIGMA_MULT,
    MAX_SIGMA_MULT, MIN_SIGMA_MULT,
};
pub use geodesy::{Geodesy, Planar, Wgs84};
pub use grid::{Cell, DepthRef, Grid};
pub use grid_builder::{
    footprint_cell_size, BinnedBatch, GridBuilder, GridError, GridLayout, MAX_GRID_DIM,
};
pub use neighborhood::{estimate_neighborhood, NeighborhoodEstimate, FLAT_SLOPE_LIMIT, NOISE_SCALE};
pub use pipeline::{history_record, BatchOutcome, FilterRun, RunReport};
pub use point::{Bounds, Point, SoundingId};
pub use progress::{ProgressEvent, ProgressSink};
pub use source::{SoundingSink, SoundingSource};
pub use stats::DepthStats;
pub use survey::{Beam, BeamFlags, HistoryRecord, Ping, Survey, SurveyError, SURVEY_VERSION};
