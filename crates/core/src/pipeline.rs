//! Runs the outlier filter over a whole survey, batch by batch.

use crate::batch::{Batch, BatchPolicy, Batcher};
use crate::filter::{FilterConfig, OutlierFilter, PassReport};
use crate::geodesy::{Geodesy, Wgs84};
use crate::grid_builder::{GridBuilder, GridError};
use crate::point::SoundingId;
use crate::progress::{report_progress, ProgressEvent, ProgressSink};
use crate::source::{SoundingSink, SoundingSource};
use crate::survey::HistoryRecord;

/// Result of filtering one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Flagged soundings in ping/beam order.
    pub flagged: Vec<SoundingId>,
    /// Grid cells left with no surviving soundings, as `(row, col)`.
    pub cleared_cells: Vec<(usize, usize)>,
    pub pass: PassReport,
    pub grid_height: usize,
    pub grid_width: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub batches: usize,
    pub batches_skipped: usize,
    pub points: usize,
    pub soundings_flagged: usize,
    pub pass: PassReport,
}

pub fn history_record(program: &str, target: &str, config: &FilterConfig) -> HistoryRecord {
    let deep = if config.deep_only { " --deep" } else { "" };
    let command_line = format!("{program} --std {:.1}{deep} {target}", config.sigma_mult);
    HistoryRecord {
        program: program.to_string(),
        comment: format!(
            "This file was statistically filtered using the following program and arguments:\n{command_line}\n"
        ),
        command_line,
    }
}

pub struct FilterRun {
    filter: OutlierFilter,
    policy: BatchPolicy,
    builder: GridBuilder,
    geodesy: Box<dyn Geodesy>,
    progress: Option<ProgressSink>,
    history: Option<HistoryRecord>,
}

impl FilterRun {
    pub fn new(config: FilterConfig, policy: BatchPolicy) -> Self {
        Self {
            filter: OutlierFilter::new(config),
            policy,
            builder: GridBuilder::new(),
            geodesy: Box::new(Wgs84),
            progress: None,
            history: None,
        }
    }

    pub fn with_geodesy(mut self, geodesy: impl Geodesy + 'static) -> Self {
        self.geodesy = Box::new(geodesy);
        self
    }

    pub fn with_grid_builder(mut self, builder: GridBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Appends a history record naming `program` and `target` after the run.
    pub fn with_history(mut self, program: &str, target: &str) -> Self {
        self.history = Some(history_record(program, target, &self.filter.config()));
        self
    }

    pub fn config(&self) -> FilterConfig {
        self.filter.config()
    }

    /// Bins, filters and discards the grid for one batch.
    pub fn filter_batch(&self, batch: &Batch) -> Result<BatchOutcome, GridError> {
        let bounds = batch.bounds.ok_or(GridError::EmptyBatch)?;
        let mut binned =
            self.builder
                .build(&batch.points, bounds, batch.avg_depth, self.geodesy.as_ref())?;
        let depths = batch.depths();
        let pass = self.filter.run(&mut binned.grid, &depths, binned.dx);

        let mut flagged: Vec<SoundingId> = binned
            .grid
            .filtered_points()
            .map(|idx| batch.points[idx].id)
            .collect();
        flagged.sort_unstable();
        Ok(BatchOutcome {
            flagged,
            cleared_cells: binned.grid.cleared_cells().collect(),
            pass,
            grid_height: binned.grid.height(),
            grid_width: binned.grid.width(),
        })
    }

    pub fn run<S>(&self, survey: &mut S) -> RunReport
    where
        S: SoundingSource + SoundingSink,
    {
        let mut report = RunReport::default();
        let total = survey.ping_count();
        report_progress(self.progress.as_ref(), ProgressEvent::Start { pings: total });

        let mut flagged = Vec::new();
        {
            let batcher = Batcher::new(&*survey, self.policy, self.geodesy.as_ref());
            for batch in batcher {
                report.batches += 1;
                report.points += batch.points.len();
                if !batch.is_empty() {
                    match self.filter_batch(&batch) {
                        Ok(outcome) => {
                            tracing::debug!(
                                "pings {}..{}: {} points, grid {}x{}, {} flagged",
                                batch.first_ping,
                                batch.end_ping,
                                batch.points.len(),
                                outcome.grid_height,
                                outcome.grid_width,
                                outcome.pass.points_flagged
                            );
                            report.pass.merge(outcome.pass);
                            flagged.extend(outcome.flagged);
                        }
                        Err(err) => {
                            tracing::warn!(
                                "pings {}..{}: batch skipped: {err}",
                                batch.first_ping,
                                batch.end_ping
                            );
                            report.batches_skipped += 1;
                        }
                    }
                }
                if total > 0 {
                    report_progress(
                        self.progress.as_ref(),
                        ProgressEvent::Advance {
                            fraction: batch.end_ping as f32 / total as f32,
                        },
                    );
                }
            }
        }

        for id in flagged {
            if survey.mark_filtered(id) {
                report.soundings_flagged += 1;
            } else {
                tracing::warn!("sounding {id:?} not found in survey");
            }
        }
        if let Some(history) = &self.history {
            survey.append_history(history.clone());
        }
        report_progress(self.progress.as_ref(), ProgressEvent::Finish);

        tracing::info!(
            "{} batches, {} points, {} soundings flagged, {} cells cleared",
            report.batches,
            report.points,
            report.soundings_flagged,
            report.pass.cells_cleared
        );
        report
    }
}
