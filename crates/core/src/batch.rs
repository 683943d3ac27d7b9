//! Splits the ping stream into batches and projects beams to positions.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::geodesy::Geodesy;
use crate::point::{Bounds, Point, SoundingId};
use crate::source::SoundingSource;
use crate::survey::Ping;

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MAX_GAP_M: f64 = 1000.0;

/// Where one batch ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPolicy {
    /// Pings read per batch.
    pub page_size: usize,
    /// A jump between consecutive valid pings longer than this (meters)
    /// closes the batch; the next batch starts at the far ping.
    pub max_gap_m: f64,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_gap_m: DEFAULT_MAX_GAP_M,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Ping range `[first_ping, end_ping)` consumed by this batch.
    pub first_ping: usize,
    pub end_ping: usize,
    pub points: Vec<Point>,
    pub bounds: Option<Bounds>,
    pub avg_depth: f64,
    /// The batch was closed by a track gap rather than the page size.
    pub split_on_gap: bool,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.depth).collect()
    }
}

/// Position of one beam: across-track offset at `heading + 90`, then the
/// along-track offset at `heading` when present.
pub fn project_beam(
    geodesy: &dyn Geodesy,
    ping_position: DVec2,
    heading: f64,
    across_track: f64,
    along_track: Option<f64>,
) -> DVec2 {
    let across = geodesy.forward(ping_position, heading + 90.0, across_track);
    match along_track {
        Some(along) => geodesy.forward(across, heading, along),
        None => across,
    }
}

pub struct Batcher<'a, S: SoundingSource + ?Sized> {
    source: &'a S,
    policy: BatchPolicy,
    geodesy: &'a dyn Geodesy,
    next: usize,
    previous: Option<DVec2>,
}

impl<'a, S: SoundingSource + ?Sized> Batcher<'a, S> {
    pub fn new(source: &'a S, policy: BatchPolicy, geodesy: &'a dyn Geodesy) -> Self {
        Self {
            source,
            policy,
            geodesy,
            next: 0,
            previous: None,
        }
    }

    fn push_beams(&self, ping_index: usize, ping: &Ping, position: DVec2, points: &mut Vec<Point>) {
        for (beam_index, beam) in ping.beams.iter().enumerate() {
            if !beam.is_usable() {
                continue;
            }
            let projected = project_beam(
                self.geodesy,
                position,
                ping.heading,
                beam.across_track,
                beam.along_track,
            );
            if !projected.is_finite() {
                tracing::debug!("ping {ping_index} beam {beam_index}: projection failed");
                continue;
            }
            points.push(Point::new(
                projected,
                beam.effective_depth(),
                SoundingId {
                    ping: ping_index,
                    beam: beam_index,
                },
            ));
        }
    }
}

impl<S: SoundingSource + ?Sized> Iterator for Batcher<'_, S> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let total = self.source.ping_count();
        if self.next >= total {
            return None;
        }
        let first_ping = self.next;
        let page_end = first_ping
            .saturating_add(self.policy.page_size.max(1))
            .min(total);
        let mut points = Vec::new();
        let mut split_on_gap = false;
        let mut index = first_ping;

        while index < page_end {
            let Some(ping) = self.source.ping(index) else {
                break;
            };
            if ping.is_valid() {
                let position = DVec2::new(ping.longitude, ping.latitude);
                if let Some(previous) = self.previous {
                    let gap = self.geodesy.inverse(previous, position);
                    if gap > self.policy.max_gap_m {
                        // The far ping starts a fresh track.
                        self.previous = None;
                        if index > first_ping {
                            tracing::debug!("track gap of {gap:.0} m at ping {index}");
                            split_on_gap = true;
                            break;
                        }
                    }
                }
                self.previous = Some(position);
                self.push_beams(index, ping, position, &mut points);
            }
            index += 1;
        }
        self.next = index;

        let bounds = Bounds::from_points(&points);
        let avg_depth = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|point| point.depth).sum::<f64>() / points.len() as f64
        };
        Some(Batch {
            first_ping,
            end_ping: index,
            points,
            bounds,
            avg_depth,
            split_on_gap,
        })
    }
}
