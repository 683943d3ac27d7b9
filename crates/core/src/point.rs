use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Where a sounding came from in the survey: ping record and beam slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoundingId {
    pub ping: usize,
    pub beam: usize,
}

/// A projected sounding. `position.x` is longitude and `position.y` latitude,
/// both in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub position: DVec2,
    pub depth: f64,
    pub id: SoundingId,
}

impl Point {
    pub fn new(position: DVec2, depth: f64, id: SoundingId) -> Self {
        Self {
            position,
            depth,
            id,
        }
    }
}

/// Axis-aligned bounding box over point positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds::new(first.position, first.position);
        for point in &points[1..] {
            bounds.include(point.position);
        }
        Some(bounds)
    }

    pub fn include(&mut self, position: DVec2) {
        self.min = self.min.min(position);
        self.max = self.max.max(position);
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec2 {
        self.min + self.size() * 0.5
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::{Bounds, Point, SoundingId};

    fn point(x: f64, y: f64) -> Point {
        Point::new(DVec2::new(x, y), 10.0, SoundingId { ping: 0, beam: 0 })
    }

    #[test]
    fn bounds_cover_all_points() {
        let points = [point(1.0, -2.0), point(-3.0, 4.0), point(0.5, 0.5)];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min, DVec2::new(-3.0, -2.0));
        assert_eq!(bounds.max, DVec2::new(1.0, 4.0));
        assert_eq!(bounds.center(), DVec2::new(-1.0, 1.0));
    }

    #[test]
    fn no_bounds_for_empty_input() {
        assert!(Bounds::from_points(&[]).is_none());
    }
}
