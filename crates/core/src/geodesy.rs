//! Distances and forward projection for geographic positions.
//!
//! Positions are `DVec2` with `x` = longitude and `y` = latitude in degrees.
//! Azimuths are degrees clockwise from north.

use geo::{Destination, Distance, Geodesic, Point as GeoPoint};
use glam::DVec2;

pub trait Geodesy {
    /// Distance in meters between two positions.
    fn inverse(&self, from: DVec2, to: DVec2) -> f64;

    /// Position reached from `origin` after `distance` meters along `azimuth_deg`.
    fn forward(&self, origin: DVec2, azimuth_deg: f64, distance: f64) -> DVec2;
}

fn to_geo(position: DVec2) -> GeoPoint<f64> {
    GeoPoint::new(position.x, position.y)
}

/// Geodesics on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Wgs84;

impl Geodesy for Wgs84 {
    fn inverse(&self, from: DVec2, to: DVec2) -> f64 {
        Geodesic::distance(to_geo(from), to_geo(to))
    }

    fn forward(&self, origin: DVec2, azimuth_deg: f64, distance: f64) -> DVec2 {
        if distance == 0.0 {
            return origin;
        }
        let target = Geodesic::destination(to_geo(origin), azimuth_deg, distance);
        DVec2::new(target.x(), target.y())
    }
}

/// Flat Cartesian plane: positions and distances share the same unit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Planar;

impl Geodesy for Planar {
    fn inverse(&self, from: DVec2, to: DVec2) -> f64 {
        from.distance(to)
    }

    fn forward(&self, origin: DVec2, azimuth_deg: f64, distance: f64) -> DVec2 {
        let (sin, cos) = azimuth_deg.to_radians().sin_cos();
        origin + DVec2::new(sin, cos) * distance
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::{Geodesy, Planar, Wgs84};

    fn dms(deg: f64, min: f64, sec: f64) -> f64 {
        deg.signum() * (deg.abs() + min / 60.0 + sec / 3600.0)
    }

    #[test]
    fn inverse_matches_reference_line() {
        // Flinders Peak to Buninyong.
        let from = DVec2::new(dms(144.0, 25.0, 29.52440), dms(-37.0, 57.0, 3.72030));
        let to = DVec2::new(dms(143.0, 55.0, 35.38390), dms(-37.0, 39.0, 10.15610));
        let distance = Wgs84.inverse(from, to);
        assert!((distance - 54_972.271).abs() < 0.01, "distance {distance}");
    }

    #[test]
    fn inverse_of_identical_points_is_zero() {
        let p = DVec2::new(-70.5, 41.2);
        assert!(Wgs84.inverse(p, p).abs() < 1.0e-9);
    }

    #[test]
    fn forward_then_inverse_recovers_distance() {
        let origin = DVec2::new(-70.5, 41.2);
        let target = Wgs84.forward(origin, 37.0, 1500.0);
        assert!(target.y > origin.y);
        assert!(target.x > origin.x);
        assert!((Wgs84.inverse(origin, target) - 1500.0).abs() < 1.0e-3);
    }

    #[test]
    fn forward_due_east_keeps_latitude_nearly_constant() {
        let origin = DVec2::new(10.0, 55.0);
        let target = Wgs84.forward(origin, 90.0, 100.0);
        assert!(target.x > origin.x);
        assert!((target.y - origin.y).abs() < 1.0e-6);
        assert_eq!(Wgs84.forward(origin, 90.0, 0.0), origin);
    }

    #[test]
    fn planar_forward_uses_compass_azimuth() {
        let moved = Planar.forward(DVec2::ZERO, 90.0, 2.0);
        assert!((moved.x - 2.0).abs() < 1.0e-12);
        assert!(moved.y.abs() < 1.0e-12);
        assert_eq!(Planar.inverse(DVec2::ZERO, DVec2::new(3.0, 4.0)), 5.0);
    }
}
