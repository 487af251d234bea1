use serde::Serialize;

use crate::models::geo::GeoPoint;

const KM_PER_DEGREE: f64 = 111.11;

/// Degrees spanned by `radius_km` around `lat`, treating the surface as locally flat.
///
/// Not corrected near the poles or across the ±180° meridian: as `lat` approaches
/// ±90° the delta grows without bound.
pub fn degree_delta(lat: f64, radius_km: f64) -> f64 {
    radius_km / (KM_PER_DEGREE * lat.to_radians().cos())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let delta = degree_delta(center.lat, radius_km);

        Self {
            min_lat: center.lat - delta,
            max_lat: center.lat + delta,
            min_lon: center.lon - delta,
            max_lon: center.lon + delta,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::{degree_delta, BoundingBox, KM_PER_DEGREE};
    use crate::models::geo::GeoPoint;

    #[test]
    fn delta_at_equator_is_plain_degree_conversion() {
        let delta = degree_delta(0.0, 2.0);
        assert!((delta - 2.0 / KM_PER_DEGREE).abs() < 1e-12);
    }

    #[test]
    fn delta_widens_with_latitude() {
        assert!(degree_delta(55.7, 2.0) > degree_delta(10.0, 2.0));
    }

    #[test]
    fn moscow_window_matches_expected_extent() {
        let radius_km = 0.018 * KM_PER_DEGREE * 55.70_f64.to_radians().cos();
        let bbox = BoundingBox::around(GeoPoint::new(55.70, 37.50), radius_km);

        assert!((bbox.min_lat - 55.682).abs() < 1e-9);
        assert!((bbox.max_lat - 55.718).abs() < 1e-9);
        assert!((bbox.min_lon - 37.482).abs() < 1e-9);
        assert!((bbox.max_lon - 37.518).abs() < 1e-9);
    }

    #[test]
    fn contains_is_inclusive_and_rejects_outside_points() {
        let bbox = BoundingBox {
            min_lat: 55.0,
            max_lat: 56.0,
            min_lon: 37.0,
            max_lon: 38.0,
        };

        assert!(bbox.contains(GeoPoint::new(55.0, 38.0)));
        assert!(bbox.contains(GeoPoint::new(55.5, 37.5)));
        assert!(!bbox.contains(GeoPoint::new(56.01, 37.5)));
        assert!(!bbox.contains(GeoPoint::new(55.5, 36.99)));
    }
}
