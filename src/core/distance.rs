use crate::models::{BoundingBox, Coordinate};

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (haversine)
#[inline]
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.min(1.0).sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

/// Calculate a bounding box around a center point
///
/// Cheaper than haversine, used to discard far colleges before the exact
/// distance is computed. The latitude half-height is the angular radius; the
/// longitude half-width is `asin(sin(d) / cos(lat))`, the widest a spherical
/// cap of angular radius `d` gets. Degrees are taken as 111km, slightly under
/// the true 111.19km, so the box errs on the large side.
/// When the cap touches a pole the box spans every longitude.
pub fn calculate_bounding_box(center: &Coordinate, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;
    let min_lat = center.lat - lat_delta;
    let max_lat = center.lat + lat_delta;

    let angular = lat_delta.to_radians();
    let cos_lat = center.lat.to_radians().cos().abs();

    if min_lat <= -90.0 || max_lat >= 90.0 || angular.sin() >= cos_lat {
        return BoundingBox {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            min_lon: -180.0,
            max_lon: 180.0,
        };
    }

    let lon_delta = (angular.sin() / cos_lat).asin().to_degrees();

    BoundingBox {
        min_lat,
        max_lat,
        min_lon: center.lon - lon_delta,
        max_lon: center.lon + lon_delta,
    }
}

/// Check if a point is within a bounding box, honouring antimeridian wrap
#[inline]
pub fn is_within_bounding_box(point: &Coordinate, bbox: &BoundingBox) -> bool {
    if point.lat < bbox.min_lat || point.lat > bbox.max_lat {
        return false;
    }

    if bbox.min_lon < -180.0 {
        point.lon >= bbox.min_lon + 360.0 || point.lon <= bbox.max_lon
    } else if bbox.max_lon > 180.0 {
        point.lon >= bbox.min_lon || point.lon <= bbox.max_lon - 360.0
    } else {
        point.lon >= bbox.min_lon && point.lon <= bbox.max_lon
    }
}

/// Proximity score in (0, 1]: 1 at distance 0, halves at 10 km
#[inline]
pub fn distance_score(distance_km: f64) -> f64 {
    1.0 / (1.0 + distance_km.max(0.0) / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELHI: Coordinate = Coordinate { lat: 28.6139, lon: 77.2090 };
    const MUMBAI: Coordinate = Coordinate { lat: 19.0760, lon: 72.8777 };

    #[test]
    fn test_haversine_distance() {
        // Delhi to Mumbai is roughly 1150 km
        let distance = haversine_distance(&DELHI, &MUMBAI);
        assert!((distance - 1150.0).abs() < 20.0, "Distance should be ~1150km, got {}", distance);
    }

    #[test]
    fn test_haversine_symmetric_and_zero() {
        assert_eq!(haversine_distance(&DELHI, &MUMBAI), haversine_distance(&MUMBAI, &DELHI));
        assert_eq!(haversine_distance(&DELHI, &DELHI), 0.0);
    }

    #[test]
    fn test_haversine_antipodal_is_finite() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let distance = haversine_distance(&a, &b);
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1.0);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = calculate_bounding_box(&DELHI, 10.0);

        assert!(bbox.min_lat < DELHI.lat);
        assert!(bbox.max_lat > DELHI.lat);
        assert!(bbox.min_lon < DELHI.lon);
        assert!(bbox.max_lon > DELHI.lon);

        // Check approximate size (20km / 111km per degree = ~0.18 degrees)
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.18).abs() < 0.02, "Lat span should be ~0.18 degrees");
    }

    #[test]
    fn test_point_within_bbox() {
        let bbox = calculate_bounding_box(&DELHI, 10.0);

        assert!(is_within_bounding_box(&DELHI, &bbox));
        assert!(is_within_bounding_box(&Coordinate::new(28.62, 77.22), &bbox));
        assert!(!is_within_bounding_box(&MUMBAI, &bbox));
    }

    #[test]
    fn test_bbox_wraps_antimeridian() {
        let center = Coordinate::new(0.0, 179.9);
        let bbox = calculate_bounding_box(&center, 50.0);
        assert!(is_within_bounding_box(&Coordinate::new(0.0, -179.9), &bbox));
        assert!(!is_within_bounding_box(&Coordinate::new(0.0, 0.0), &bbox));
    }

    #[test]
    fn test_huge_radius_covers_everything() {
        let bbox = calculate_bounding_box(&DELHI, 20000.0);
        assert!(is_within_bounding_box(&Coordinate::new(-45.0, -120.0), &bbox));
    }

    /// Every grid point within `radius_km` of `center` must fall inside the box
    fn assert_box_covers_radius(center: Coordinate, radius_km: f64) {
        let bbox = calculate_bounding_box(&center, radius_km);
        let mut lat = -89.5;
        while lat < 90.0 {
            let mut lon = -179.5;
            while lon < 180.0 {
                let point = Coordinate::new(lat, lon);
                if haversine_distance(&center, &point) <= radius_km {
                    assert!(
                        is_within_bounding_box(&point, &bbox),
                        "({}, {}) is within {} km of {:?} but outside {:?}",
                        lat, lon, radius_km, center, bbox
                    );
                }
                lon += 0.5;
            }
            lat += 0.5;
        }
    }

    #[test]
    fn test_bbox_covers_large_radii() {
        assert_box_covers_radius(Coordinate::new(20.0, 0.0), 5000.0);
        assert_box_covers_radius(DELHI, 5000.0);
        assert_box_covers_radius(Coordinate::new(60.0, 100.0), 2000.0);
        assert_box_covers_radius(Coordinate::new(-35.0, 170.0), 3000.0);
        assert_box_covers_radius(Coordinate::new(10.0, -175.0), 1200.0);
    }

    #[test]
    fn test_bbox_keeps_point_near_edge_of_wide_radius() {
        // ~4980 km from (20, 0), where the cap is widest in longitude
        let center = Coordinate::new(20.0, 0.0);
        let edge = Coordinate::new(26.0, 48.5);
        assert!(haversine_distance(&center, &edge) < 5000.0);

        let bbox = calculate_bounding_box(&center, 5000.0);
        assert!(is_within_bounding_box(&edge, &bbox));
        assert!(!is_within_bounding_box(&Coordinate::new(20.0, 60.0), &bbox));
    }

    #[test]
    fn test_distance_score_curve() {
        assert_eq!(distance_score(0.0), 1.0);
        assert!((distance_score(10.0) - 0.5).abs() < 1e-12);
        assert!(distance_score(5.0) > distance_score(40.0));
        assert!(distance_score(10_000.0) > 0.0);
    }
}
