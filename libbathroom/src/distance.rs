//! Distances between points and ordering bathrooms by how close they are
use crate::{bathroom::Bathroom, map::LatLng};
use serde::Serialize;

/// Mean radius of the earth in miles
pub const EARTH_RADIUS_MILES: f64 = 3958.7613;

/// The great-circle distance between two points in miles
pub fn distance_miles(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// A bathroom together with its distance from some point of interest
#[derive(Debug, Clone, Serialize)]
pub struct NearbyBathroom {
    pub bathroom: Bathroom,
    pub distance: f64,
}

/// Orders the bathrooms by their distance from `origin`, closest first.
/// Bathrooms without usable coordinates are left out.
pub fn order_by_distance(origin: LatLng, bathrooms: Vec<Bathroom>) -> Vec<NearbyBathroom> {
    let mut nearby: Vec<NearbyBathroom> = bathrooms
        .into_iter()
        .filter_map(|bathroom| {
            let distance = distance_miles(origin, bathroom.position()?);
            Some(NearbyBathroom { bathroom, distance })
        })
        .collect();
    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng).unwrap()
    }

    fn bathroom(name: &str, lat: Option<f64>, lng: Option<f64>) -> Bathroom {
        Bathroom::new(
            name.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            lat,
            lng,
        )
    }

    #[test]
    fn test_distance() {
        let boston = point(42.3601, -71.0589);
        let nyc = point(40.7128, -74.0060);
        let d = distance_miles(boston, nyc);
        assert!((d - 190.2).abs() < 1.0, "unexpected distance {d}");
        assert_eq!(distance_miles(boston, boston), 0.0);
        assert!((distance_miles(nyc, boston) - d).abs() < 1e-9);

        // a quarter of the way around the equator
        let d = distance_miles(point(0.0, 0.0), point(0.0, 90.0));
        assert!((d - EARTH_RADIUS_MILES * std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_order_by_distance() {
        let origin = point(42.3946, -71.177);
        let nearby = order_by_distance(
            origin,
            vec![
                bathroom("far", Some(40.0), Some(-73.0)),
                bathroom("unknown", None, None),
                bathroom("zero", Some(0.0), Some(0.0)),
                bathroom("here", Some(42.3946), Some(-71.177)),
                bathroom("near", Some(42.367), Some(-71.106)),
            ],
        );
        let names: Vec<&str> = nearby.iter().map(|n| n.bathroom.name.as_str()).collect();
        assert_eq!(names, vec!["here", "near", "far"]);
        assert_eq!(nearby[0].distance, 0.0);
        assert!(nearby[1].distance > 3.0 && nearby[1].distance < 5.0);

        assert!(order_by_distance(origin, Vec::new()).is_empty());
    }
}
