//! Great-circle distance for the `nearby` feed filter

const EARTH_RADIUS_MILES: f64 = 3958.8;
const MILES_PER_DEGREE_LAT: f64 = 69.0;

pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}

/// Coarse lat/long box around a point, used to prefilter candidates in SQL
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

pub fn bounding_box(lat: f64, lon: f64, miles: f64) -> BoundingBox {
    let d_lat = miles / MILES_PER_DEGREE_LAT;
    // Longitude degrees shrink towards the poles; clamp to avoid dividing by ~0
    let cos_lat = lat.to_radians().cos().abs().max(0.01);
    let d_lon = miles / (MILES_PER_DEGREE_LAT * cos_lat);
    BoundingBox {
        min_lat: lat - d_lat,
        max_lat: lat + d_lat,
        min_lon: lon - d_lon,
        max_lon: lon + d_lon,
    }
}
