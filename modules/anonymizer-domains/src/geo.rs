use std::f64::consts::PI;
use thiserror::Error;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Smallest search radius accepted around a coordinate.
pub const MIN_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Radius below the accepted minimum
    #[error("radius must be at least {MIN_RADIUS_METERS} meters, got {0}")]
    RadiusTooSmall(f64),

    /// NaN or infinite input
    #[error("coordinates and radius must be finite numbers")]
    NotFinite,
}

/// Axis-aligned lat/lon box enclosing a circle on the earth's surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Inverse-haversine approximation: the latitude span is the arc angle of
    /// `radius_m`, the longitude span widens with `1 / |cos(lat)|`.
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Result<Self, GeoError> {
        if !(lat.is_finite() && lon.is_finite() && radius_m.is_finite()) {
            return Err(GeoError::NotFinite);
        }
        if radius_m < MIN_RADIUS_METERS {
            return Err(GeoError::RadiusTooSmall(radius_m));
        }

        let dlat = (radius_m / EARTH_RADIUS_METERS).to_degrees();
        let dlon = dlat / to_rad(lat).cos().abs();

        Ok(Self {
            lat_min: lat - dlat,
            lat_max: lat + dlat,
            lon_min: lon - dlon,
            lon_max: lon + dlon,
        })
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

fn to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Haversine distance between two lat/lon points in meters.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = to_rad(lat2 - lat1);
    let dlon = to_rad(lon2 - lon1);

    let a = (dlat / 2.0).sin().powi(2)
        + to_rad(lat1).cos() * to_rad(lat2).cos() * (dlon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_METERS * c
}
