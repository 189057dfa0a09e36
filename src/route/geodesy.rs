use super::LocationFix;

/// Mean earth radius used by the map SDKs for spherical lengths.
pub const EARTH_RADIUS_M: f64 = 6_371_009.0;

pub const METERS_TO_MILES: f64 = 0.00062137;

/// Great-circle distance in meters between two coordinates (degrees).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Length in meters of the path through `fixes`, in order. Zero for fewer than
/// two points.
pub fn path_length_m(fixes: &[LocationFix]) -> f64 {
    fixes
        .windows(2)
        .map(|pair| {
            haversine_distance(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            )
        })
        .sum()
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters * METERS_TO_MILES
}
