use geo_types::LineString;

use super::{LocationFix, RouteError};

/// Five decimal places, ~1e-5 degrees (about a meter).
pub const PRECISION: u32 = 5;

/// Encodes the ordered coordinates as a Google polyline string.
pub fn encode(fixes: &[LocationFix]) -> Result<String, RouteError> {
    // geo-types is (x, y) = (lng, lat)
    let line: LineString<f64> = fixes
        .iter()
        .map(|fix| (fix.longitude, fix.latitude))
        .collect();

    ::polyline::encode_coordinates(line, PRECISION)
        .map_err(|err| RouteError::Encode(err.to_string()))
}

/// Decodes a polyline string into `(latitude, longitude)` pairs.
pub fn decode(encoded: &str) -> Result<Vec<(f64, f64)>, RouteError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let line = ::polyline::decode_polyline(encoded, PRECISION)
        .map_err(|err| RouteError::Decode(err.to_string()))?;
    Ok(line.coords().map(|c| (c.y, c.x)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reference_polyline() {
        // Reference example from the polyline algorithm documentation.
        let fixes = [
            LocationFix::new(38.5, -120.2, 0),
            LocationFix::new(40.7, -120.95, 0),
            LocationFix::new(43.252, -126.453, 0),
        ];
        assert_eq!(encode(&fixes).unwrap(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn empty_route_encodes_to_empty_string() {
        assert_eq!(encode(&[]).unwrap(), "");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn decode_is_within_precision() {
        let fixes = [
            LocationFix::new(47.606_209, -122.332_071, 0),
            LocationFix::new(47.607_334, -122.331_245, 1000),
            LocationFix::new(47.608_112, -122.330_987, 2000),
        ];
        let decoded = decode(&encode(&fixes).unwrap()).unwrap();

        assert_eq!(decoded.len(), fixes.len());
        for (fix, (lat, lng)) in fixes.iter().zip(decoded) {
            assert!((fix.latitude - lat).abs() <= 1e-5);
            assert!((fix.longitude - lng).abs() <= 1e-5);
        }
    }

    #[test]
    fn reencoding_a_decoded_string_is_stable() {
        let encoded = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
        let fixes: Vec<LocationFix> = decode(encoded)
            .unwrap()
            .into_iter()
            .map(|(lat, lng)| LocationFix::new(lat, lng, 0))
            .collect();
        assert_eq!(encode(&fixes).unwrap(), encoded);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode("!!"), Err(RouteError::Decode(_))));
    }
}
