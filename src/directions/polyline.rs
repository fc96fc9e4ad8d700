//! Decoding of encoded polylines (precision 5) returned as overview paths

use crate::models::GeoPosition;
use crate::{Result, WayGoError};

/// Decode an encoded polyline into an ordered list of positions
pub fn decode(encoded: &str) -> Result<Vec<GeoPosition>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut path = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, next_value(bytes, &mut index)?)?;
        lng = accumulate(lng, next_value(bytes, &mut index)?)?;
        path.push(GeoPosition::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    Ok(path)
}

fn accumulate(total: i64, delta: i64) -> Result<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| WayGoError::validation("polyline value overflow"))
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| WayGoError::validation("truncated polyline"))?;
        *index += 1;

        if !(63..127).contains(&byte) {
            return Err(WayGoError::validation(format!(
                "invalid polyline character '{}'",
                byte as char
            )));
        }
        if shift > 60 {
            return Err(WayGoError::validation("polyline value overflow"));
        }

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &GeoPosition, lat: f64, lng: f64) {
        assert!((actual.latitude - lat).abs() < 1e-6, "lat {} != {lat}", actual.latitude);
        assert!((actual.longitude - lng).abs() < 1e-6, "lng {} != {lng}", actual.longitude);
    }

    #[test]
    fn test_reference_polyline() {
        let path = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(path.len(), 3);
        assert_close(&path[0], 38.5, -120.2);
        assert_close(&path[1], 40.7, -120.95);
        assert_close(&path[2], 43.252, -126.453);
    }

    #[test]
    fn test_empty_polyline() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_polyline() {
        // latitude without its longitude
        assert!(decode("_p~iF").is_err());
    }

    #[test]
    fn test_oversized_deltas_are_rejected() {
        // each value decodes to about 2^61, the third latitude delta no longer fits
        let encoded = ("~".repeat(12) + "H").repeat(6);
        let err = decode(&encoded).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_invalid_character() {
        assert!(decode("_p~iF ~ps|U").is_err());
    }
}
