//! Geographic coordinates.

use serde::{Deserialize, Serialize};

/// Default search radius for the "stores near me" query, in metres.
pub const DEFAULT_NEAR_RADIUS_METERS: f64 = 10_000.0;

/// Default number of stores returned by the near query.
pub const DEFAULT_NEAR_LIMIT: i64 = 10;

/// Errors that can occur when building a [`GeoPoint`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude must be between -180 and 180, got {0}")]
    Longitude(f64),
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude must be between -90 and 90, got {0}")]
    Latitude(f64),
    /// A coordinate could not be parsed as a number.
    #[error("coordinate is not a number: {0:?}")]
    NotANumber(String),
}

/// A WGS 84 point, longitude first to match `GeoJSON` and `PostGIS`.
///
/// ```
/// use delicious_core::GeoPoint;
///
/// let point = GeoPoint::new(-79.38, 43.65).unwrap();
/// assert_eq!(point.coordinates(), [-79.38, 43.65]);
/// assert!(GeoPoint::new(200.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// Build a point, rejecting out-of-range or non-finite coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Longitude`] or [`GeoError::Latitude`].
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::Longitude(lng));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        Ok(Self { lng, lat })
    }

    /// Parse a point from form or path text.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::NotANumber`] for unparsable input, otherwise the
    /// range errors from [`GeoPoint::new`].
    pub fn parse(lng: &str, lat: &str) -> Result<Self, GeoError> {
        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| GeoError::NotANumber(s.to_owned()))
        };
        Self::new(parse(lng)?, parse(lat)?)
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// `[longitude, latitude]`, the `GeoJSON` coordinate order.
    #[must_use]
    pub const fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Wire form: `{ "type": "Point", "coordinates": [lng, lat] }`.
#[derive(Serialize, Deserialize)]
struct RawPoint {
    #[serde(rename = "type", default = "point_type")]
    kind: String,
    coordinates: [f64; 2],
}

fn point_type() -> String {
    "Point".to_owned()
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        let [lng, lat] = raw.coordinates;
        Self::new(lng, lat)
    }
}

impl From<GeoPoint> for RawPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: point_type(),
            coordinates: point.coordinates(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_bounds() {
        assert!(GeoPoint::new(180.0, 90.0).is_ok());
        assert!(GeoPoint::new(-180.0, -90.0).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(GeoPoint::new(180.5, 0.0), Err(GeoError::Longitude(180.5)));
        assert_eq!(GeoPoint::new(0.0, -91.0), Err(GeoError::Latitude(-91.0)));
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_parse_text() {
        let point = GeoPoint::parse(" -79.3832 ", "43.6532").unwrap();
        assert!((point.lng() + 79.3832).abs() < f64::EPSILON);
        assert!(matches!(
            GeoPoint::parse("west", "43.6"),
            Err(GeoError::NotANumber(_))
        ));
    }

    #[test]
    fn test_geojson_shape() {
        let point = GeoPoint::new(-79.5, 43.5).unwrap();
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "Point", "coordinates": [-79.5, 43.5] })
        );

        let back: GeoPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, point);
        assert!(serde_json::from_str::<GeoPoint>(r#"{"coordinates":[0.0,95.0]}"#).is_err());
    }
}
