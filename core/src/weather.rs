//! Weather lookup boundary.
//!
//! The only boundary with a bit-exact external contract: implementations
//! backed by a public HTTP weather API send coordinates rounded to 3
//! decimal places and receive a JSON body whose `main` object carries
//! optional `temp` and `humidity` fields. The rounding rule and the
//! response shape live here so every implementation (and every test
//! double) agrees on them; the HTTP client itself is out of scope.

use crate::geo::{Coordinate, Region};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors produced by the weather boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// The underlying weather provider failed.
    #[error("weather lookup failed: {0}")]
    Service(String),
}

/// A weather observation for a region.
///
/// Both fields are optional: providers omit what they cannot measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct WeatherReading {
    /// Temperature, provider units
    pub temp: Option<f64>,
    /// Relative humidity, percent
    pub humidity: Option<f64>,
}

/// Wire shape of a weather provider response body.
///
/// ```json
/// { "main": { "temp": 285.2, "humidity": 72 } }
/// ```
///
/// Unknown sibling fields are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct WeatherResponse {
    /// The observation payload
    pub main: WeatherReading,
}

/// Round a coordinate component to 3 decimal places, the precision the
/// weather contract expects.
#[must_use]
pub fn round_coordinate(value: f64) -> f64 {
    (1000.0 * value).round() / 1000.0
}

/// The coordinates a weather request for `region` must carry:
/// the region center, rounded per the contract.
#[must_use]
pub fn request_coordinate(region: Region) -> Coordinate {
    Coordinate::new(
        round_coordinate(region.center.latitude),
        round_coordinate(region.center.longitude),
    )
}

/// Weather lookup capability.
///
/// # Dyn Compatibility
///
/// Uses an explicit `Pin<Box<dyn Future>>` return instead of `async fn`
/// to enable trait object usage (`Arc<dyn WeatherService>`).
pub trait WeatherService: Send + Sync {
    /// Fetch the current weather for a map region.
    ///
    /// Produces exactly one value, success or failure.
    fn fetch(
        &self,
        region: Region,
    ) -> Pin<Box<dyn Future<Output = Result<WeatherReading, WeatherError>> + Send + '_>>;
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code can use expect
mod tests {
    use super::*;
    use crate::geo::Span;

    #[test]
    fn rounds_to_three_decimals() {
        assert!((round_coordinate(40.712_776) - 40.713).abs() < f64::EPSILON);
        assert!((round_coordinate(-74.005_974) - -74.006).abs() < f64::EPSILON);
        assert!((round_coordinate(0.0004) - 0.0).abs() < f64::EPSILON);
        assert!((round_coordinate(0.0005) - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn request_coordinate_uses_region_center() {
        let region = Region::new(
            Coordinate::new(40.712_776, -74.005_974),
            Span::new(0.075, 0.075),
        );

        let coordinate = request_coordinate(region);
        assert_eq!(coordinate, Coordinate::new(40.713, -74.006));
    }

    #[test]
    fn response_body_decodes() {
        let body = r#"{ "main": { "temp": 285.2, "humidity": 72.0 }, "name": "NYC" }"#;
        let response: WeatherResponse =
            serde_json::from_str(body).expect("valid body must decode");

        assert_eq!(response.main.temp, Some(285.2));
        assert_eq!(response.main.humidity, Some(72.0));
    }

    #[test]
    fn missing_fields_decode_as_none() {
        let body = r#"{ "main": {} }"#;
        let response: Result<WeatherResponse, _> = serde_json::from_str(body);

        assert_eq!(
            response.ok().map(|r| r.main),
            Some(WeatherReading {
                temp: None,
                humidity: None
            })
        );
    }
}
