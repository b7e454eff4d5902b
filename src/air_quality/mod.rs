//! Air-quality lookups
//!
//! [`AirQualityProvider`] is the seam the API and dashboards depend on;
//! [`OpenWeatherClient`] talks to the OpenWeather air pollution API.

pub mod openweather;

use async_trait::async_trait;

use crate::Result;
use crate::models::{AirQualityReading, Coordinates};

pub use openweather::OpenWeatherClient;

#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    /// Current reading at `coordinates`. `label` becomes the reading's
    /// location; formatted coordinates are used when it is absent.
    async fn current(&self, coordinates: Coordinates, label: Option<&str>)
    -> Result<AirQualityReading>;
}

/// Display label for a reading: the caller's label when non-blank, else the coordinates
#[must_use]
pub fn location_label(coordinates: Coordinates, label: Option<&str>) -> String {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map_or_else(|| coordinates.label(), str::to_string)
}
