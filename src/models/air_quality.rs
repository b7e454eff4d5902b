//! Air-quality reading model

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{OnTymError, Result};

/// Measured airborne substance, keyed by the provider's component code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "co")]
    Co,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "no2")]
    No2,
    #[serde(rename = "o3")]
    O3,
    #[serde(rename = "so2")]
    So2,
    #[serde(rename = "pm2_5")]
    Pm25,
    #[serde(rename = "pm10")]
    Pm10,
    #[serde(rename = "nh3")]
    Nh3,
}

impl Pollutant {
    /// Every component the provider can report
    pub const ALL: [Pollutant; 8] = [
        Pollutant::Co,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::Nh3,
    ];

    /// Components a reading must carry before it can be sent to the AI proxy,
    /// in prompt order
    pub const CORE: [Pollutant; 5] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::O3,
        Pollutant::No2,
        Pollutant::Co,
    ];

    /// Provider component key (`pm2_5`, `o3`, ...)
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::No => "no",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::So2 => "so2",
            Pollutant::Pm25 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::Nh3 => "nh3",
        }
    }

    /// Human label (`PM2.5`, `O3`, ...)
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Co => "CO",
            Pollutant::No => "NO",
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::Nh3 => "NH3",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Air Quality Index bucket, 1 (good) to 5 (very poor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Aqi(u8);

impl Aqi {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Qualitative name of the bucket
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self.0 {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            _ => "Very Poor",
        }
    }
}

impl TryFrom<u8> for Aqi {
    type Error = OnTymError;

    fn try_from(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OnTymError::validation(format!(
                "AQI must be between {} and {}, got: {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }
}

impl From<Aqi> for u8 {
    fn from(aqi: Aqi) -> Self {
        aqi.0
    }
}

impl fmt::Display for Aqi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of pollutant concentrations (µg/m³) at one place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub aqi: Aqi,
    pub components: BTreeMap<Pollutant, f64>,
    /// Display label: place name or formatted coordinates
    #[serde(default)]
    pub location: String,
}

impl AirQualityReading {
    #[must_use]
    pub fn new(aqi: Aqi, components: BTreeMap<Pollutant, f64>, location: String) -> Self {
        Self {
            aqi,
            components,
            location,
        }
    }

    /// Concentration for one pollutant, if the provider reported it
    #[must_use]
    pub fn concentration(&self, pollutant: Pollutant) -> Option<f64> {
        self.components.get(&pollutant).copied()
    }

    /// Fails with a validation error naming every missing core component
    pub fn ensure_core_components(&self) -> Result<()> {
        let missing: Vec<&str> = Pollutant::CORE
            .iter()
            .filter(|p| !self.components.get(p).is_some_and(|v| v.is_finite()))
            .map(|p| p.code())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OnTymError::validation(format!(
                "air quality reading is missing components: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_json() -> &'static str {
        r#"{"aqi":4,"components":{"o3":75.0,"no2":20.0,"pm10":30.0,"pm2_5":10.0,"co":5.0}}"#
    }

    #[test]
    fn test_reading_from_wire_json() {
        let reading: AirQualityReading = serde_json::from_str(reading_json()).unwrap();
        assert_eq!(reading.aqi.value(), 4);
        assert_eq!(reading.concentration(Pollutant::O3), Some(75.0));
        assert_eq!(reading.concentration(Pollutant::Pm25), Some(10.0));
        assert_eq!(reading.concentration(Pollutant::So2), None);
        assert!(reading.location.is_empty());
        assert!(reading.ensure_core_components().is_ok());
    }

    #[test]
    fn test_reading_serializes_provider_keys() {
        let reading: AirQualityReading = serde_json::from_str(reading_json()).unwrap();
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["aqi"], 4);
        assert_eq!(value["components"]["pm2_5"], 10.0);
    }

    #[test]
    fn test_aqi_out_of_range_is_rejected() {
        assert!(Aqi::try_from(0u8).is_err());
        assert!(Aqi::try_from(6u8).is_err());
        assert_eq!(Aqi::try_from(5u8).unwrap().describe(), "Very Poor");

        let result: std::result::Result<AirQualityReading, _> =
            serde_json::from_str(r#"{"aqi":9,"components":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_core_components_are_named() {
        let reading: AirQualityReading =
            serde_json::from_str(r#"{"aqi":2,"components":{"o3":12.0,"co":200.0}}"#).unwrap();
        let err = reading.ensure_core_components().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("pm2_5"));
        assert!(message.contains("pm10"));
        assert!(message.contains("no2"));
        assert!(!message.contains("o3"));
    }

    #[test]
    fn test_pollutant_labels() {
        assert_eq!(Pollutant::Pm25.to_string(), "PM2.5");
        assert_eq!(Pollutant::Pm25.code(), "pm2_5");
        assert_eq!(Pollutant::ALL.len(), 8);
    }
}
