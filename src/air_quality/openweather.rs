//! OpenWeather air pollution API client

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::{AirQualityProvider, location_label};
use crate::config::AirQualityConfig;
use crate::models::{AirQualityReading, Aqi, Coordinates, Pollutant};
use crate::{OnTymError, Result};

/// Raw `/air_pollution` payload
#[derive(Debug, Deserialize)]
pub struct AirPollutionResponse {
    #[serde(default)]
    pub list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionEntry {
    pub main: AirPollutionMain,
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionMain {
    pub aqi: u8,
}

impl AirPollutionResponse {
    /// Convert the first entry into a reading. Unknown component keys are ignored.
    pub fn into_reading(self, location: String) -> Result<AirQualityReading> {
        let entry = self.list.into_iter().next().ok_or_else(|| {
            OnTymError::response_format("Air quality response contained no readings", "")
        })?;

        let aqi = Aqi::try_from(entry.main.aqi).map_err(|_| {
            OnTymError::response_format(
                format!("Air quality index {} is outside 1..5", entry.main.aqi),
                entry.main.aqi.to_string(),
            )
        })?;

        let components = Pollutant::ALL
            .iter()
            .filter_map(|p| entry.components.get(p.code()).map(|v| (*p, *v)))
            .collect();

        Ok(AirQualityReading::new(aqi, components, location))
    }
}

/// Map a transport failure. The request URL carries the API key, so it is
/// stripped before the error is logged or returned.
fn request_failure(e: reqwest::Error) -> OnTymError {
    let e = e.without_url();
    error!("Air quality request failed: {}", e);
    if e.is_timeout() {
        OnTymError::upstream("Air quality request timed out")
    } else {
        OnTymError::upstream(format!("Air quality request failed: {e}"))
    }
}

/// Map an HTTP status and body to a reading
fn decode_response(status: StatusCode, body: &str, location: String) -> Result<AirQualityReading> {
    if status == StatusCode::UNAUTHORIZED {
        error!("API authentication failed (HTTP 401)");
        return Err(OnTymError::upstream(
            "Invalid API key. Please check your OpenWeather API key.",
        ));
    }
    if !status.is_success() {
        warn!(%status, "Air quality provider returned an error");
        return Err(OnTymError::upstream(format!(
            "Air quality provider returned HTTP {status}"
        )));
    }

    let parsed: AirPollutionResponse = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse air quality response: {}", e);
        OnTymError::response_format(format!("Invalid air quality data: {e}"), body)
    })?;

    parsed.into_reading(location)
}

/// Client for OpenWeather's current air pollution endpoint
pub struct OpenWeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &AirQualityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("ontym/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OnTymError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AirQualityProvider for OpenWeatherClient {
    #[instrument(skip(self), fields(lat = coordinates.latitude, lon = coordinates.longitude))]
    async fn current(
        &self,
        coordinates: Coordinates,
        label: Option<&str>,
    ) -> Result<AirQualityReading> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            OnTymError::config(
                "Air quality API key is not configured. Set air_quality.api_key or ONTYM__AIR_QUALITY__API_KEY.",
            )
        })?;

        info!(
            "Getting air quality for coordinates: {:.4}, {:.4}",
            coordinates.latitude, coordinates.longitude
        );
        let start_time = Instant::now();

        let url = format!(
            "{}/air_pollution?lat={}&lon={}&appid={}",
            self.base_url,
            coordinates.latitude,
            coordinates.longitude,
            urlencoding::encode(api_key)
        );
        debug!("Air pollution request for {}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(request_failure)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(request_failure)?;

        let reading = decode_response(status, &body, location_label(coordinates, label))?;

        let total_duration = start_time.elapsed();
        info!(
            aqi = reading.aqi.value(),
            "Retrieved air quality in {:.3}s",
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 5 {
            warn!(
                "Slow air quality response: {:.3}s",
                total_duration.as_secs_f64()
            );
        }

        Ok(reading)
    }
}
