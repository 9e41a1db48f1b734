use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::model::{Location, WeatherReading};

use super::{Geocoder, UpstreamError, WeatherProvider, http_client, read_success_body};

const GEOCODING: &str = "geocoding";
const FORECAST: &str = "forecast";

/// Open-Meteo geocoding and forecast APIs. Neither needs an API key.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    geocoding_url: String,
    forecast_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(
        geocoding_url: &str,
        forecast_url: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            geocoding_url: geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: forecast_url.trim_end_matches('/').to_string(),
            http: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: ForecastCurrent,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    time: String,
    temperature_2m: f64,
    wind_speed_10m: f64,
    #[serde(alias = "weathercode")]
    weather_code: i32,
}

#[async_trait]
impl Geocoder for OpenMeteoProvider {
    #[instrument(skip(self), level = "debug")]
    async fn locate(&self, place: &str) -> Result<Option<Location>, UpstreamError> {
        let url = format!("{}/search", self.geocoding_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("name", place),
                ("count", "1"),
                ("language", "no"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(UpstreamError::transport(GEOCODING))?;

        let body = read_success_body(GEOCODING, res).await?;
        let parsed: GeoResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::malformed(GEOCODING, e))?;

        Ok(parsed.results.into_iter().next().map(|r| Location {
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
        }))
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[instrument(skip(self), level = "debug")]
    async fn current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReading, UpstreamError> {
        let url = format!("{}/forecast", self.forecast_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string().as_str()),
                ("longitude", longitude.to_string().as_str()),
                ("current", "temperature_2m,wind_speed_10m,weather_code"),
                ("wind_speed_unit", "ms"),
                ("timezone", "auto"),
            ])
            .send()
            .await
            .map_err(UpstreamError::transport(FORECAST))?;

        let body = read_success_body(FORECAST, res).await?;
        let parsed: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::malformed(FORECAST, e))?;

        let current = parsed.current;
        Ok(WeatherReading {
            temperature_c: current.temperature_2m,
            wind_speed_ms: current.wind_speed_10m,
            weather_code: current.weather_code,
            time: current.time,
        })
    }
}
