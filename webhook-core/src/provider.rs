use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{fmt::Debug, time::Duration};

use crate::{
    Config,
    model::{Location, WeatherReading},
    provider::{open_meteo::OpenMeteoProvider, website::HttpPageFetcher},
};

pub mod open_meteo;
pub mod website;

const USER_AGENT: &str = concat!("weather-webhook/", env!("CARGO_PKG_VERSION"));

/// Failure of an outbound lookup. Every variant is recovered by the caller.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{service} returned a malformed payload: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    pub fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| UpstreamError::Transport { service, source }
    }

    pub fn malformed(service: &'static str, reason: impl ToString) -> Self {
        UpstreamError::Malformed {
            service,
            reason: reason.to_string(),
        }
    }
}

/// Free-text place name → best single match.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` means the lookup succeeded but matched nothing.
    async fn locate(&self, place: &str) -> Result<Option<Location>, UpstreamError>;
}

/// Current conditions at a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherReading, UpstreamError>;
}

/// Raw markup of a web page.
#[async_trait]
pub trait PageFetcher: Send + Sync + Debug {
    async fn fetch(&self, url: &str) -> Result<String, UpstreamError>;
}

/// Shared client for one upstream service, with explicit timeout and user agent.
pub fn http_client(timeout: Duration) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(UpstreamError::transport("http client"))
}

/// Reads the body and rejects non-2xx responses.
pub(crate) async fn read_success_body(
    service: &'static str,
    res: reqwest::Response,
) -> Result<String, UpstreamError> {
    let status = res.status();
    let body = res.text().await.map_err(UpstreamError::transport(service))?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            service,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

/// The live lookups, built from config.
#[derive(Debug)]
pub struct Providers {
    pub geocoder: Box<dyn Geocoder>,
    pub weather: Box<dyn WeatherProvider>,
    pub pages: Box<dyn PageFetcher>,
}

/// Construct the Open-Meteo and website lookups described by `config`.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Providers> {
    let timeout = config.timeouts.request();
    let open_meteo = OpenMeteoProvider::new(
        &config.endpoints.geocoding,
        &config.endpoints.forecast,
        timeout,
    )?;

    Ok(Providers {
        geocoder: Box::new(open_meteo.clone()),
        weather: Box::new(open_meteo),
        pages: Box::new(HttpPageFetcher::new(timeout)?),
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
