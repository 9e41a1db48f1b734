//! Core library for the weather & website fulfillment webhook.
//!
//! This crate defines:
//! - Configuration handling
//! - Outbound lookups (Open-Meteo geocoding and forecast, the fixed website)
//! - Paragraph extraction and relevance matching
//! - The intent router that turns a webhook request into fulfillment text
//!
//! It is used by `webhook-server`, but holds no HTTP server code itself.

pub mod config;
pub mod fulfillment;
pub mod matcher;
pub mod model;
pub mod provider;
pub mod weather_codes;

pub use config::Config;
pub use fulfillment::{Fulfiller, Outcome};
pub use matcher::{MatchPolicy, RelevanceMatcher};
pub use model::{FulfillmentResponse, IntentRequest, Location, LocationParam, WeatherReading};
pub use provider::{
    Geocoder, PageFetcher, Providers, UpstreamError, WeatherProvider, providers_from_config,
};
pub use weather_codes::WeatherCodes;
