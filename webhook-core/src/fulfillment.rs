//! Intent routing and response composition.
//!
//! Every outbound lookup ends in an [`Outcome`]; outcomes are only flattened
//! into text when the [`FulfillmentResponse`] is built, so nothing past
//! [`Fulfiller::fulfill`] can fail.

use chrono::NaiveDateTime;

use crate::{
    Config,
    matcher::{RelevanceMatcher, extract_paragraphs},
    model::{FulfillmentResponse, IntentRequest, Location, WeatherReading},
    provider::{Geocoder, PageFetcher, Providers, WeatherProvider},
    weather_codes::WeatherCodes,
};

pub const WEATHER_INTENT: &str = "get_weather";
pub const WEBSITE_INTENT: &str = "get_website_info";

pub const NOT_UNDERSTOOD_TEXT: &str = "Jeg forsto ikke forespørselen.";
pub const WEATHER_FAILED_TEXT: &str = "Klarte ikke hente værdata.";
pub const WEBSITE_FAILED_TEXT: &str = "Klarte ikke hente innhold fra nettsiden.";

/// Result of one outbound boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    /// The lookup failed; carries the fixed user-facing replacement text.
    Degraded(&'static str),
}

impl Outcome<String> {
    pub fn into_text(self) -> String {
        match self {
            Outcome::Ok(text) => text,
            Outcome::Degraded(message) => message.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }
}

/// Handles webhook requests. Holds only immutable data and is shared across requests.
#[derive(Debug)]
pub struct Fulfiller {
    geocoder: Box<dyn Geocoder>,
    weather: Box<dyn WeatherProvider>,
    pages: Box<dyn PageFetcher>,
    codes: WeatherCodes,
    matcher: RelevanceMatcher,
    fallback: Location,
    website_url: String,
}

impl Fulfiller {
    pub fn new(config: &Config, providers: Providers) -> Self {
        Self {
            geocoder: providers.geocoder,
            weather: providers.weather,
            pages: providers.pages,
            codes: WeatherCodes::default(),
            matcher: RelevanceMatcher::new(config.website.policy, &config.website.keywords),
            fallback: config.fallback.clone(),
            website_url: config.website.url.clone(),
        }
    }

    /// Dispatch on the exact intent name.
    pub async fn fulfill(&self, request: &IntentRequest) -> FulfillmentResponse {
        let intent = request.intent_name();
        tracing::info!(intent, "Handling webhook request");

        let text = match intent {
            WEATHER_INTENT => {
                let location = self.resolve_location(request.place_name()).await;
                self.weather_text(&location).await.into_text()
            }
            WEBSITE_INTENT => self.website_text(request.query_text()).await.into_text(),
            other => {
                tracing::debug!(intent = other, "Unrecognised intent");
                NOT_UNDERSTOOD_TEXT.to_string()
            }
        };

        FulfillmentResponse::new(text)
    }

    /// Best geocoding match, or the configured fallback when there is no place
    /// name, no match, or the lookup fails.
    pub async fn resolve_location(&self, place: Option<&str>) -> Location {
        let Some(place) = place.map(str::trim).filter(|p| !p.is_empty()) else {
            tracing::debug!("No place name given, using {}", self.fallback.name);
            return self.fallback.clone();
        };

        match self.geocoder.locate(place).await {
            Ok(Some(location)) => location,
            Ok(None) => {
                tracing::info!(place, "No geocoding match, using {}", self.fallback.name);
                self.fallback.clone()
            }
            Err(err) => {
                tracing::warn!(place, error = %err, "Geocoding failed");
                self.fallback.clone()
            }
        }
    }

    pub async fn weather_text(&self, location: &Location) -> Outcome<String> {
        match self
            .weather
            .current(location.latitude, location.longitude)
            .await
        {
            Ok(reading) => Outcome::Ok(format_weather(&self.codes, &location.name, &reading)),
            Err(err) => {
                tracing::warn!(place = %location.name, error = %err, "Weather lookup failed");
                Outcome::Degraded(WEATHER_FAILED_TEXT)
            }
        }
    }

    pub async fn website_text(&self, utterance: &str) -> Outcome<String> {
        let url = self.website_url.as_str();

        match self.pages.fetch(url).await {
            Ok(html) => {
                let paragraphs = extract_paragraphs(&html);
                tracing::debug!(
                    paragraphs = paragraphs.len(),
                    policy = %self.matcher.policy(),
                    "Scanned website"
                );
                Outcome::Ok(self.matcher.answer(&paragraphs, utterance, url))
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "Website fetch failed");
                Outcome::Degraded(WEBSITE_FAILED_TEXT)
            }
        }
    }
}

/// Multi-line weather summary for a place.
pub fn format_weather(codes: &WeatherCodes, place: &str, reading: &WeatherReading) -> String {
    format!(
        "Været i {place}:\n{}\n🌡️ Temperatur: {}°C\n💨 Vind: {} m/s\n🕒 Målt: {}",
        codes.describe(reading.weather_code),
        reading.temperature_c,
        reading.wind_speed_ms,
        format_observation_time(&reading.time),
    )
}

/// `2024-05-17T14:30` → `17.05.2024 kl. 14:30`; anything else is returned unchanged.
fn format_observation_time(raw: &str) -> String {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.format("%d.%m.%Y kl. %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        matcher::{MatchPolicy, NOT_FOUND_TEXT},
        model::LocationParam,
        provider::UpstreamError,
        weather_codes::UNKNOWN_CONDITIONS,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct FakeGeocoder {
        result: Option<Location>,
        fail: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn locate(&self, place: &str) -> Result<Option<Location>, UpstreamError> {
            self.seen.lock().unwrap().push(place.to_string());
            if self.fail {
                return Err(UpstreamError::malformed("geocoding", "boom"));
            }
            Ok(self.result.clone())
        }
    }

    #[derive(Debug)]
    struct FakeWeather {
        reading: Option<WeatherReading>,
        seen: Arc<Mutex<Vec<(f64, f64)>>>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<WeatherReading, UpstreamError> {
            self.seen.lock().unwrap().push((latitude, longitude));
            self.reading
                .clone()
                .ok_or_else(|| UpstreamError::malformed("forecast", "missing current"))
        }
    }

    #[derive(Debug)]
    struct FakePages {
        html: Option<&'static str>,
    }

    #[async_trait]
    impl PageFetcher for FakePages {
        async fn fetch(&self, _url: &str) -> Result<String, UpstreamError> {
            self.html
                .map(str::to_string)
                .ok_or_else(|| UpstreamError::malformed("website", "connection refused"))
        }
    }

    fn reading(code: i32) -> WeatherReading {
        WeatherReading {
            temperature_c: 12.5,
            wind_speed_ms: 3.2,
            weather_code: code,
            time: "2024-05-17T14:30".to_string(),
        }
    }

    struct Harness {
        fulfiller: Fulfiller,
        places: Arc<Mutex<Vec<String>>>,
        coords: Arc<Mutex<Vec<(f64, f64)>>>,
    }

    fn harness(
        geocoder: FakeGeocoder,
        weather: Option<WeatherReading>,
        html: Option<&'static str>,
        policy: MatchPolicy,
    ) -> Harness {
        let places = geocoder.seen.clone();
        let coords = Arc::new(Mutex::new(Vec::new()));
        let mut config = Config::default();
        config.website.policy = policy;

        let providers = Providers {
            geocoder: Box::new(geocoder),
            weather: Box::new(FakeWeather {
                reading: weather,
                seen: coords.clone(),
            }),
            pages: Box::new(FakePages { html }),
        };

        Harness {
            fulfiller: Fulfiller::new(&config, providers),
            places,
            coords,
        }
    }

    fn site_harness(html: Option<&'static str>, policy: MatchPolicy) -> Harness {
        harness(FakeGeocoder::default(), None, html, policy)
    }

    fn bergen() -> Location {
        Location {
            name: "Bergen".to_string(),
            latitude: 60.39,
            longitude: 5.32,
        }
    }

    fn weather_request(place: &str) -> IntentRequest {
        let location = LocationParam::Name(place.to_string());
        IntentRequest::new(WEATHER_INTENT, Some(location), None)
    }

    #[tokio::test]
    async fn unknown_intents_are_not_understood() {
        let h = harness(
            FakeGeocoder::default(),
            Some(reading(0)),
            Some("<p>x</p>"),
            MatchPolicy::Keyword,
        );

        for intent in ["", "Default Welcome Intent", "GET_WEATHER", "get_weather "] {
            let request = IntentRequest::new(
                intent,
                Some(LocationParam::Name("Bergen".to_string())),
                Some("hva er telefonnummeret".to_string()),
            );
            let response = h.fulfiller.fulfill(&request).await;
            assert_eq!(response.fulfillment_text, NOT_UNDERSTOOD_TEXT);
        }
        assert!(h.places.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weather_intent_geocodes_plain_place_name() {
        let geocoder = FakeGeocoder {
            result: Some(bergen()),
            ..Default::default()
        };
        let h = harness(geocoder, Some(reading(3)), None, MatchPolicy::Keyword);

        let response = h.fulfiller.fulfill(&weather_request("Bergen")).await;
        let text = response.fulfillment_text;

        assert_eq!(*h.places.lock().unwrap(), vec!["Bergen".to_string()]);
        assert_eq!(*h.coords.lock().unwrap(), vec![(60.39, 5.32)]);
        assert!(text.starts_with("Været i Bergen:\n☁️ Overskyet\n"));
        assert!(text.contains("12.5°C"));
        assert!(text.contains("3.2 m/s"));
        assert!(text.ends_with("17.05.2024 kl. 14:30"));
    }

    #[tokio::test]
    async fn weather_intent_uses_city_then_country() {
        let h = harness(
            FakeGeocoder::default(),
            Some(reading(0)),
            None,
            MatchPolicy::Keyword,
        );

        let city = LocationParam::Place {
            city: Some("Trondheim".to_string()),
            country: None,
        };
        let request = IntentRequest::new(WEATHER_INTENT, Some(city), None);
        h.fulfiller.fulfill(&request).await;

        let country = LocationParam::Place {
            city: None,
            country: Some("Norge".to_string()),
        };
        let request = IntentRequest::new(WEATHER_INTENT, Some(country), None);
        h.fulfiller.fulfill(&request).await;

        assert_eq!(
            *h.places.lock().unwrap(),
            vec!["Trondheim".to_string(), "Norge".to_string()]
        );
    }

    #[tokio::test]
    async fn geocoding_without_match_falls_back_to_oslo() {
        let h = harness(
            FakeGeocoder::default(),
            Some(reading(0)),
            None,
            MatchPolicy::Keyword,
        );

        let location = h.fulfiller.resolve_location(Some("Atlantis")).await;
        let oslo = Location {
            name: "Oslo".to_string(),
            latitude: 59.91,
            longitude: 10.75,
        };
        assert_eq!(location, oslo);
    }

    #[tokio::test]
    async fn geocoding_failure_falls_back_to_oslo() {
        let geocoder = FakeGeocoder {
            fail: true,
            ..Default::default()
        };
        let h = harness(geocoder, Some(reading(0)), None, MatchPolicy::Keyword);

        let response = h.fulfiller.fulfill(&weather_request("Bergen")).await;

        assert_eq!(*h.coords.lock().unwrap(), vec![(59.91, 10.75)]);
        assert!(response.fulfillment_text.starts_with("Været i Oslo:"));
    }

    #[tokio::test]
    async fn missing_place_skips_geocoding() {
        let h = harness(
            FakeGeocoder::default(),
            Some(reading(0)),
            None,
            MatchPolicy::Keyword,
        );

        let location = h.fulfiller.resolve_location(Some("   ")).await;
        assert_eq!(location.name, "Oslo");

        let request = IntentRequest::new(WEATHER_INTENT, None, None);
        let response = h.fulfiller.fulfill(&request).await;
        assert!(response.fulfillment_text.starts_with("Været i Oslo:"));

        let response = h.fulfiller.fulfill(&weather_request("")).await;
        assert!(response.fulfillment_text.starts_with("Været i Oslo:"));

        assert!(h.places.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn weather_failure_degrades_to_fixed_text() {
        let geocoder = FakeGeocoder {
            result: Some(bergen()),
            ..Default::default()
        };
        let h = harness(geocoder, None, None, MatchPolicy::Keyword);

        let outcome = h.fulfiller.weather_text(&bergen()).await;
        assert_eq!(outcome, Outcome::Degraded(WEATHER_FAILED_TEXT));

        let response = h.fulfiller.fulfill(&weather_request("Bergen")).await;
        assert_eq!(response.fulfillment_text, WEATHER_FAILED_TEXT);
    }

    #[tokio::test]
    async fn website_fetch_failure_degrades_to_fixed_text() {
        let h = site_harness(None, MatchPolicy::Keyword);

        let outcome = h.fulfiller.website_text("telefon").await;
        assert!(outcome.is_degraded());

        let request = IntentRequest::new(WEBSITE_INTENT, None, Some("telefon".to_string()));
        let response = h.fulfiller.fulfill(&request).await;
        assert_eq!(response.fulfillment_text, WEBSITE_FAILED_TEXT);
    }

    #[tokio::test]
    async fn website_intent_selects_paragraph_matching_utterance() {
        let html = "<p>Velkommen!</p><p>Send oss en e-post.</p><p>Our phone is open 8-16.</p>";
        let h = site_harness(Some(html), MatchPolicy::Keyword);

        let utterance = "What is your Phone number".to_string();
        let request = IntentRequest::new(WEBSITE_INTENT, None, Some(utterance));
        let response = h.fulfiller.fulfill(&request).await;

        assert_eq!(response.fulfillment_text, "Our phone is open 8-16.");
    }

    #[tokio::test]
    async fn website_intent_without_match_links_to_site() {
        let h = site_harness(Some("<p>Velkommen!</p>"), MatchPolicy::Keyword);

        let request = IntentRequest::new(WEBSITE_INTENT, None, None);
        let response = h.fulfiller.fulfill(&request).await;

        assert_eq!(
            response.fulfillment_text,
            "Se mer informasjon på nettsiden: https://nsp.no"
        );
    }

    #[tokio::test]
    async fn first_paragraph_policy() {
        let request = IntentRequest::new(WEBSITE_INTENT, None, None);

        let h = site_harness(Some("<p></p><p>Hei</p>"), MatchPolicy::FirstParagraph);
        let response = h.fulfiller.fulfill(&request).await;
        assert_eq!(response.fulfillment_text, "Hei");

        let h = site_harness(Some("<div>Ingen avsnitt</div>"), MatchPolicy::FirstParagraph);
        let response = h.fulfiller.fulfill(&request).await;
        assert_eq!(response.fulfillment_text, NOT_FOUND_TEXT);
    }

    #[test]
    fn unknown_weather_code_is_described_as_unknown() {
        let text = format_weather(&WeatherCodes::default(), "Tromsø", &reading(42));
        assert!(text.contains(UNKNOWN_CONDITIONS));
    }

    #[test]
    fn observation_time_formats() {
        assert_eq!(format_observation_time("2024-05-17T14:30"), "17.05.2024 kl. 14:30");
        assert_eq!(format_observation_time("2024-05-17T14:30:00"), "17.05.2024 kl. 14:30");
        assert_eq!(format_observation_time("i går"), "i går");
    }
}
