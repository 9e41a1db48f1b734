use serde::{Deserialize, Deserializer, Serialize};

/// A resolved place with coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions as reported by the weather lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub wind_speed_ms: f64,
    pub weather_code: i32,
    /// Observation timestamp exactly as reported upstream.
    pub time: String,
}

/// Inbound webhook body. Every field is optional on the wire, and an explicit
/// `null` counts as missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_result: QueryResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent: Intent,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Parameters,
    #[serde(default)]
    pub query_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub location: Option<LocationParam>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// The shapes the `location` parameter is known to arrive in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LocationParam {
    Name(String),
    Place {
        #[serde(default)]
        city: Option<String>,
        #[serde(default)]
        country: Option<String>,
    },
    Other(serde_json::Value),
}

impl LocationParam {
    /// Place name to geocode: a non-empty plain string, else a non-empty city,
    /// else a non-empty country.
    pub fn place_name(&self) -> Option<&str> {
        match self {
            LocationParam::Name(name) => non_empty(Some(name)),
            LocationParam::Place { city, country } => {
                non_empty(city.as_ref()).or_else(|| non_empty(country.as_ref()))
            }
            LocationParam::Other(_) => None,
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

impl IntentRequest {
    /// Convenience constructor used by the CLI and tests.
    pub fn new(intent: &str, location: Option<LocationParam>, query_text: Option<String>) -> Self {
        Self {
            query_result: QueryResult {
                intent: Intent {
                    display_name: intent.to_string(),
                },
                parameters: Parameters { location },
                query_text,
            },
        }
    }

    pub fn intent_name(&self) -> &str {
        &self.query_result.intent.display_name
    }

    pub fn place_name(&self) -> Option<&str> {
        self.query_result
            .parameters
            .location
            .as_ref()
            .and_then(LocationParam::place_name)
    }

    pub fn query_text(&self) -> &str {
        self.query_result.query_text.as_deref().unwrap_or_default()
    }
}

/// Outbound webhook body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentResponse {
    pub fulfillment_text: String,
}

impl FulfillmentResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            fulfillment_text: text.into(),
        }
    }
}
