//! WMO weather interpretation codes as reported by Open-Meteo.
//! See: https://open-meteo.com/en/docs#weathervariables

use std::collections::HashMap;

pub const UNKNOWN_CONDITIONS: &str = "❓ Ukjent værforhold";

const TABLE: &[(i32, &str)] = &[
    (0, "☀️ Klar himmel"),
    (1, "🌤️ Lettskyet"),
    (2, "⛅ Delvis skyet"),
    (3, "☁️ Overskyet"),
    (45, "🌫️ Tåke"),
    (48, "🌫️ Rimtåke"),
    (51, "🌦️ Lett yr"),
    (53, "🌦️ Moderat yr"),
    (55, "🌧️ Tett yr"),
    (56, "🌧️ Lett underkjølt yr"),
    (57, "🌧️ Tett underkjølt yr"),
    (61, "🌧️ Lett regn"),
    (63, "🌧️ Moderat regn"),
    (65, "🌧️ Kraftig regn"),
    (66, "🌧️ Lett underkjølt regn"),
    (67, "🌧️ Kraftig underkjølt regn"),
    (71, "🌨️ Lett snøfall"),
    (73, "🌨️ Moderat snøfall"),
    (75, "❄️ Kraftig snøfall"),
    (77, "🌨️ Snøkorn"),
    (80, "🌦️ Lette regnbyger"),
    (81, "🌧️ Moderate regnbyger"),
    (82, "⛈️ Kraftige regnbyger"),
    (85, "🌨️ Lette snøbyger"),
    (86, "❄️ Kraftige snøbyger"),
    (95, "⛈️ Tordenvær"),
    (96, "⛈️ Tordenvær med lett hagl"),
    (99, "⛈️ Tordenvær med kraftig hagl"),
];

/// Immutable code → description lookup, built once at start-up.
#[derive(Debug, Clone)]
pub struct WeatherCodes {
    descriptions: HashMap<i32, &'static str>,
}

impl Default for WeatherCodes {
    fn default() -> Self {
        Self {
            descriptions: TABLE.iter().copied().collect(),
        }
    }
}

impl WeatherCodes {
    /// Emoji-prefixed description, or [`UNKNOWN_CONDITIONS`] for codes outside the table.
    pub fn describe(&self, code: i32) -> &'static str {
        self.descriptions
            .get(&code)
            .copied()
            .unwrap_or(UNKNOWN_CONDITIONS)
    }
}
