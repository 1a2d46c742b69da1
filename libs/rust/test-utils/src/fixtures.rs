//! Test fixtures with sample data.
//!
//! Forecast payloads follow the shape of the upstream weather API: a
//! `currently` block plus many fields the weather service never reads.

use forecast_pact::{
    ContractArtifact, Interaction, Matcher, Pattern, RequestPattern, ResponsePattern,
};
use serde_json::{Value, json};

/// Coordinates of Hamburg.
pub const HAMBURG: (f64, f64) = (53.5511, 9.9937);

/// Coordinates of Berlin.
pub const BERLIN: (f64, f64) = (52.52, 13.405);

/// Provider state under which forecasts exist.
pub const FORECAST_STATE: &str = "weather forecast data";

/// Consumer name used across fixtures.
pub const CONSUMER: &str = "weather-service";

/// Provider name used across fixtures.
pub const PROVIDER: &str = "weather-api";

/// Request path for a coordinate pair, e.g. `/53.5511,9.9937`.
#[must_use]
pub fn forecast_path((lat, lon): (f64, f64)) -> String {
    format!("/{lat},{lon}")
}

/// A full upstream forecast payload with the given summary.
#[must_use]
pub fn forecast_payload(summary: &str) -> Value {
    json!({
        "latitude": HAMBURG.0,
        "longitude": HAMBURG.1,
        "timezone": "Europe/Berlin",
        "currently": {
            "time": 1_736_942_400,
            "summary": summary,
            "icon": "rain",
            "temperature": 6.4,
            "humidity": 0.87,
            "windSpeed": 5.1
        },
        "hourly": {
            "summary": "Rain throughout the day.",
            "data": [
                {"time": 1_736_942_400, "summary": summary, "temperature": 6.4},
                {"time": 1_736_946_000, "summary": "Overcast", "temperature": 6.1}
            ]
        },
        "flags": {"units": "si", "sources": ["isd", "cmc"]},
        "offset": 1
    })
}

/// The forecast interaction for Hamburg: a literal path and an exact
/// `currently.summary`.
#[must_use]
pub fn hamburg_interaction() -> Interaction {
    Interaction::new(
        "forecast for Hamburg",
        FORECAST_STATE,
        RequestPattern::new("GET", forecast_path(HAMBURG)),
        ResponsePattern::new(200).body(Pattern::object([(
            "currently",
            Pattern::object([("summary", Pattern::from(Matcher::exact("Rain")))]),
        )])),
    )
}

/// A forecast interaction for any coordinates, matching any summary string.
#[must_use]
pub fn any_forecast_interaction() -> Interaction {
    Interaction::new(
        "forecast for any location",
        FORECAST_STATE,
        RequestPattern::matching(
            "GET",
            Matcher::regex(r"/-?\d+(\.\d+)?,-?\d+(\.\d+)?", forecast_path(BERLIN)),
        ),
        ResponsePattern::new(200).body(Pattern::object([(
            "currently",
            Pattern::object([("summary", Pattern::from(Matcher::like("Clear")))]),
        )])),
    )
}

/// A contract holding [`hamburg_interaction`].
#[must_use]
pub fn sample_artifact() -> ContractArtifact {
    ContractArtifact::new(CONSUMER, PROVIDER, vec![hamburg_interaction()])
}
