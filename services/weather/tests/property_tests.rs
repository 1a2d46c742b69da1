//! Property-based tests for the weather service.
//!
//! Tests validate:
//! - Forecast decoding only depends on `currently.summary`
//! - Request URLs follow `{base}[/{key}]/{lat},{lon}`

use proptest::prelude::*;
use serde_json::Value;
use test_utils::fixtures::forecast_payload;
use test_utils::generators::{coordinates_strategy, scalar_strategy, summary_strategy};
use weather_service::{WeatherClient, WeatherResponse};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property: Additive Upstream Changes Are Tolerated**
    /// *For any* summary and any extra fields, decoding SHALL yield the
    /// summary unchanged.
    #[test]
    fn prop_decoding_ignores_additional_fields(
        summary in summary_strategy(),
        extra in prop::collection::btree_map("x[a-z]{1,8}", scalar_strategy(), 0..6),
    ) {
        let mut payload = forecast_payload(&summary);
        if let Value::Object(root) = &mut payload {
            root.extend(extra.clone());
            if let Some(Value::Object(currently)) = root.get_mut("currently") {
                currently.extend(extra);
            }
        }

        let forecast = WeatherResponse::from_body(&payload.to_string()).unwrap();
        prop_assert_eq!(forecast.summary, summary);
    }

    /// **Property: Forecast URL Shape**
    /// *For any* coordinates, the URL SHALL end in `/{lat},{lon}`, preceded
    /// by the API key when one is configured.
    #[test]
    fn prop_forecast_url_shape((lat, lon) in coordinates_strategy(), key in proptest::option::of("[a-z0-9]{4,12}")) {
        let client = WeatherClient::with_client("http://localhost:9000/", key.clone(), reqwest::Client::new());
        let url = client.forecast_url(lat, lon);

        let expected_tail = match key {
            Some(key) => format!("/{key}/{lat},{lon}"),
            None => format!("/{lat},{lon}"),
        };
        prop_assert_eq!(url, format!("http://localhost:9000{expected_tail}"));
    }
}
