//! Shared proptest generators.
//!
//! Every generated matcher and pattern validates: regex examples match
//! their pattern and type examples have their declared kind. Numbers are
//! integers so values survive a JSON round trip unchanged.

use forecast_pact::{Interaction, Matcher, Pattern, RequestPattern, ResponsePattern};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Generate provider states, including the empty (stateless) one.
pub fn provider_state_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("weather forecast data".to_string()),
        Just("no forecast available".to_string()),
        Just("rate limit exceeded".to_string()),
    ]
}

/// Generate HTTP methods.
pub fn http_method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("DELETE".to_string()),
    ]
}

/// Generate HTTP status codes used in contracts.
pub fn http_status_code_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(200u16),
        Just(201),
        Just(204),
        Just(400),
        Just(404),
        Just(500),
    ]
}

/// Generate object keys, occasionally the artifact's `$match` tag name.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        9 => "[a-z][a-zA-Z]{0,8}",
        1 => Just("$match".to_string()),
    ]
}

/// Generate scalar JSON values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[A-Za-z ]{0,12}".prop_map(Value::from),
        (-1_000_000i64..1_000_000).prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Generate valid leaf matchers.
pub fn matcher_strategy() -> impl Strategy<Value = Matcher> {
    prop_oneof![
        scalar_strategy().prop_map(Matcher::Exact),
        (key_strategy(), -100i64..100).prop_map(|(key, value)| Matcher::exact(json!({ key: value }))),
        prop_oneof![
            Just(Matcher::regex("[A-Z][a-z]+", "Rain")),
            Just(Matcher::regex(r"\d+", "42")),
            Just(Matcher::regex(r"-?\d+\.\d+", "53.5511")),
        ],
        scalar_strategy().prop_map(Matcher::like),
    ]
}

/// Generate nested body patterns.
pub fn pattern_strategy() -> impl Strategy<Value = Pattern> {
    matcher_strategy()
        .prop_map(Pattern::Value)
        .prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::btree_map(key_strategy(), inner.clone(), 0..4).prop_map(Pattern::Object),
                prop::collection::vec(inner.clone(), 0..3).prop_map(Pattern::Array),
                (inner, 0usize..3).prop_map(|(template, min)| Pattern::each_like(template, min)),
            ]
        })
}

/// Generate request patterns with literal or regex paths.
pub fn request_pattern_strategy() -> impl Strategy<Value = RequestPattern> {
    (
        http_method_strategy(),
        prop_oneof![
            "/[a-z]{1,10}(/[0-9]{1,4})?".prop_map(|path| Matcher::exact(path)),
            Just(Matcher::regex(r"/forecast/\d+", "/forecast/7")),
        ],
        any::<bool>(),
        proptest::option::of(pattern_strategy()),
    )
        .prop_map(|(method, path, accept, body)| {
            let mut request = RequestPattern::matching(method, path);
            if accept {
                request = request.header("Accept", Matcher::exact("application/json"));
            }
            request.body = body;
            request
        })
}

/// Generate response patterns.
pub fn response_pattern_strategy() -> impl Strategy<Value = ResponsePattern> {
    (
        http_status_code_strategy(),
        proptest::option::of(pattern_strategy()),
    )
        .prop_map(|(status, body)| {
            let mut response = ResponsePattern::new(status);
            response.body = body;
            response
        })
}

/// Generate 1 to 5 interactions with distinct identities.
pub fn interactions_strategy() -> impl Strategy<Value = Vec<Interaction>> {
    prop::collection::vec(
        (
            "[a-z][a-z ]{0,20}",
            provider_state_strategy(),
            request_pattern_strategy(),
            response_pattern_strategy(),
        ),
        1..6,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (description, state, request, response))| {
                Interaction::new(format!("{description} #{i}"), state, request, response)
            })
            .collect()
    })
}

/// Generate `(latitude, longitude)` pairs with four decimals.
pub fn coordinates_strategy() -> impl Strategy<Value = (f64, f64)> {
    (-900_000i32..=900_000, -1_800_000i32..=1_800_000)
        .prop_map(|(lat, lon)| (f64::from(lat) / 10_000.0, f64::from(lon) / 10_000.0))
}

/// Generate forecast summaries.
pub fn summary_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Rain".to_string()),
        Just("Clear".to_string()),
        Just("Partly Cloudy".to_string()),
        Just("Light Snow".to_string()),
        "[A-Z][a-z]{2,10}( [a-z]{2,8})?",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_generated_patterns_validate(pattern in pattern_strategy()) {
            prop_assert!(pattern.validate("body").is_ok());
        }

        #[test]
        fn test_generated_interactions_validate(interactions in interactions_strategy()) {
            for interaction in &interactions {
                prop_assert!(interaction.validate().is_ok());
            }
        }

        #[test]
        fn test_coordinates_in_range((lat, lon) in coordinates_strategy()) {
            prop_assert!((-90.0..=90.0).contains(&lat));
            prop_assert!((-180.0..=180.0).contains(&lon));
        }
    }
}
